//! Bet record encoding.
//!
//! A record is six string fields back to back, with no record-level prefix:
//!
//! ```text
//! agency | first name | last name | document | birthdate | number
//! ```
//!
//! # Example
//!
//! ```
//! use bet_client::codec::BetRecord;
//!
//! let bet = BetRecord::new("1", "Santiago Lionel", "Lorca", "30904465", "1999-03-17", "7574");
//! let encoded = bet.encode().unwrap();
//! assert_eq!(encoded.len(), bet.encoded_len());
//! assert_eq!(BetRecord::decode(&mut &encoded[..]).unwrap(), bet);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::field::{field_len, get_field, put_field};
use crate::error::Result;

/// A single lottery bet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BetRecord {
    pub agency: String,
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub birthdate: String,
    pub number: String,
}

impl BetRecord {
    pub fn new(
        agency: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        document: impl Into<String>,
        birthdate: impl Into<String>,
        number: impl Into<String>,
    ) -> Self {
        Self {
            agency: agency.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            document: document.into(),
            birthdate: birthdate.into(),
            number: number.into(),
        }
    }

    /// Fields in wire order, paired with their names for error reporting.
    fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("agency", &self.agency),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("document", &self.document),
            ("birthdate", &self.birthdate),
            ("number", &self.number),
        ]
    }

    /// Number of bytes [`encode_into`](Self::encode_into) will write.
    pub fn encoded_len(&self) -> usize {
        self.fields().iter().map(|(_, v)| field_len(v)).sum()
    }

    /// Append the encoded record to `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldTooLong`](crate::ClientError::FieldTooLong) for the
    /// first field that does not fit. `buf` may hold a partial record then;
    /// callers discard it.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        for (name, value) in self.fields() {
            put_field(buf, name, value)?;
        }
        Ok(())
    }

    /// Encode the record into a fresh buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one record and advance the cursor past it.
    pub fn decode(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            agency: get_field(buf, "agency")?,
            first_name: get_field(buf, "first_name")?,
            last_name: get_field(buf, "last_name")?,
            document: get_field(buf, "document")?,
            birthdate: get_field(buf, "birthdate")?,
            number: get_field(buf, "number")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    fn sample() -> BetRecord {
        BetRecord::new(
            "1",
            "Santiago Lionel",
            "Lorca",
            "30904465",
            "1999-03-17",
            "7574",
        )
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let bet = sample();
        let encoded = bet.encode().unwrap();
        // 6 prefixes + 1 + 15 + 5 + 8 + 10 + 4
        assert_eq!(encoded.len(), 12 + 43);
        assert_eq!(bet.encoded_len(), encoded.len());
    }

    #[test]
    fn test_field_order_on_the_wire() {
        let encoded = sample().encode().unwrap();
        assert_eq!(&encoded[..3], &[0x00, 0x01, b'1']);
        assert_eq!(&encoded[3..5], &[0x00, 15]);
        assert_eq!(&encoded[5..20], b"Santiago Lionel");
        assert!(encoded.ends_with(&[0x00, 0x04, b'7', b'5', b'7', b'4']));
    }

    #[test]
    fn test_decode_round_trip() {
        let bet = sample();
        let encoded = bet.encode().unwrap();
        let mut cursor = &encoded[..];
        assert_eq!(BetRecord::decode(&mut cursor).unwrap(), bet);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_decode_truncated_record() {
        let encoded = sample().encode().unwrap();
        let mut cursor = &encoded[..encoded.len() - 1];
        assert!(matches!(
            BetRecord::decode(&mut cursor),
            Err(ClientError::Format(_))
        ));
    }

    #[test]
    fn test_encode_reports_offending_field() {
        let mut bet = sample();
        bet.last_name = "x".repeat(70_000);
        let err = bet.encode().unwrap_err();
        assert!(matches!(
            err,
            ClientError::FieldTooLong {
                field: "last_name",
                ..
            }
        ));
    }

    #[test]
    fn test_unicode_length_is_in_bytes() {
        let bet = BetRecord::new("1", "José", "Muñoz", "1", "2000-01-01", "1");
        let encoded = bet.encode().unwrap();
        assert_eq!(&encoded[3..5], &[0x00, 5]);
        assert_eq!(bet.encoded_len(), encoded.len());
    }
}
