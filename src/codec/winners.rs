//! Lottery results payload.
//!
//! The payload is a sequence of `[u16 length][bytes]` entries, one per
//! winning document, repeated until the input is exhausted. There is no
//! count prefix; the count is the number of entries. Entries are raw bytes;
//! invalid UTF-8 is replaced rather than rejected.

use bytes::{Bytes, BytesMut};

use super::field::{field_len, get_raw_field, put_field};
use crate::error::Result;

/// Winning national IDs reported by the collector for this agency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Winners {
    documents: Vec<String>,
}

impl Winners {
    pub fn new(documents: Vec<String>) -> Self {
        Self { documents }
    }

    /// Decode a winners payload.
    ///
    /// All-or-nothing: a truncated or overrunning entry fails the whole
    /// decode with a format error.
    ///
    /// # Example
    ///
    /// ```
    /// use bet_client::codec::Winners;
    ///
    /// let payload = [0, 2, b'4', b'2', 0, 1, b'7'];
    /// let winners = Winners::decode(&payload).unwrap();
    /// assert_eq!(winners.count(), 2);
    /// assert_eq!(winners.documents(), ["42", "7"]);
    /// ```
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = payload;
        let mut documents = Vec::new();
        while !cursor.is_empty() {
            let raw = get_raw_field(&mut cursor, "winner")?;
            documents.push(String::from_utf8_lossy(raw).into_owned());
        }
        Ok(Self { documents })
    }

    /// Encode the documents as a winners payload.
    pub fn encode(&self) -> Result<Bytes> {
        let len = self.documents.iter().map(|d| field_len(d)).sum();
        let mut buf = BytesMut::with_capacity(len);
        for document in &self.documents {
            put_field(&mut buf, "winner", document)?;
        }
        Ok(buf.freeze())
    }

    /// Number of winners.
    #[inline]
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<String> {
        self.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use proptest::prelude::*;

    #[test]
    fn test_decode_empty_payload() {
        let winners = Winners::decode(&[]).unwrap();
        assert_eq!(winners.count(), 0);
        assert!(winners.documents().is_empty());
    }

    #[test]
    fn test_decode_preserves_order() {
        let winners = Winners::new(vec![
            "30904465".to_string(),
            "12345678".to_string(),
            "5".to_string(),
        ]);
        let payload = winners.encode().unwrap();
        let decoded = Winners::decode(&payload).unwrap();
        assert_eq!(decoded.count(), 3);
        assert_eq!(decoded.documents(), ["30904465", "12345678", "5"]);
    }

    #[test]
    fn test_decode_length_overrun_is_format_error() {
        let payload = [0x00, 0x02, b'4', b'2', 0x00, 0x09, b'1'];
        assert!(matches!(
            Winners::decode(&payload),
            Err(ClientError::Format(_))
        ));
    }

    #[test]
    fn test_decode_dangling_prefix_byte() {
        let payload = [0x00, 0x01, b'4', 0x00];
        assert!(matches!(
            Winners::decode(&payload),
            Err(ClientError::Format(_))
        ));
    }

    #[test]
    fn test_non_utf8_entry_is_kept() {
        let payload = [0x00, 0x02, b'4', 0xFF, 0x00, 0x01, b'7'];
        let winners = Winners::decode(&payload).unwrap();
        assert_eq!(winners.count(), 2);
        assert_eq!(winners.documents(), ["4\u{FFFD}", "7"]);
    }

    #[test]
    fn test_empty_document_entry() {
        let payload = [0x00, 0x00, 0x00, 0x01, b'9'];
        let winners = Winners::decode(&payload).unwrap();
        assert_eq!(winners.documents(), ["", "9"]);
    }

    proptest! {
        #[test]
        fn prop_winners_round_trip(
            documents in prop::collection::vec("[0-9A-Za-zñ]{0,24}", 0..64),
        ) {
            let winners = Winners::new(documents.clone());
            let decoded = Winners::decode(&winners.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded.count(), documents.len());
            prop_assert_eq!(decoded.into_documents(), documents);
        }
    }
}
