//! Length-prefixed string fields.
//!
//! ```text
//! ┌───────────┬─────────────┐
//! │ Length    │ Bytes       │
//! │ uint16 BE │ Length bytes│
//! └───────────┴─────────────┘
//! ```

use bytes::{Buf, BufMut};

use crate::error::{ClientError, Result};

/// Size of the length prefix in front of every string field.
pub const FIELD_PREFIX_SIZE: usize = 2;

/// Largest byte length a field can carry.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Encoded size of a field holding `value`.
#[inline]
pub fn field_len(value: &str) -> usize {
    FIELD_PREFIX_SIZE + value.len()
}

/// Append `value` as a `[u16 length][bytes]` field.
///
/// # Errors
///
/// Returns [`ClientError::FieldTooLong`] if the value does not fit 16 bits.
/// Nothing is written in that case.
pub fn put_field<B: BufMut>(buf: &mut B, field: &'static str, value: &str) -> Result<()> {
    let len = value.len();
    if len > MAX_FIELD_LEN {
        return Err(ClientError::FieldTooLong {
            field,
            len,
            max: MAX_FIELD_LEN,
        });
    }
    buf.put_u16(len as u16);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Read one `[u16 length][bytes]` field as UTF-8 and advance the cursor
/// past it.
///
/// # Errors
///
/// Returns [`ClientError::Format`] if the prefix is truncated, the length
/// claims more bytes than remain, or the bytes are not UTF-8.
pub fn get_field(buf: &mut &[u8], field: &'static str) -> Result<String> {
    let value = get_raw_field(buf, field)?;
    String::from_utf8(value.to_vec())
        .map_err(|e| ClientError::Format(format!("{field} is not valid UTF-8: {e}")))
}

/// Read one `[u16 length][bytes]` field without interpreting the bytes.
pub fn get_raw_field<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8]> {
    if buf.remaining() < FIELD_PREFIX_SIZE {
        return Err(ClientError::Format(format!(
            "truncated length prefix for {field}: {} bytes left",
            buf.remaining()
        )));
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(ClientError::Format(format!(
            "{field} claims {len} bytes but only {} remain",
            buf.remaining()
        )));
    }
    let (value, rest) = buf.split_at(len);
    *buf = rest;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_put_field_layout() {
        let mut buf = BytesMut::new();
        put_field(&mut buf, "name", "abc").unwrap();
        assert_eq!(&buf[..], &[0x00, 0x03, b'a', b'b', b'c']);
        assert_eq!(field_len("abc"), buf.len());
    }

    #[test]
    fn test_put_field_empty() {
        let mut buf = BytesMut::new();
        put_field(&mut buf, "name", "").unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00]);
    }

    #[test]
    fn test_put_field_max_length_accepted() {
        let value = "x".repeat(MAX_FIELD_LEN);
        let mut buf = BytesMut::new();
        put_field(&mut buf, "name", &value).unwrap();
        assert_eq!(&buf[..2], &[0xFF, 0xFF]);
        assert_eq!(buf.len(), MAX_FIELD_LEN + 2);
    }

    #[test]
    fn test_put_field_too_long_rejected() {
        let value = "x".repeat(MAX_FIELD_LEN + 1);
        let mut buf = BytesMut::new();
        let err = put_field(&mut buf, "name", &value).unwrap_err();
        assert!(matches!(
            err,
            ClientError::FieldTooLong { field: "name", len, .. } if len == MAX_FIELD_LEN + 1
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_get_field_advances_cursor() {
        let data = [0x00, 0x02, b'h', b'i', 0x00, 0x01, b'!'];
        let mut cursor = &data[..];
        assert_eq!(get_field(&mut cursor, "a").unwrap(), "hi");
        assert_eq!(get_field(&mut cursor, "b").unwrap(), "!");
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_get_field_length_overruns_input() {
        let data = [0x00, 0x05, b'h', b'i'];
        let mut cursor = &data[..];
        let err = get_field(&mut cursor, "document").unwrap_err();
        assert!(err.to_string().contains("claims 5 bytes"));
    }

    #[test]
    fn test_get_field_truncated_prefix() {
        let data = [0x00];
        let mut cursor = &data[..];
        assert!(matches!(
            get_field(&mut cursor, "document"),
            Err(ClientError::Format(_))
        ));
    }

    #[test]
    fn test_get_raw_field_keeps_bytes() {
        let data = [0x00, 0x02, 0xFF, 0xFE, 0x00];
        let mut cursor = &data[..];
        assert_eq!(get_raw_field(&mut cursor, "raw").unwrap(), &[0xFF, 0xFE]);
        assert_eq!(cursor, &[0x00]);
    }

    #[test]
    fn test_get_field_rejects_invalid_utf8() {
        let data = [0x00, 0x01, 0xFF];
        let mut cursor = &data[..];
        assert!(get_field(&mut cursor, "name")
            .unwrap_err()
            .to_string()
            .contains("UTF-8"));
    }
}
