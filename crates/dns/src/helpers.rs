//! Cheap checks on raw DNS messages that do not require a full decode.

/// Size of the fixed DNS header.
pub const HEADER_LEN: usize = 12;

/// Extracts the transaction ID from a DNS message.
pub fn extract_transaction_id(data: &[u8]) -> Option<u16> {
    if data.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([data[0], data[1]]))
}

/// Whether the QR bit is set. `None` if the header is incomplete.
pub fn is_response(data: &[u8]) -> Option<bool> {
    if data.len() < HEADER_LEN {
        return None;
    }
    Some(data[2] & 0x80 != 0)
}

/// Whether the TC bit is set. `None` if the header is incomplete.
pub fn is_truncated(data: &[u8]) -> Option<bool> {
    if data.len() < HEADER_LEN {
        return None;
    }
    Some(data[2] & 0x02 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_checks() {
        let mut header = [0u8; HEADER_LEN];
        header[0] = 0xAB;
        header[1] = 0xCD;
        header[2] = 0x80 | 0x02;

        assert_eq!(extract_transaction_id(&header), Some(0xABCD));
        assert_eq!(is_response(&header), Some(true));
        assert_eq!(is_truncated(&header), Some(true));

        assert_eq!(extract_transaction_id(&[1]), None);
        assert_eq!(is_response(&header[..4]), None);
        assert_eq!(is_truncated(&header[..11]), None);
    }
}
