use anyhow::ensure;
use bytes::{BufMut, Bytes, BytesMut};

/// Maximum size of a DNS message carried over UDP without EDNS.
pub const DEFAULT_MAX_LEN: usize = 512;

pub struct DnsMessageWriter {
    buf: BytesMut,
    max_len: usize,
}

impl Default for DnsMessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsMessageWriter {
    /// Create a new DNS message writer that refuses to grow beyond `max_len` bytes.
    pub fn new_with_max(max_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_len.min(DEFAULT_MAX_LEN)),
            max_len,
        }
    }

    /// Create a new DNS message writer limited to the classic 512 byte payload.
    pub fn new() -> Self {
        Self::new_with_max(DEFAULT_MAX_LEN)
    }

    #[inline]
    fn ensure_space(&mut self, need: usize, what: &str) -> anyhow::Result<()> {
        let cur = self.buf.len();
        let new_len = cur
            .checked_add(need)
            .ok_or_else(|| anyhow::anyhow!("length overflow"))?;
        ensure!(
            new_len <= self.max_len,
            "buffer overflow while writing {}: need={} current_len={} max_len={}",
            what,
            need,
            cur,
            self.max_len
        );
        self.buf.reserve(need);
        Ok(())
    }

    /// Write a u8 to the buffer.
    pub fn write_u8(&mut self, value: u8) -> anyhow::Result<()> {
        self.ensure_space(1, "u8")?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Write a big endian u16 to the buffer.
    pub fn write_u16(&mut self, value: u16) -> anyhow::Result<()> {
        self.ensure_space(2, "u16")?;
        self.buf.put_u16(value);
        Ok(())
    }

    /// Write a big endian u32 to the buffer.
    pub fn write_u32(&mut self, value: u32) -> anyhow::Result<()> {
        self.ensure_space(4, "u32")?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Write an uncompressed qname to the buffer.
    pub fn write_qname(&mut self, qname: &str) -> anyhow::Result<()> {
        let name = qname.trim_end_matches('.');
        if name.is_empty() {
            return self.write_u8(0);
        }

        let mut total = 1;
        for label in name.split('.') {
            ensure!(!label.is_empty(), "empty label in qname '{}'", qname);
            ensure!(label.len() <= 63, "label '{}' exceeds 63 bytes", label);
            total += 1 + label.len();
        }
        ensure!(total <= 255, "qname too long ({} bytes): '{}'", total, qname);

        self.ensure_space(total, "qname")?;
        for label in name.split('.') {
            self.buf.put_u8(label.len() as u8);
            self.buf.extend_from_slice(label.as_bytes());
        }
        self.buf.put_u8(0);
        Ok(())
    }

    /// Write raw bytes to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.ensure_space(data.len(), "raw bytes")?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Overwrite already written bytes starting at `pos`.
    pub fn overwrite_bytes(&mut self, pos: usize, data: &[u8]) -> anyhow::Result<()> {
        let end = pos
            .checked_add(data.len())
            .ok_or_else(|| anyhow::anyhow!("length overflow"))?;
        ensure!(
            end <= self.buf.len(),
            "overwrite out of bounds: pos={} len={} written={}",
            pos,
            data.len(),
            self.buf.len()
        );
        self.buf[pos..end].copy_from_slice(data);
        Ok(())
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Get the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Trait for types that can be written into a DNS message.
pub trait DnsWritable {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_qname() {
        let mut writer = DnsMessageWriter::new();
        writer.write_qname("ads.example.").unwrap();

        let bytes = writer.into_bytes();
        assert_eq!(
            &bytes[..],
            &[3, b'a', b'd', b's', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0]
        );
    }

    #[test]
    fn test_write_root() {
        let mut writer = DnsMessageWriter::new();
        writer.write_qname(".").unwrap();
        assert_eq!(&writer.into_bytes()[..], &[0]);
    }

    #[test]
    fn test_write_qname_rejects_empty_label() {
        let mut writer = DnsMessageWriter::new();
        assert!(writer.write_qname("a..b").is_err());
        assert!(writer.is_empty());
    }

    #[test]
    fn test_max_len_enforced() {
        let mut writer = DnsMessageWriter::new_with_max(3);
        writer.write_u16(1).unwrap();
        assert!(writer.write_u16(2).is_err());
        writer.write_u8(3).unwrap();
        assert_eq!(writer.len(), 3);
    }

    #[test]
    fn test_overwrite_bytes() {
        let mut writer = DnsMessageWriter::new();
        writer.write_u16(0).unwrap();
        writer.write_u8(9).unwrap();
        writer.overwrite_bytes(0, &0x0102u16.to_be_bytes()).unwrap();
        assert!(writer.overwrite_bytes(2, &[1, 2]).is_err());
        assert_eq!(&writer.into_bytes()[..], &[1, 2, 9]);
    }
}
