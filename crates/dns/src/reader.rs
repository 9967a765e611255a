use anyhow::{bail, ensure};

use crate::domain_name::DomainName;

/// Maximum number of compression pointers followed while reading a single name.
const MAX_POINTER_HOPS: usize = 64;

/// A reader for DNS messages that allows reading various components
pub struct DnsMessageReader<'a> {
    /// Internal buffer containing the DNS message.
    buffer: &'a [u8],
    /// Position in bytes.
    position: usize,
}

impl<'a> DnsMessageReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Seek to a position inside the buffer.
    pub fn seek(&mut self, pos: usize) -> anyhow::Result<()> {
        let len = self.buffer.len();
        ensure!(pos <= len, "seek out of bounds: pos={} len={}", pos, len);
        self.position = pos;
        Ok(())
    }

    #[inline]
    fn need(&self, need: usize, what: &str) -> anyhow::Result<()> {
        let rem = self.remaining();
        ensure!(
            need <= rem,
            "buffer underflow at pos {} while reading {}: need {} bytes, have {}",
            self.position,
            what,
            need,
            rem
        );
        Ok(())
    }

    /// Read a single byte from the DNS message.
    pub fn read_u8(&mut self) -> anyhow::Result<u8> {
        self.need(1, "u8")?;
        let byte = self.buffer[self.position];
        self.position += 1;
        Ok(byte)
    }

    /// Read a big endian u16 from the DNS message.
    pub fn read_u16(&mut self) -> anyhow::Result<u16> {
        let bytes = self.read_array::<2>("u16")?;
        Ok(u16::from_be_bytes(bytes))
    }

    /// Read a big endian u32 from the DNS message.
    pub fn read_u32(&mut self) -> anyhow::Result<u32> {
        let bytes = self.read_array::<4>("u32")?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_array<const N: usize>(&mut self, what: &str) -> anyhow::Result<[u8; N]> {
        self.need(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    /// Read a possibly compressed domain name.
    ///
    /// After the call the reader is positioned right after the name as it is stored
    /// at the current position, i.e. after the first compression pointer if any.
    pub fn read_qname(&mut self) -> anyhow::Result<DomainName> {
        let mut pos = self.position;
        let mut resume_at: Option<usize> = None;
        let mut hops = 0;
        let mut name = String::new();

        loop {
            if pos >= self.buffer.len() {
                bail!("qname out of bounds at pos {} (buf len {})", pos, self.buffer.len());
            }

            let length = self.buffer[pos];

            match length & 0xC0 {
                0xC0 => {
                    ensure!(
                        pos + 2 <= self.buffer.len(),
                        "truncated compression pointer at pos {}",
                        pos
                    );

                    hops += 1;
                    ensure!(
                        hops <= MAX_POINTER_HOPS,
                        "qname compression pointer loop detected at pos {}",
                        pos
                    );

                    let offset = (((length as usize) & 0x3F) << 8) | (self.buffer[pos + 1] as usize);

                    // Pointers must point backwards, anything else is either garbage or a loop.
                    ensure!(
                        offset < pos,
                        "compression pointer at pos {} does not point backwards (offset {})",
                        pos,
                        offset
                    );

                    resume_at.get_or_insert(pos + 2);
                    pos = offset;
                }
                0x00 => {
                    if length == 0 {
                        pos += 1;
                        break;
                    }

                    let label_len = length as usize;
                    pos += 1;

                    ensure!(
                        pos + label_len <= self.buffer.len(),
                        "label overruns buffer at pos {}: need {} bytes, have {}",
                        pos,
                        label_len,
                        self.buffer.len().saturating_sub(pos)
                    );

                    let label = &self.buffer[pos..pos + label_len];
                    name.push_str(&String::from_utf8_lossy(label));
                    name.push('.');

                    pos += label_len;
                }
                other => bail!("unsupported label type 0x{:02x} at pos {}", other, pos),
            }
        }

        self.position = resume_at.unwrap_or(pos);

        if name.is_empty() {
            return Ok(DomainName::root());
        }

        DomainName::from_ascii(name)
    }

    /// Read a specified number of bytes from the DNS message.
    pub fn read_bytes(&mut self, length: usize) -> anyhow::Result<&'a [u8]> {
        self.need(length, "raw bytes")?;
        let data = &self.buffer[self.position..self.position + length];
        self.position += length;
        Ok(data)
    }

    /// Current reading position in the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Return the number of unread bytes remaining in the reader's buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use sinkhole_dns::reader::DnsMessageReader;
    ///
    /// let buf = [0u8, 1, 2];
    /// let mut r = DnsMessageReader::new(&buf);
    /// assert_eq!(r.remaining(), 3);
    /// r.seek(1).unwrap();
    /// assert_eq!(r.remaining(), 2);
    /// ```
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

/// Trait for types that can be directly parsed from a DNS message.
pub trait DnsReadable: Sized {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self>;
}
