use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Maximum length of a domain name in wire format (RFC 1035).
const MAX_NAME_LEN: usize = 255;

/// Maximum length of a single label (RFC 1035).
const MAX_LABEL_LEN: usize = 63;

/// A validated domain name as it appears in DNS messages.
/// The input keeps its case and is stored without the trailing dot, the root is stored as ".".
/// Comparison and hashing ignore ASCII case.
#[derive(Debug, Clone)]
pub struct DomainName(Arc<str>);

impl DomainName {
    /// The root domain.
    pub fn root() -> Self {
        Self(Arc::from("."))
    }

    /// Create a new DomainName from an ASCII string, validated according to RFC 1035.
    pub fn from_ascii(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref().trim();

        if input == "." || input.is_empty() {
            return Ok(Self::root());
        }

        let name = input.strip_suffix('.').unwrap_or(input);

        // Labels plus their length octets plus the root octet.
        let wire_len = name.len() + 2;
        if wire_len > MAX_NAME_LEN {
            anyhow::bail!("domain name too long ({} bytes): {}", wire_len, name);
        }

        for label in name.split('.') {
            if label.is_empty() {
                anyhow::bail!("empty domain label in: {}", name);
            }

            if label.len() > MAX_LABEL_LEN {
                anyhow::bail!("domain label too long: {}", label);
            }
        }

        Ok(Self(Arc::from(name)))
    }

    /// Get the string representation of the DomainName.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == "."
    }

    /// Iterate over the labels, left to right. The root has no labels.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        let name = if self.is_root() { "" } else { self.as_str() };
        name.split('.').filter(|l| !l.is_empty())
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl Deref for DomainName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
