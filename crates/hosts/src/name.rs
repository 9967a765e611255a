use std::{
    borrow::Borrow,
    fmt::{Display, Formatter},
    ops::Deref,
    sync::Arc,
};

/// A domain name in canonical form: lowercase with exactly one trailing dot.
///
/// This is the only key type of the blackhole set, both for storing and for looking up.
/// Two names are equal iff their canonical forms are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedName(Arc<str>);

impl NormalizedName {
    /// Canonicalize `raw`. Never fails: malformed names are normalized all the same.
    pub fn new(raw: impl AsRef<str>) -> Self {
        normalize(raw.as_ref())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lowercase `raw` and make it end in a single dot. `""` and `"."` both become the root, `"."`.
pub fn normalize(raw: &str) -> NormalizedName {
    let trimmed = raw.trim_end_matches('.');
    let mut canonical = trimmed.to_lowercase();
    canonical.push('.');
    NormalizedName(Arc::from(canonical))
}

impl Borrow<str> for NormalizedName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for NormalizedName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for NormalizedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NormalizedName {
    fn from(raw: &str) -> Self {
        normalize(raw)
    }
}
