use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source url {input:?}: {error}")]
    Parse {
        input: String,
        #[source]
        error: url::ParseError,
    },
    #[error("unsupported scheme {scheme:?} in source {url}, expected http or https")]
    Scheme { scheme: String, url: Url },
}

/// Location of a remote hosts list. Always an absolute http or https URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source(Url);

impl Source {
    pub fn parse(input: &str) -> Result<Self, SourceError> {
        let url = Url::parse(input.trim()).map_err(|error| SourceError::Parse {
            input: input.to_string(),
            error,
        })?;
        Self::try_from(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<Url> for Source {
    type Error = SourceError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(SourceError::Scheme {
                scheme: other.to_string(),
                url,
            }),
        }
    }
}

impl FromStr for Source {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_and_https() {
        let s = Source::parse("https://example.com/hosts.txt").unwrap();
        assert_eq!(s.as_str(), "https://example.com/hosts.txt");
        assert!(Source::parse("http://10.0.0.1:8080/list").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            Source::parse("ftp://example.com/hosts"),
            Err(SourceError::Scheme { .. })
        ));
        assert!(matches!(
            Source::parse("file:///etc/hosts"),
            Err(SourceError::Scheme { .. })
        ));
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(Source::parse("/hosts.txt"), Err(SourceError::Parse { .. })));
        assert!(matches!(Source::parse(""), Err(SourceError::Parse { .. })));
    }
}
