//! Hosts file parsing.
//!
//! Every line looks like `<address> <name> [<name> ...] [# comment]`. Parsing is
//! deliberately forgiving: a line that does not fit is skipped and the rest of the
//! input is still read, so a partly broken remote list degrades instead of failing.

use std::{io, net::IpAddr};

use futures::{Stream, TryStreamExt, stream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::name::{NormalizedName, normalize};

/// Names listed on a single hosts line, normalized.
///
/// Yields nothing for blank or comment-only lines, for lines with fewer than two
/// fields and for lines whose address does not parse. The address only gates the
/// line, its value is never used.
pub fn parse_line(line: &str) -> impl Iterator<Item = NormalizedName> + '_ {
    let content = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };

    let mut fields = content.split_whitespace();
    let valid = fields.next().is_some_and(is_valid_address);

    fields.filter(move |_| valid).map(normalize)
}

/// Lazily parse in-memory hosts content.
pub fn parse_hosts(content: &str) -> impl Iterator<Item = NormalizedName> + '_ {
    content.lines().flat_map(parse_line)
}

/// Lazily parse a hosts file from an async reader, one line at a time.
///
/// Lines are decoded lossily, so invalid UTF-8 only spoils the line it appears on.
/// The only errors are I/O errors from `reader`.
pub fn parse_stream<R>(reader: R) -> impl Stream<Item = io::Result<NormalizedName>>
where
    R: AsyncBufRead + Unpin,
{
    lines(reader)
        .map_ok(|line| stream::iter(parse_line(&line).map(Ok::<_, io::Error>).collect::<Vec<_>>()))
        .try_flatten()
}

fn lines<R>(reader: R) -> impl Stream<Item = io::Result<String>>
where
    R: AsyncBufRead + Unpin,
{
    stream::try_unfold((reader, Vec::new()), |(mut reader, mut buf)| async move {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        Ok(Some((line, (reader, buf))))
    })
}

/// Whether `addr` is an IP address, ignoring an IPv6 zone suffix such as `%eth0`.
fn is_valid_address(addr: &str) -> bool {
    let addr = match addr.find('%') {
        Some(i) => &addr[..i],
        None => addr,
    };
    addr.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(line: &str) -> Vec<String> {
        parse_line(line).map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_simple_line() {
        assert_eq!(names("0.0.0.0 ads.example.com"), vec!["ads.example.com."]);
    }

    #[test]
    fn test_multiple_names() {
        assert_eq!(
            names("127.0.0.1\tTracker.Example  cdn.tracker.example."),
            vec!["tracker.example.", "cdn.tracker.example."]
        );
    }

    #[test]
    fn test_comment_stripping() {
        assert_eq!(names("1.2.3.4 example.com # note"), vec!["example.com."]);
        assert_eq!(names("1.2.3.4 example.com#trailing"), vec!["example.com."]);
        assert!(names("# only a comment").is_empty());
        assert!(names("   # indented comment 1.2.3.4 a.example").is_empty());
    }

    #[test]
    fn test_too_few_fields() {
        assert!(names("").is_empty());
        assert!(names("   ").is_empty());
        assert!(names("0.0.0.0").is_empty());
        assert!(names("0.0.0.0 # just an address").is_empty());
    }

    #[test]
    fn test_invalid_address_skips_line() {
        assert!(names("ads.example.com 0.0.0.0").is_empty());
        assert!(names("256.0.0.1 ads.example.com").is_empty());
        assert!(names("localhost ads.example.com").is_empty());
    }

    #[test]
    fn test_ipv6_addresses() {
        assert_eq!(names("::1 ip6-localhost"), vec!["ip6-localhost."]);
        assert_eq!(names("fe80::1%eth0 zoned.example"), vec!["zoned.example."]);
        assert!(names("fe80::zz%eth0 zoned.example").is_empty());
    }

    #[test]
    fn test_parse_hosts_skips_bad_lines() {
        let content = "\
# header
0.0.0.0 one.example
garbage line here
0.0.0.0 TWO.example # comment
not-an-ip three.example
::  four.example five.example
";
        let parsed: Vec<String> = parse_hosts(content).map(|n| n.to_string()).collect();
        assert_eq!(
            parsed,
            vec!["one.example.", "two.example.", "four.example.", "five.example."]
        );
    }

    #[tokio::test]
    async fn test_parse_stream() {
        let content: &[u8] = b"0.0.0.0 a.example\r\n\xff\xfe broken\n127.0.0.1 B.example c.example\n0.0.0.0 no-newline.example";

        let parsed: Vec<NormalizedName> = parse_stream(content).try_collect().await.unwrap();
        let parsed: Vec<&str> = parsed.iter().map(|n| n.as_str()).collect();

        assert_eq!(
            parsed,
            vec!["a.example.", "b.example.", "c.example.", "no-newline.example."]
        );
    }
}
