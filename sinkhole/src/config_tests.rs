#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sinkhole_hosts::ReloadPolicy;

    use crate::config::{
        Config, ConfigError, LogLevel, RemoteHostsConfig, ResolverConfig, load_config, parse_duration,
    };

    const SECOND: i128 = 1_000_000_000;

    fn remotehosts(sources: &[&str], reload: &str) -> RemoteHostsConfig {
        RemoteHostsConfig {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            reload: reload.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0"), Ok(0));
        assert_eq!(parse_duration("300ms"), Ok(300_000_000));
        assert_eq!(parse_duration("5m"), Ok(300 * SECOND));
        assert_eq!(parse_duration("2h45m"), Ok((2 * 3600 + 45 * 60) * SECOND));
        assert_eq!(parse_duration("1.5h"), Ok(5400 * SECOND));
        assert_eq!(parse_duration(".5s"), Ok(SECOND / 2));
        assert_eq!(parse_duration("1us"), Ok(1_000));
        assert_eq!(parse_duration("1µs"), Ok(1_000));
        assert_eq!(parse_duration("7ns"), Ok(7));
        assert_eq!(parse_duration("+10s"), Ok(10 * SECOND));
        assert_eq!(parse_duration("-5m"), Ok(-300 * SECOND));
    }

    #[test]
    fn test_parse_duration_signed_zero() {
        assert_eq!(parse_duration("-0"), Ok(0));
        assert_eq!(parse_duration("+0"), Ok(0));
        assert_eq!(parse_duration("-0s"), Ok(0));
        assert!(parse_duration("-").is_err());
    }

    #[test]
    fn test_parse_duration_long_fractions() {
        // Digits past the 18th are dropped before scaling, so nothing overflows.
        assert_eq!(parse_duration("0.9999999999999999999h"), Ok(3_599_999_999_999));
        assert_eq!(parse_duration("1.0000000000000000000000001s"), Ok(SECOND));
        assert_eq!(parse_duration("0.000000001s"), Ok(1));
        assert_eq!(parse_duration("0.0000000001s"), Ok(0));
    }

    #[test]
    fn test_parse_duration_range() {
        // Largest accepted value is i64::MAX nanoseconds, about 2562047h.
        assert_eq!(parse_duration("2562047h"), Ok(2_562_047 * 3600 * SECOND));
        assert!(parse_duration("2562048h").is_err());
        assert!(parse_duration("9223372036854775807ns").is_ok());
        assert!(parse_duration("9223372036854775808ns").is_err());
        assert!(parse_duration("2562047h2562047h").is_err());
        assert!(parse_duration("99999999999999999999999999999999999999999s").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("10 s").is_err());
        assert!(parse_duration("9999999999h").is_err());
    }

    #[test]
    fn test_validate_defaults() {
        let validated = RemoteHostsConfig::default().validate().unwrap();

        assert!(validated.sources.is_empty());
        assert_eq!(validated.reload, Duration::ZERO);
        assert_eq!(validated.policy, ReloadPolicy::FailFast);
        assert_eq!(validated.fetch_timeout, Duration::from_secs(30));
        assert!(validated.fail_on_initial_error);
    }

    #[test]
    fn test_validate_sources_and_reload() {
        let validated = remotehosts(
            &["https://example.org/sample.txt", "http://10.0.0.1:8080/hosts"],
            "5m",
        )
        .validate()
        .unwrap();

        assert_eq!(validated.sources.len(), 2);
        assert_eq!(validated.sources[0].as_str(), "https://example.org/sample.txt");
        assert_eq!(validated.reload, Duration::from_secs(300));
    }

    #[test]
    fn test_zero_reload_is_accepted() {
        assert_eq!(remotehosts(&[], "0s").validate().unwrap().reload, Duration::ZERO);
        assert_eq!(remotehosts(&[], "0").validate().unwrap().reload, Duration::ZERO);
    }

    #[test]
    fn test_negative_reload_is_rejected() {
        let err = remotehosts(&["https://example.org/hosts"], "-5m").validate().unwrap_err();
        assert!(matches!(err, ConfigError::NegativeReload(v) if v == "-5m"));
    }

    #[test]
    fn test_invalid_reload_is_rejected() {
        let err = remotehosts(&[], "five minutes").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { field: "reload", .. }));
    }

    #[test]
    fn test_invalid_source_is_rejected() {
        let err = remotehosts(&["not a url"], "").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSource(_)));

        let err = remotehosts(&["ftp://example.org/hosts"], "").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSource(_)));
    }

    #[test]
    fn test_zero_fetch_timeout_is_rejected() {
        let cfg = RemoteHostsConfig {
            fetch_timeout: "0s".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroFetchTimeout)));
    }

    #[test]
    fn test_decode_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
ip = "127.0.0.1"
port = 5353
log_level = "debug"

[resolver.forwarder]
upstreams = ["9.9.9.9:53"]

[remotehosts]
sources = ["https://example.org/sample.txt"]
reload = "1h"
policy = "best-effort"
fail_on_initial_error = false
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();

        assert_eq!(cfg.server.port, 5353);
        assert_eq!(cfg.server.log_level, LogLevel::Debug);
        assert_eq!(cfg.server.timeout_ms, 2000);
        assert_eq!(cfg.server.bind_addr().unwrap(), "127.0.0.1:5353".parse().unwrap());
        assert_eq!(
            cfg.resolver,
            ResolverConfig::Forwarder {
                upstreams: vec!["9.9.9.9:53".parse().unwrap()]
            }
        );

        let remotehosts = cfg.remotehosts.validate().unwrap();
        assert_eq!(remotehosts.reload, Duration::from_secs(3600));
        assert_eq!(remotehosts.policy, ReloadPolicy::BestEffort);
        assert!(!remotehosts.fail_on_initial_error);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        // The written file decodes back to the same config.
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[test]
    fn test_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        assert!(load_config(&path).is_err());
    }
}
