use std::{net::IpAddr, num::NonZeroUsize, time::Duration};

use super::{ConfigError, OptionValue, Options, TlsOptions};

#[test]
fn defaults() {
    let options = Options::default();
    assert!(options.keep_alive);
    assert_eq!(options.connect_timeout, Some(Duration::from_secs(15)));
    assert_eq!(options.transfer_timeout, Some(Duration::from_secs(30)));
    assert_eq!(options.max_connections, None);
    assert_eq!(options.max_connections_per_host.get(), 8);
    assert_eq!(options.continue_wait, Duration::from_secs(3));
    assert_eq!(options.body_spill_threshold, 2 * 1024 * 1024);
    assert_eq!(options.io_chunk_size.get(), 65536);
    assert!(options.tls.verify_peer);
    assert!(options.user_agent.to_str().unwrap().starts_with("ferry/"));
}

#[test]
fn set_by_name() {
    let mut options = Options::default();

    options.set("keep-alive", "off").unwrap();
    assert!(!options.keep_alive);
    options.set("keep-alive", 1).unwrap();
    assert!(options.keep_alive);

    options.set("transfer-timeout", 0).unwrap();
    assert_eq!(options.transfer_timeout, None);
    options.set("connect-timeout", "5").unwrap();
    assert_eq!(options.connect_timeout, Some(Duration::from_secs(5)));

    options.set("max-connections", 4).unwrap();
    assert_eq!(options.max_connections, NonZeroUsize::new(4));
    options.set("max-connections", -1).unwrap();
    assert_eq!(options.max_connections, None);

    options.set("max-body-bytes", 1024).unwrap();
    assert_eq!(options.max_body_bytes, Some(1024));
    options.set("max-body-bytes", -1).unwrap();
    assert_eq!(options.max_body_bytes, None);

    options.set("bind-local-ip", "127.0.0.1").unwrap();
    assert_eq!(options.bind_local_ip, Some(IpAddr::from([127, 0, 0, 1])));

    options.set("user-agent", "agent/1.0").unwrap();
    assert_eq!(options.user_agent, "agent/1.0");

    let tls = TlsOptions {
        verify_peer: false,
        ..TlsOptions::default()
    };
    options.set("tls-options", tls).unwrap();
    assert!(!options.tls.verify_peer);

    for key in Options::KEYS {
        assert!(!matches!(
            options.clone().set(key, OptionValue::Bool(true)),
            Err(ConfigError::UnknownOption(_))
        ));
    }
}

#[test]
fn set_invalid() {
    let mut options = Options::default();

    assert_eq!(
        options.set("follow-location", true),
        Err(ConfigError::UnknownOption("follow-location".into()))
    );

    let err = options.set("max-connections-per-host", 0).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidValue {
            key: "max-connections-per-host".into(),
            expected: "a positive integer"
        }
    );
    assert_eq!(options.max_connections_per_host.get(), 8);

    assert!(options.set("keep-alive", "maybe").is_err());
    assert!(options.set("io-chunk-size", -5).is_err());
    assert!(options.set("bind-local-ip", "localhost").is_err());
    assert!(options.set("user-agent", "").is_err());
    assert!(options.set("tls-options", true).is_err());

    let err = options
        .set_all([("store-body", OptionValue::from(false)), ("nope", OptionValue::from(1))])
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownOption(key) if key == "nope"));
    assert!(!options.store_body);
}
