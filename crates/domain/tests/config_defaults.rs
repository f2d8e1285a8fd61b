use cx_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8888);
    assert_eq!(config.server.management_port, None);
}

#[test]
fn hss_defaults() {
    let config = Config::default();
    assert!(config.hss.configured);
    assert_eq!(config.hss.diameter_timeout_ms, 200);
    assert_eq!(config.hss.reregistration_time_secs, 3600);
    assert_eq!(config.hss.record_ttl_secs, 7200);
    assert!(config.hss.support_shared_ifcs);
}

#[test]
fn scheme_labels_default_to_3gpp_names() {
    let config = Config::default();
    assert_eq!(config.schemes.digest, "SIP Digest");
    assert_eq!(config.schemes.akav1, "Digest-AKAv1-MD5");
    assert_eq!(config.schemes.akav2, "Digest-AKAv2-SHA-256");
}

#[test]
fn partial_toml_overrides_keep_other_defaults() {
    let toml_str = r#"
[server]
port = 9000

[hss]
configured = false
dest_realm = "hss.example.com"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert!(!config.hss.configured);
    assert_eq!(config.hss.record_ttl_secs, 7200);
    assert_eq!(config.cache.workers, 4);
}

#[test]
fn validation_flags_missing_realm() {
    let config = Config::default();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("dest_realm")));
}

#[test]
fn validation_flags_colliding_ports() {
    let mut config = Config::default();
    config.hss.dest_realm = "hss.example.com".into();
    config.server.management_port = Some(config.server.port);
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("management_port")));
}

#[test]
fn fallback_without_provisioning_is_a_warning() {
    let mut config = Config::default();
    config.hss.configured = false;
    let issues = config.validate();
    assert!(issues
        .iter()
        .all(|i| i.severity == ConfigSeverity::Warning));
    assert!(!issues.is_empty());
}
