use std::net::Ipv4Addr;

use rf_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3000);
}

#[test]
fn empty_file_uses_reference_timings() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.registry.scan_interval_ms, 10_000);
    assert_eq!(config.registry.heartbeat_interval_ms, 2_000);
    assert_eq!(config.registry.retention_ms, 10_000);
    assert_eq!(config.registry.eviction_ms, 300_000);
    assert_eq!(config.registry.restart_delay_ms, 5_000);
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3000

[registry]
retention_ms = 15000

[vpc]
admin_address = "172.20.0.2"
cidr = "172.20.0.0/16"
render_port = 4100

[[discovery.candidates]]
address = "172.20.0.11"
hostname = "gpu-box-a"

[observability]
service_name = "renderfleet-staging"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.registry.retention_ms, 15_000);
    assert_eq!(config.vpc.admin_address, Ipv4Addr::new(172, 20, 0, 2));
    assert_eq!(config.vpc.render_port, 4100);
    assert_eq!(config.discovery.candidates.len(), 1);
    assert_eq!(config.observability.service_name, "renderfleet-staging");
    assert!(config.validate().is_empty());
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://localhost:*".to_string()));
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn resolved_config_roundtrips_through_toml() {
    let config = Config::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed.registry, config.registry);
    assert_eq!(parsed.vpc, config.vpc);
}
