mod discovery;
mod observability;
mod registry;
mod server;
mod vpc;

pub use discovery::*;
pub use observability::*;
pub use registry::*;
pub use server::*;
pub use vpc::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::{parse_private_ipv4, Cidr};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub vpc: VpcConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors.extend(self.registry.validate());
        errors.extend(self.vpc.validate());

        for (i, candidate) in self.discovery.candidates.iter().enumerate() {
            if parse_private_ipv4(&candidate.address).is_err() {
                errors.push(ConfigError::error(
                    format!("discovery.candidates[{i}].address"),
                    format!("{} is not a private IPv4 address", candidate.address),
                ));
            }
        }
        if self.discovery.probe_timeout_ms == 0 {
            errors.push(ConfigError::error(
                "discovery.probe_timeout_ms",
                "probe timeout must be greater than 0",
            ));
        }
        if !self.discovery.metrics_path.starts_with('/') {
            errors.push(ConfigError::error(
                "discovery.metrics_path",
                "metrics path must start with '/'",
            ));
        }
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                format!("{} is outside 0.0..=1.0", self.observability.sample_rate),
            ));
        }

        errors
    }
}

impl RegistryConfig {
    /// Checks shared by startup validation and runtime reconfiguration.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("registry.scan_interval_ms", self.scan_interval_ms),
            ("registry.heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("registry.retention_ms", self.retention_ms),
            ("registry.eviction_ms", self.eviction_ms),
        ] {
            if value == 0 {
                errors.push(ConfigError::error(field, "must be greater than 0"));
            }
        }
        for (field, value) in [
            ("registry.scan_interval_ms", self.scan_interval_ms),
            ("registry.heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("registry.retention_ms", self.retention_ms),
            ("registry.eviction_ms", self.eviction_ms),
            ("registry.restart_delay_ms", self.restart_delay_ms),
        ] {
            if value > MAX_WINDOW_MS {
                errors.push(ConfigError::error(
                    field,
                    format!("must be at most {MAX_WINDOW_MS} ms (30 days)"),
                ));
            }
        }
        if self.retention_ms >= self.eviction_ms {
            errors.push(ConfigError::error(
                "registry.eviction_ms",
                "eviction window must be longer than the retention window",
            ));
        }
        if self.heartbeat_interval_ms > self.retention_ms {
            errors.push(ConfigError::warning(
                "registry.heartbeat_interval_ms",
                "heartbeat checks are less frequent than the retention window",
            ));
        }
        errors
    }
}

impl VpcConfig {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !self.admin_address.is_private() {
            errors.push(ConfigError::error(
                "vpc.admin_address",
                format!("{} is not a private IPv4 address", self.admin_address),
            ));
        }
        match self.cidr.parse::<Cidr>() {
            Ok(cidr) if !cidr.contains(self.admin_address) => {
                errors.push(ConfigError::warning(
                    "vpc.cidr",
                    format!("admin address {} is outside {cidr}", self.admin_address),
                ));
            }
            Ok(_) => {}
            Err(_) => {
                errors.push(ConfigError::error(
                    "vpc.cidr",
                    format!("{} is not a valid IPv4 CIDR block", self.cidr),
                ));
            }
        }
        if self.render_port == 0 {
            errors.push(ConfigError::error("vpc.render_port", "port must be greater than 0"));
        }
        errors
    }
}
