use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hss: HssConfig,
    #[serde(default)]
    pub schemes: SchemesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP listeners
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_8888")]
    pub port: u16,
    /// Read-only management listener (GET reg-data + health). Disabled
    /// when absent.
    #[serde(default)]
    pub management_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: 8888,
            management_port: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HSS connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HssConfig {
    /// When false, the provisioning-backed fallback answers Cx requests
    /// from local data instead of a live HSS.
    #[serde(default = "d_true")]
    pub configured: bool,
    #[serde(default)]
    pub dest_realm: String,
    #[serde(default)]
    pub dest_host: String,
    /// Home realm used when the router omits `visited-network`.
    #[serde(default)]
    pub default_realm: String,
    /// S-CSCF name sent on MAR/SAR when the router does not supply one.
    #[serde(default)]
    pub server_name: String,
    /// Per-Cx-request timeout.
    #[serde(default = "d_200")]
    pub diameter_timeout_ms: u64,
    /// Cached-record age after which a re-registration must revalidate
    /// with the HSS.
    #[serde(default = "d_3600")]
    pub reregistration_time_secs: u32,
    /// TTL written into each cache entry.
    #[serde(default = "d_7200")]
    pub record_ttl_secs: u32,
    #[serde(default = "d_true")]
    pub support_shared_ifcs: bool,
}

impl Default for HssConfig {
    fn default() -> Self {
        Self {
            configured: true,
            dest_realm: String::new(),
            dest_host: String::new(),
            default_realm: String::new(),
            server_name: String::new(),
            diameter_timeout_ms: 200,
            reregistration_time_secs: 3600,
            record_ttl_secs: 7200,
            support_shared_ifcs: true,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SIP auth scheme labels
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Auth-scheme strings negotiated with the HSS. Matched by exact
/// equality against the scheme on each multimedia-auth answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemesConfig {
    #[serde(default = "d_scheme_unknown")]
    pub unknown: String,
    #[serde(default = "d_scheme_digest")]
    pub digest: String,
    #[serde(default = "d_scheme_akav1")]
    pub akav1: String,
    #[serde(default = "d_scheme_akav2")]
    pub akav2: String,
}

impl Default for SchemesConfig {
    fn default() -> Self {
        Self {
            unknown: d_scheme_unknown(),
            digest: d_scheme_digest(),
            akav1: d_scheme_akav1(),
            akav2: d_scheme_akav2(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache worker pool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "d_4")]
    pub workers: usize,
    #[serde(default = "d_100")]
    pub queue_depth: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 100,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Router (outbound) connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "d_router_url")]
    pub base_url: String,
    #[serde(default = "d_2000")]
    pub timeout_ms: u64,
    #[serde(default = "d_2")]
    pub max_retries: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: d_router_url(),
            timeout_ms: 2000,
            max_retries: 2,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local provisioning store (fallback mode)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvisioningConfig {
    /// TOML file of provisioned subscribers, used when `hss.configured`
    /// is false.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Config {
    /// Sanity-check the loaded configuration. Errors abort startup;
    /// warnings are logged and tolerated.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut err = |msg: String| {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: msg,
            })
        };

        if self.hss.configured && self.hss.dest_realm.is_empty() {
            err("hss.dest_realm must be set when hss.configured is true".into());
        }
        if self.server.management_port == Some(self.server.port) {
            err(format!(
                "server.management_port {} collides with server.port",
                self.server.port
            ));
        }
        if self.cache.workers == 0 {
            err("cache.workers must be at least 1".into());
        }
        if self.cache.queue_depth == 0 {
            err("cache.queue_depth must be at least 1".into());
        }
        if !self.hss.configured && self.provisioning.path.is_none() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "hss.configured is false but no provisioning.path is set; \
                          every subscriber lookup will miss"
                    .into(),
            });
        }
        if self.hss.record_ttl_secs < self.hss.reregistration_time_secs {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "hss.record_ttl_secs is below hss.reregistration_time_secs; \
                          cached re-registrations will always revalidate"
                    .into(),
            });
        }
        issues
    }
}

// ── serde default helpers ────────────────────────────────────────────

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_8888() -> u16 {
    8888
}
fn d_true() -> bool {
    true
}
fn d_200() -> u64 {
    200
}
fn d_2000() -> u64 {
    2000
}
fn d_3600() -> u32 {
    3600
}
fn d_7200() -> u32 {
    7200
}
fn d_4() -> usize {
    4
}
fn d_100() -> usize {
    100
}
fn d_2() -> u32 {
    2
}
fn d_router_url() -> String {
    "http://127.0.0.1:9888".into()
}
fn d_scheme_unknown() -> String {
    "Unknown".into()
}
fn d_scheme_digest() -> String {
    "SIP Digest".into()
}
fn d_scheme_akav1() -> String {
    "Digest-AKAv1-MD5".into()
}
fn d_scheme_akav2() -> String {
    "Digest-AKAv2-SHA-256".into()
}
