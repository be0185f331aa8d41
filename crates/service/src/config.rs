//! Configuration management for the trustroute service.
//!
//! Configuration is assembled from, in increasing priority:
//! - Default values
//! - A TOML file (`${VAR_NAME}` placeholders are expanded outside comments)
//! - `TRUSTROUTE_*` environment variables
//!
//! Numeric values that are zero or unparsable fall back to their defaults with a
//! warning. Only misconfigurations that make a run meaningless (bad RPC URL,
//! missing identities, missing signer outside dry-run mode) fail startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{info, warn};
use trustroute_core::{canonicalize, Address};
use trustroute_engine::reconciler::{
    DEFAULT_BLACKLIST_CHUNK_SIZE, DEFAULT_CHECK_WIDTH, DEFAULT_ENABLE_BATCH_SIZE,
    DEFAULT_PAGE_SIZE,
};
use trustroute_engine::{ReconcilerConfig, SourceSelection};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "TRUSTROUTE_";

/// Circles v2 Hub on Gnosis Chain.
pub const DEFAULT_HUB: &str = "0xc12C1E50ABB450d6205Ea2C3Fa861b3B834d13e8";

/// Main configuration for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Contract and identity addresses
    pub contracts: ContractsConfig,

    /// Reconciliation settings
    pub reconcile: ReconcileConfig,

    /// Blacklist screening service
    pub screening: ScreeningConfig,

    /// Transaction signer
    pub signer: SignerConfig,

    /// Idempotency ledger database
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Circles RPC URL (must serve `circles_query` and `eth_*`)
    pub rpc_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
        }
    }
}

/// Contract and identity addresses, kept as text until canonicalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Router whose trust set is reconciled (also the mutation target)
    pub router: String,

    /// Default origin group for candidates outside any base group
    pub default_origin: String,

    /// Hub contract answering `isHuman`
    pub hub: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            router: String::new(),
            default_origin: String::new(),
            hub: DEFAULT_HUB.to_string(),
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Compute and log batches without sending transactions
    pub dry_run: bool,

    /// Seconds between runs
    pub poll_interval_secs: u64,

    /// Maximum addresses per enablement transaction
    pub enable_batch_size: usize,

    /// Rows per `circles_query` page
    pub page_size: usize,

    /// Maximum addresses per screening request
    pub blacklist_chunk_size: usize,

    /// Maximum concurrent screening/humanity lookups
    pub humanity_check_width: usize,

    /// Discover registered human avatars
    pub registrations: bool,

    /// Discover base group members
    pub base_groups: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            poll_interval_secs: default_poll_interval_secs(),
            enable_batch_size: DEFAULT_ENABLE_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            blacklist_chunk_size: DEFAULT_BLACKLIST_CHUNK_SIZE,
            humanity_check_width: DEFAULT_CHECK_WIDTH,
            registrations: true,
            base_groups: true,
        }
    }
}

/// Blacklist screening service. Screening is disabled when `url` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Base URL of the screening API
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_screening_timeout_secs(),
        }
    }
}

/// Transaction signer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Private key (64 hex characters, optional 0x prefix)
    pub private_key: Option<String>,
}

/// Idempotency ledger database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://trustroute.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log format: json or pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://rpc.aboutcircles.com/".to_string()
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_screening_timeout_secs() -> u64 {
    10
}

fn default_database_url() -> String {
    "sqlite://trustroute.db".to_string()
}

fn default_max_connections() -> u32 {
    1
}

impl Config {
    /// Load and validate configuration from a TOML file plus environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults plus environment are used.
    /// The result is sanitized but not validated.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => {
                let expanded = expand_env_vars(&contents)
                    .with_context(|| format!("Failed to expand config file: {}", path.display()))?;
                toml::from_str(&expanded)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Config file {} not found, using defaults and environment",
                    path.display()
                );
                Config::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.sanitize();

        Ok(config)
    }

    /// Load configuration from a TOML string (no environment overrides).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml).context("Failed to parse TOML configuration")?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRUSTROUTE_*` overrides looked up through `lookup`.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var("RPC_URL") {
            self.network.rpc_url = v;
        }
        if let Some(v) = var("ROUTER") {
            self.contracts.router = v;
        }
        if let Some(v) = var("DEFAULT_ORIGIN") {
            self.contracts.default_origin = v;
        }
        if let Some(v) = var("HUB") {
            self.contracts.hub = v;
        }
        if let Some(v) = var("SCREENING_URL") {
            self.screening.url = Some(v);
        }
        if let Some(v) = var("PRIVATE_KEY") {
            self.signer.private_key = Some(v);
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }

        override_bool(&mut self.reconcile.dry_run, "DRY_RUN", var("DRY_RUN"));
        override_number(
            &mut self.reconcile.poll_interval_secs,
            "POLL_INTERVAL_SECS",
            var("POLL_INTERVAL_SECS"),
        );
        override_number(
            &mut self.reconcile.enable_batch_size,
            "ENABLE_BATCH_SIZE",
            var("ENABLE_BATCH_SIZE"),
        );
        override_number(&mut self.reconcile.page_size, "PAGE_SIZE", var("PAGE_SIZE"));
        override_number(
            &mut self.reconcile.blacklist_chunk_size,
            "BLACKLIST_CHUNK_SIZE",
            var("BLACKLIST_CHUNK_SIZE"),
        );
        override_number(
            &mut self.reconcile.humanity_check_width,
            "HUMANITY_CHECK_WIDTH",
            var("HUMANITY_CHECK_WIDTH"),
        );
    }

    /// Reset zero sizes and intervals to their defaults.
    pub fn sanitize(&mut self) {
        let defaults = ReconcileConfig::default();
        let r = &mut self.reconcile;

        reset_zero(&mut r.poll_interval_secs, defaults.poll_interval_secs, "poll_interval_secs");
        reset_zero(&mut r.enable_batch_size, defaults.enable_batch_size, "enable_batch_size");
        reset_zero(&mut r.page_size, defaults.page_size, "page_size");
        reset_zero(
            &mut r.blacklist_chunk_size,
            defaults.blacklist_chunk_size,
            "blacklist_chunk_size",
        );
        reset_zero(
            &mut r.humanity_check_width,
            defaults.humanity_check_width,
            "humanity_check_width",
        );
        reset_zero(
            &mut self.screening.timeout_secs,
            default_screening_timeout_secs(),
            "screening.timeout_secs",
        );
        reset_zero(
            &mut self.database.max_connections,
            default_max_connections(),
            "database.max_connections",
        );
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            anyhow::bail!("Network RPC URL cannot be empty");
        }

        let router = self.router()?;
        let origin = self.default_origin()?;
        self.hub()?;
        if router.is_zero() {
            anyhow::bail!("Contracts router must be a non-zero address");
        }
        if origin.is_zero() {
            anyhow::bail!("Contracts default_origin must be a non-zero address");
        }

        if let Some(url) = self.screening.url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("Screening url must start with http:// or https://");
            }
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        match self.signer.private_key.as_deref() {
            Some(key) => {
                let key = key.trim().trim_start_matches("0x");
                if key.len() != 64 {
                    anyhow::bail!(
                        "Signer private_key must be 64 hex characters (got {})",
                        key.len()
                    );
                }
                if !key.chars().all(|c| c.is_ascii_hexdigit()) {
                    anyhow::bail!("Signer private_key must be a valid hex string");
                }
            }
            None if !self.reconcile.dry_run => {
                anyhow::bail!(
                    "Signer private_key is required unless reconcile.dry_run is enabled"
                );
            }
            None => {}
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }

    /// Canonical router address.
    pub fn router(&self) -> Result<Address> {
        canonicalize(&self.contracts.router).context("Invalid contracts.router")
    }

    /// Canonical default origin address.
    pub fn default_origin(&self) -> Result<Address> {
        canonicalize(&self.contracts.default_origin).context("Invalid contracts.default_origin")
    }

    /// Canonical hub address.
    pub fn hub(&self) -> Result<Address> {
        canonicalize(&self.contracts.hub).context("Invalid contracts.hub")
    }

    /// Engine settings derived from this configuration.
    pub fn reconciler_config(&self) -> Result<ReconcilerConfig> {
        let r = &self.reconcile;
        let mut config = ReconcilerConfig::new(self.router()?, self.default_origin()?);
        config.simulate = r.dry_run;
        config.enable_batch_size = non_zero(r.enable_batch_size, DEFAULT_ENABLE_BATCH_SIZE);
        config.page_size = non_zero(r.page_size, DEFAULT_PAGE_SIZE);
        config.blacklist_chunk_size =
            non_zero(r.blacklist_chunk_size, DEFAULT_BLACKLIST_CHUNK_SIZE);
        config.check_width = non_zero(r.humanity_check_width, DEFAULT_CHECK_WIDTH);
        config.sources = SourceSelection {
            registrations: r.registrations,
            base_groups: r.base_groups,
        };
        Ok(config)
    }
}

fn non_zero(value: usize, fallback: usize) -> NonZeroUsize {
    NonZeroUsize::new(value)
        .or_else(|| NonZeroUsize::new(fallback))
        .unwrap_or(NonZeroUsize::MIN)
}

fn reset_zero<T>(value: &mut T, default: T, name: &str)
where
    T: Default + PartialEq + std::fmt::Display + Copy,
{
    if *value == T::default() {
        warn!("{} must be > 0, using default {}", name, default);
        *value = default;
    }
}

fn override_number<T>(target: &mut T, name: &str, raw: Option<String>)
where
    T: std::str::FromStr + Default + PartialEq,
{
    let Some(raw) = raw else { return };
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => *target = value,
        _ => warn!(
            "Ignoring invalid {}{}={:?}, keeping configured value",
            ENV_PREFIX, name, raw
        ),
    }
}

fn override_bool(target: &mut bool, name: &str, raw: Option<String>) {
    let Some(raw) = raw else { return };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *target = true,
        "0" | "false" | "no" | "off" => *target = false,
        _ => warn!(
            "Ignoring invalid {}{}={:?}, keeping configured value",
            ENV_PREFIX, name, raw
        ),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Comment,
    Basic,
    Literal,
    MultiBasic,
    MultiLiteral,
}

/// Expand `${VAR_NAME}` placeholders from the process environment.
///
/// Placeholders inside TOML comments are left untouched; placeholders inside
/// any string form are expanded. A referenced but unset variable is an error.
pub fn expand_env_vars(input: &str) -> Result<String> {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut state = Scan::Code;
    let mut i = 0;

    let triple = |i: usize, q: char| chars.get(i..i + 3).is_some_and(|s| s.iter().all(|c| *c == q));

    while i < chars.len() {
        let ch = chars[i];

        if ch == '$' && state != Scan::Comment && chars.get(i + 1) == Some(&'{') {
            let start = i + 2;
            let Some(len) = chars[start..].iter().position(|c| *c == '}') else {
                anyhow::bail!("Unclosed environment variable placeholder at position {}", i);
            };
            let name: String = chars[start..start + len].iter().collect();
            if name.is_empty() {
                anyhow::bail!("Empty environment variable name at position {}", i);
            }
            let value = lookup(&name).with_context(|| {
                format!(
                    "Environment variable '{}' is not set (referenced at position {})",
                    name, i
                )
            })?;
            out.push_str(&value);
            i = start + len + 1;
            continue;
        }

        let mut width = 1;
        state = match (state, ch) {
            (Scan::Code, '#') => Scan::Comment,
            (Scan::Comment, '\n') => Scan::Code,
            (Scan::Code, '"') if triple(i, '"') => {
                width = 3;
                Scan::MultiBasic
            }
            (Scan::Code, '\'') if triple(i, '\'') => {
                width = 3;
                Scan::MultiLiteral
            }
            (Scan::Code, '"') => Scan::Basic,
            (Scan::Code, '\'') => Scan::Literal,
            (Scan::Basic | Scan::MultiBasic, '\\') => {
                width = 2;
                state
            }
            (Scan::Basic, '"') | (Scan::Literal, '\'') => Scan::Code,
            (Scan::MultiBasic, '"') if triple(i, '"') => {
                width = 3;
                Scan::Code
            }
            (Scan::MultiLiteral, '\'') if triple(i, '\'') => {
                width = 3;
                Scan::Code
            }
            (s, _) => s,
        };

        let end = (i + width).min(chars.len());
        out.extend(&chars[i..end]);
        i = end;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ROUTER: &str = "0xdc287474114cc0551a81ddc2eb51783fbf34802f";
    const ORIGIN: &str = "0x1aca75e38263c79d9d4f10df0635cc6fcfe6f026";
    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn minimal_toml() -> String {
        format!(
            r#"
[contracts]
router = "{ROUTER}"
default_origin = "{ORIGIN}"

[reconcile]
dry_run = true
"#
        )
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_full_config() {
        let toml = format!(
            r#"
[network]
rpc_url = "https://rpc.example.com"

[contracts]
router = "{ROUTER}"
default_origin = "{ORIGIN}"

[reconcile]
dry_run = false
poll_interval_secs = 60
enable_batch_size = 25
page_size = 200
blacklist_chunk_size = 100
humanity_check_width = 8
registrations = false

[screening]
url = "https://screening.example.com"
timeout_secs = 5

[signer]
private_key = "0x{KEY}"

[database]
url = "sqlite://test.db"

[logging]
level = "debug"
format = "json"
"#
        );

        let config = Config::from_toml_str(&toml).unwrap();
        let engine = config.reconciler_config().unwrap();

        assert_eq!(config.network.rpc_url, "https://rpc.example.com");
        assert_eq!(engine.router, canonicalize(ROUTER).unwrap());
        assert_eq!(engine.enable_batch_size.get(), 25);
        assert_eq!(engine.page_size.get(), 200);
        assert_eq!(engine.blacklist_chunk_size.get(), 100);
        assert_eq!(engine.check_width.get(), 8);
        assert!(!engine.simulate);
        assert!(!engine.sources.registrations);
        assert!(engine.sources.base_groups);
        assert_eq!(config.reconcile.poll_interval_secs, 60);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_toml().as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_origin().unwrap(), canonicalize(ORIGIN).unwrap());
    }

    #[test]
    fn test_read_missing_file_uses_defaults() {
        let config = Config::read("/nonexistent/trustroute.toml").unwrap();
        assert_eq!(config.contracts.hub, DEFAULT_HUB);
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_toml_str(&minimal_toml()).unwrap();

        assert_eq!(config.network.rpc_url, "https://rpc.aboutcircles.com/");
        assert_eq!(config.reconcile.poll_interval_secs, 15);
        assert_eq!(config.reconcile.enable_batch_size, DEFAULT_ENABLE_BATCH_SIZE);
        assert_eq!(config.reconcile.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.database.url, "sqlite://trustroute.db");
        assert!(config.screening.url.is_none());
        assert_eq!(config.hub().unwrap(), canonicalize(DEFAULT_HUB).unwrap());
    }

    #[test]
    fn test_identities_are_canonicalized() {
        let toml = minimal_toml().replace(ROUTER, &ROUTER.to_uppercase().replace("0X", "0x"));
        let config = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.router().unwrap(), canonicalize(ROUTER).unwrap());
    }

    #[test]
    fn test_validation_requires_signer_outside_dry_run() {
        let toml = minimal_toml().replace("dry_run = true", "dry_run = false");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("private_key is required"));
    }

    #[test]
    fn test_validation_invalid_private_key() {
        let toml = format!("{}\n[signer]\nprivate_key = \"0x1234\"\n", minimal_toml());
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("64 hex characters"));
    }

    #[test]
    fn test_validation_accepts_padded_private_key() {
        let toml = format!(
            "{}\n[signer]\nprivate_key = \"  0x{KEY}\\n\"\n",
            minimal_toml().replace("dry_run = true", "dry_run = false")
        );
        let config = Config::from_toml_str(&toml).unwrap();
        assert!(crate::sink::parse_signer(config.signer.private_key.as_deref().unwrap()).is_ok());
    }

    #[test]
    fn test_validation_missing_router() {
        let toml = minimal_toml().replace(&format!("router = \"{ROUTER}\""), "");
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_validation_zero_default_origin() {
        let toml = minimal_toml().replace(ORIGIN, "0x0000000000000000000000000000000000000000");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("default_origin must be a non-zero"));
    }

    #[test]
    fn test_zero_sizes_fall_back_to_defaults() {
        let toml = format!(
            "{}enable_batch_size = 0\npoll_interval_secs = 0\n",
            minimal_toml()
        );
        let config = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.reconcile.enable_batch_size, DEFAULT_ENABLE_BATCH_SIZE);
        assert_eq!(config.reconcile.poll_interval_secs, 15);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_toml_str(&minimal_toml()).unwrap();
        config.apply_overrides(env(&[
            ("TRUSTROUTE_RPC_URL", "https://other.example.com"),
            ("TRUSTROUTE_ENABLE_BATCH_SIZE", "7"),
            ("TRUSTROUTE_DRY_RUN", "false"),
            ("TRUSTROUTE_PRIVATE_KEY", KEY),
        ]));
        config.validate().unwrap();

        assert_eq!(config.network.rpc_url, "https://other.example.com");
        assert_eq!(config.reconcile.enable_batch_size, 7);
        assert!(!config.reconcile.dry_run);
        assert_eq!(config.signer.private_key.as_deref(), Some(KEY));
    }

    #[test]
    fn test_invalid_env_overrides_are_ignored() {
        let mut config = Config::from_toml_str(&minimal_toml()).unwrap();
        config.apply_overrides(env(&[
            ("TRUSTROUTE_ENABLE_BATCH_SIZE", "lots"),
            ("TRUSTROUTE_PAGE_SIZE", "0"),
            ("TRUSTROUTE_POLL_INTERVAL_SECS", "-5"),
            ("TRUSTROUTE_DRY_RUN", "maybe"),
        ]));

        assert_eq!(config.reconcile.enable_batch_size, DEFAULT_ENABLE_BATCH_SIZE);
        assert_eq!(config.reconcile.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.reconcile.poll_interval_secs, 15);
        assert!(config.reconcile.dry_run);
    }

    #[test]
    fn test_expand_env_vars() {
        let lookup = env(&[("TEST_RPC", "https://rpc.example.com")]);
        let result = expand_with(r#"rpc_url = "${TEST_RPC}""#, lookup).unwrap();
        assert_eq!(result, r#"rpc_url = "https://rpc.example.com""#);
    }

    #[test]
    fn test_expand_env_vars_undefined() {
        let err = expand_with("key = \"${NOPE}\"", env(&[])).unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn test_expand_env_vars_malformed() {
        assert!(expand_with("key = \"${}\"", env(&[])).is_err());
        assert!(expand_with("key = \"${OPEN", env(&[])).is_err());
    }

    #[test]
    fn test_expand_env_vars_ignores_comments() {
        let input = "# use private_key = \"${SIGNER_KEY}\"\nkey = \"${REAL}\" # or ${OTHER}\n";
        let result = expand_with(input, env(&[("REAL", "value")])).unwrap();
        assert!(result.contains("${SIGNER_KEY}"));
        assert!(result.contains("${OTHER}"));
        assert!(result.contains("key = \"value\""));
    }

    #[test]
    fn test_expand_env_vars_hash_inside_strings() {
        let lookup = env(&[("SUFFIX", "token")]);
        let basic = expand_with(r#"url = "https://x.io/#${SUFFIX}""#, &lookup).unwrap();
        assert_eq!(basic, r#"url = "https://x.io/#token""#);

        let literal = expand_with("url = 'a#${SUFFIX}'", &lookup).unwrap();
        assert_eq!(literal, "url = 'a#token'");

        let escaped = expand_with(r##"v = "q\"#${SUFFIX}""##, &lookup).unwrap();
        assert_eq!(escaped, r##"v = "q\"#token""##);
    }

    #[test]
    fn test_expand_env_vars_multiline_strings() {
        let lookup = env(&[("VAR", "x")]);
        let input = "v = \"\"\"\n# not a comment ${VAR}\n\"\"\"\n# comment ${VAR}\n";
        let result = expand_with(input, &lookup).unwrap();
        assert_eq!(result, "v = \"\"\"\n# not a comment x\n\"\"\"\n# comment ${VAR}\n");

        let literal = expand_with("v = '''\n#${VAR}\n'''\n", &lookup).unwrap();
        assert_eq!(literal, "v = '''\n#x\n'''\n");
    }
}
