//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Key material configuration.
    #[serde(default)]
    pub crypto: CryptoConfig,
    /// Business limits.
    #[serde(default)]
    pub business: BusinessConfig,
    /// Reclaimer configuration.
    #[serde(default)]
    pub gc: GcConfig,
}

impl AppConfig {
    /// Validate configuration invariants across all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.business.validate()?;
        self.gc.validate()?;
        Ok(())
    }

    /// Create a test configuration with temp-friendly defaults.
    ///
    /// **For testing only.** Uses an in-repo master key and a throwaway
    /// JWT secret.
    pub fn for_testing() -> Self {
        Self {
            crypto: CryptoConfig {
                master_key: MasterKeyConfig::Value {
                    key: "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
                        .to_string(),
                },
                jwt_secret: "test-jwt-secret".to_string(),
            },
            ..Default::default()
        }
    }
}

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory for resumable-upload temp objects.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Enable request tracing.
    #[serde(default)]
    pub enable_tracing: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_dir: default_upload_dir(),
            enable_tracing: false,
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (testing and single-node deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database (production).
    Postgres {
        #[serde(default = "default_pg_host")]
        host: String,
        #[serde(default = "default_pg_port")]
        port: u16,
        user: Option<String>,
        password: Option<String>,
        #[serde(default = "default_pg_database")]
        database: String,
        #[serde(default)]
        ssl_mode: PgSslMode,
        /// Connection pool size.
        #[serde(default = "default_pg_max_connections")]
        max_connections: u32,
        /// Server-side statement timeout in milliseconds.
        statement_timeout_ms: Option<u64>,
    },
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_database() -> String {
    "coffre".to_string()
}

fn default_pg_max_connections() -> u32 {
    25
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

/// Blob storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Local {
        /// Root directory for blob objects.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if unset.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient credential chain if unset.
        secret_access_key: Option<String>,
        /// Force path-style URLs. Required for MinIO and some S3-compatible services.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            path: PathBuf::from("./data/blobs"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                (Some(_), Some(_)) | (None, None) => Ok(()),
                _ => Err(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ),
            },
            _ => Ok(()),
        }
    }
}

/// Key material configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// The master key (KEK) wrapping every data encryption key.
    #[serde(default)]
    pub master_key: MasterKeyConfig,
    /// HMAC secret for bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            master_key: MasterKeyConfig::default(),
            jwt_secret: String::new(),
        }
    }
}

/// Where the master key comes from.
///
/// The resolved value must be 64 hex characters decoding to a 32-byte KEK.
/// Resolution failure is fatal at startup: the server must never run
/// without the key that unwraps every stored DEK.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum MasterKeyConfig {
    /// Read from an environment variable.
    Env {
        #[serde(default = "default_master_key_var")]
        var: String,
    },
    /// Read from a file.
    File { path: PathBuf },
    /// Inline value (not recommended outside tests).
    Value { key: String },
}

fn default_master_key_var() -> String {
    "APP_MASTER_KEY".to_string()
}

impl Default for MasterKeyConfig {
    fn default() -> Self {
        Self::Env {
            var: default_master_key_var(),
        }
    }
}

impl MasterKeyConfig {
    /// Resolve the configured source to the 32-byte KEK.
    pub fn resolve(&self) -> crate::Result<[u8; 32]> {
        let hex = match self {
            Self::Env { var } => std::env::var(var).map_err(|_| {
                crate::Error::Config(format!("master key env var not set: {var}"))
            })?,
            Self::File { path } => std::fs::read_to_string(path)
                .map_err(|e| {
                    crate::Error::Config(format!(
                        "failed to read master key file {}: {e}",
                        path.display()
                    ))
                })?
                .trim()
                .to_string(),
            Self::Value { key } => key.clone(),
        };
        decode_key_hex(hex.trim())
    }
}

/// Decode a 64-hex-char string to 32 key bytes.
fn decode_key_hex(s: &str) -> crate::Result<[u8; 32]> {
    if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(crate::Error::Config(format!(
            "master key must be 64 hex characters, got {} characters",
            s.len()
        )));
    }
    let mut key = [0u8; 32];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).expect("hex chunk is ascii");
        key[i] = u8::from_str_radix(pair, 16).expect("validated hex digit");
    }
    Ok(key)
}

/// Business limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BusinessConfig {
    /// Maximum size of a single file in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Default storage quota for new users in bytes.
    #[serde(default = "default_user_quota")]
    pub default_user_quota: u64,
    /// Pickup code length. Must be in [6, 12].
    #[serde(default = "default_share_code_length")]
    pub share_code_length: usize,
    /// Default share lifetime in seconds.
    #[serde(default = "default_share_expiry_secs")]
    pub default_share_expiry_secs: u64,
    /// Maximum share lifetime in seconds.
    #[serde(default = "default_max_share_expiry_secs")]
    pub max_share_expiry_secs: u64,
    /// Maximum files per share.
    #[serde(default = "default_max_files_per_share")]
    pub max_files_per_share: usize,
    /// Whether new registrations are accepted.
    #[serde(default = "default_registration_enabled")]
    pub registration_enabled: bool,
    /// Invite code required at registration, if set.
    #[serde(default)]
    pub invite_code: Option<String>,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 * 1024 // 10 GiB
}

fn default_user_quota() -> u64 {
    10 * 1024 * 1024 * 1024 // 10 GiB
}

fn default_share_code_length() -> usize {
    crate::pickup::DEFAULT_LENGTH
}

fn default_share_expiry_secs() -> u64 {
    7 * 24 * 3600
}

fn default_max_share_expiry_secs() -> u64 {
    30 * 24 * 3600
}

fn default_max_files_per_share() -> usize {
    100
}

fn default_registration_enabled() -> bool {
    true
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            default_user_quota: default_user_quota(),
            share_code_length: default_share_code_length(),
            default_share_expiry_secs: default_share_expiry_secs(),
            max_share_expiry_secs: default_max_share_expiry_secs(),
            max_files_per_share: default_max_files_per_share(),
            registration_enabled: default_registration_enabled(),
            invite_code: None,
        }
    }
}

impl BusinessConfig {
    /// Validate business configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if !(6..=12).contains(&self.share_code_length) {
            return Err(format!(
                "share_code_length must be in [6, 12], got {}",
                self.share_code_length
            ));
        }
        if self.default_share_expiry_secs > self.max_share_expiry_secs {
            return Err("default_share_expiry_secs exceeds max_share_expiry_secs".to_string());
        }
        if self.max_files_per_share == 0 {
            return Err("max_files_per_share must be positive".to_string());
        }
        Ok(())
    }

    /// Default share lifetime as a Duration.
    pub fn default_share_expiry(&self) -> Duration {
        Duration::seconds(i64::try_from(self.default_share_expiry_secs).unwrap_or(i64::MAX))
    }

    /// Maximum share lifetime as a Duration.
    pub fn max_share_expiry(&self) -> Duration {
        Duration::seconds(i64::try_from(self.max_share_expiry_secs).unwrap_or(i64::MAX))
    }
}

/// Reclaimer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GcConfig {
    /// Whether the background scheduler runs at all.
    #[serde(default = "default_gc_enabled")]
    pub enabled: bool,
    /// Days a tombstoned file record is retained before hard removal.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Hours an abandoned upload fragment is retained.
    #[serde(default = "default_fragment_retention_hours")]
    pub fragment_retention_hours: u32,
    /// Hour of day (UTC) for the daily GC run.
    #[serde(default = "default_gc_hour")]
    pub gc_hour: u8,
    /// Seconds between lifecycle sweeps.
    #[serde(default = "default_lifecycle_interval_secs")]
    pub lifecycle_interval_secs: u64,
}

fn default_gc_enabled() -> bool {
    true
}

fn default_retention_days() -> u32 {
    7
}

fn default_fragment_retention_hours() -> u32 {
    24
}

fn default_gc_hour() -> u8 {
    2
}

fn default_lifecycle_interval_secs() -> u64 {
    3600
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: default_gc_enabled(),
            retention_days: default_retention_days(),
            fragment_retention_hours: default_fragment_retention_hours(),
            gc_hour: default_gc_hour(),
            lifecycle_interval_secs: default_lifecycle_interval_secs(),
        }
    }
}

impl GcConfig {
    /// Validate reclaimer configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.gc_hour > 23 {
            return Err(format!("gc_hour must be in [0, 23], got {}", self.gc_hour));
        }
        if self.lifecycle_interval_secs == 0 {
            return Err("lifecycle_interval_secs must be positive".to_string());
        }
        Ok(())
    }

    /// Tombstone retention as a Duration.
    pub fn retention(&self) -> Duration {
        Duration::days(i64::from(self.retention_days))
    }

    /// Fragment retention as a Duration.
    pub fn fragment_retention(&self) -> Duration {
        Duration::hours(i64::from(self.fragment_retention_hours))
    }
}
