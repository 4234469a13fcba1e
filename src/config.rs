//! Client configuration.
//!
//! Values are layered: YAML file, then `CLI_*` environment variables, then
//! command line flags (applied by the binary). Every key except `id` has a
//! default.
//!
//! ```yaml
//! id: "1"
//! server:
//!   address: "server:12345"
//! loop:
//!   period: "5s"
//! batch:
//!   maxAmount: 100
//!   maxFrameBytes: 8192
//! protocol:
//!   revision: v3
//!   strictReplies: false
//! log:
//!   level: info
//! data:
//!   path: /agency.csv
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::batcher::{BatchLimits, DEFAULT_BATCH_CEILING, DEFAULT_MAX_FRAME_BYTES};
use crate::error::{ClientError, Result};
use crate::protocol::ProtocolRevision;

/// Default collector address.
pub const DEFAULT_SERVER_ADDRESS: &str = "server:12345";

/// Default pause between batches.
pub const DEFAULT_LOOP_PERIOD: Duration = Duration::from_secs(5);

/// Default agency CSV location.
pub const DEFAULT_DATA_PATH: &str = "/agency.csv";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "CLI_";

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Agency identifier, also sent after the final batch.
    pub id: String,
    /// Collector `host:port`.
    pub server_address: String,
    /// Pause between batches.
    pub loop_period: Duration,
    /// Maximum records per batch.
    pub batch_max_amount: usize,
    /// Maximum batch frame size in bytes.
    pub max_frame_bytes: usize,
    /// Batch header layout.
    pub protocol_revision: ProtocolRevision,
    /// Abort on replies that are neither ack nor error.
    pub strict_replies: bool,
    /// `tracing` filter directive.
    pub log_level: String,
    /// Agency CSV file.
    pub data_path: PathBuf,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            loop_period: DEFAULT_LOOP_PERIOD,
            batch_max_amount: DEFAULT_BATCH_CEILING,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            protocol_revision: ProtocolRevision::default(),
            strict_replies: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }

    /// Load from an optional YAML file and the process environment, then
    /// validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer an optional YAML file and the process environment without
    /// validating, so further overrides can still fill in missing values.
    pub fn read(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ClientError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                serde_yaml_ng::from_str(&text)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Parse a YAML document, applying environment overrides from `env`.
    pub fn from_yaml_str<F>(yaml: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = serde_yaml_ng::from_str(yaml)?;
        let config = Self::resolve(file, env)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::new(file.id.unwrap_or_default());

        if let Some(address) = file.server.address {
            config.server_address = address;
        }
        if let Some(period) = file.r#loop.period {
            config.loop_period = parse_duration(&period)?;
        }
        if let Some(amount) = file.batch.max_amount {
            config.batch_max_amount = amount;
        }
        if let Some(bytes) = file.batch.max_frame_bytes {
            config.max_frame_bytes = bytes;
        }
        if let Some(revision) = file.protocol.revision {
            config.protocol_revision = revision;
        }
        if let Some(strict) = file.protocol.strict_replies {
            config.strict_replies = strict;
        }
        if let Some(level) = file.log.level {
            config.log_level = level;
        }
        if let Some(path) = file.data.path {
            config.data_path = path;
        }

        if let Some(id) = var("ID") {
            config.id = id;
        }
        if let Some(address) = var("SERVER_ADDRESS") {
            config.server_address = address;
        }
        if let Some(period) = var("LOOP_PERIOD") {
            config.loop_period = parse_duration(&period)?;
        }
        if let Some(amount) = var("BATCH_MAXAMOUNT") {
            config.batch_max_amount = parse_number("BATCH_MAXAMOUNT", &amount)?;
        }
        if let Some(bytes) = var("BATCH_MAXFRAMEBYTES") {
            config.max_frame_bytes = parse_number("BATCH_MAXFRAMEBYTES", &bytes)?;
        }
        if let Some(revision) = var("PROTOCOL_REVISION") {
            config.protocol_revision = revision.parse()?;
        }
        if let Some(strict) = var("PROTOCOL_STRICTREPLIES") {
            config.strict_replies = parse_bool("PROTOCOL_STRICTREPLIES", &strict)?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(path) = var("DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Check the invariants the session relies on.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ClientError::Config("client id is required".to_string()));
        }
        if self.server_address.is_empty() {
            return Err(ClientError::Config("server address is required".to_string()));
        }
        if self.batch_max_amount == 0 {
            return Err(ClientError::Config(
                "batch.maxAmount must be at least 1".to_string(),
            ));
        }
        let header = self.protocol_revision.header_size();
        if self.max_frame_bytes <= header {
            return Err(ClientError::Config(format!(
                "batch.maxFrameBytes must exceed the {header} byte batch header"
            )));
        }
        Ok(())
    }

    /// Batch limits derived from this configuration.
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            ceiling: self.batch_max_amount,
            max_frame_bytes: self.max_frame_bytes,
            revision: self.protocol_revision,
        }
    }
}

/// On-disk layout. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    id: Option<String>,
    server: ServerSection,
    r#loop: LoopSection,
    batch: BatchSection,
    protocol: ProtocolSection,
    log: LogSection,
    data: DataSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoopSection {
    period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BatchSection {
    max_amount: Option<usize>,
    max_frame_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProtocolSection {
    revision: Option<ProtocolRevision>,
    strict_replies: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogSection {
    level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataSection {
    path: Option<PathBuf>,
}

/// Parse durations such as `500ms`, `5s`, `2m` or `1h`.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| ClientError::Config(format!("invalid duration: {text:?}")))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        "" if value == 0 => Ok(Duration::ZERO),
        _ => Err(ClientError::Config(format!(
            "invalid duration unit in {text:?}, expected ms, s, m or h"
        ))),
    }
}

fn parse_number(key: &str, text: &str) -> Result<usize> {
    text.trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{ENV_PREFIX}{key} is not a number: {text:?}")))
}

fn parse_bool(key: &str, text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ClientError::Config(format!(
            "{ENV_PREFIX}{key} is not a boolean: {text:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
id: "3"
server:
  address: "collector:9000"
loop:
  period: "250ms"
batch:
  maxAmount: 40
  maxFrameBytes: 4096
protocol:
  revision: v1
  strictReplies: true
log:
  level: debug
data:
  path: /data/agency-3.csv
"#;
        let config = ClientConfig::from_yaml_str(yaml, no_env).unwrap();
        assert_eq!(config.id, "3");
        assert_eq!(config.server_address, "collector:9000");
        assert_eq!(config.loop_period, Duration::from_millis(250));
        assert_eq!(config.batch_max_amount, 40);
        assert_eq!(config.max_frame_bytes, 4096);
        assert_eq!(config.protocol_revision, ProtocolRevision::V1);
        assert!(config.strict_replies);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.data_path, PathBuf::from("/data/agency-3.csv"));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_yaml_str("id: \"1\"", no_env).unwrap();
        assert_eq!(config, ClientConfig::new("1"));
        assert_eq!(config.batch_limits(), BatchLimits::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("CLI_ID", "9"),
            ("CLI_LOOP_PERIOD", "1s"),
            ("CLI_BATCH_MAXAMOUNT", "7"),
            ("CLI_PROTOCOL_REVISION", "v2"),
            ("CLI_PROTOCOL_STRICTREPLIES", "yes"),
        ]
        .into_iter()
        .collect();
        let yaml = "id: \"1\"\nbatch:\n  maxAmount: 50\n";

        let config =
            ClientConfig::from_yaml_str(yaml, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.id, "9");
        assert_eq!(config.loop_period, Duration::from_secs(1));
        assert_eq!(config.batch_max_amount, 7);
        assert_eq!(config.protocol_revision, ProtocolRevision::V2);
        assert!(config.strict_replies);
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = ClientConfig::from_yaml_str("server:\n  address: a:1\n", no_env).unwrap_err();
        assert!(err.to_string().contains("client id is required"));
    }

    #[test]
    fn test_zero_batch_amount_rejected() {
        let yaml = "id: \"1\"\nbatch:\n  maxAmount: 0\n";
        assert!(ClientConfig::from_yaml_str(yaml, no_env).is_err());
    }

    #[test]
    fn test_frame_limit_must_exceed_header() {
        let yaml = "id: \"1\"\nbatch:\n  maxFrameBytes: 9\n";
        let err = ClientConfig::from_yaml_str(yaml, no_env).unwrap_err();
        assert!(err.to_string().contains("9 byte batch header"));
    }

    #[test]
    fn test_bad_env_number() {
        let err = ClientConfig::from_yaml_str("id: \"1\"", |k| {
            (k == "CLI_BATCH_MAXAMOUNT").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = ClientConfig::from_yaml_str("batch: [1, 2", no_env).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("5 days").is_err());
    }

    #[test]
    fn test_load_without_file_uses_environment() {
        // CLI_ID is not set in the test environment, so validation fails.
        if std::env::var("CLI_ID").is_err() {
            assert!(ClientConfig::load(None).is_err());
        }
    }
}
