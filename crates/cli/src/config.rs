//! Startup configuration
//!
//! Values come from three layers, highest precedence first: command line
//! flags, the JSON file named by `--config`, and built-in defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use editserver_adapters::http_server::{DEFAULT_EDITOR_COMMAND, DEFAULT_MAX_BODY_BYTES};
use editserver_adapters::ServerConfig;
use editserver_protocol::{ConfigError, OriginPolicy, DEFAULT_ORIGIN_PREFIX};
use editserver_runtime::{EditorCommand, ExitPolicy};
use serde::Deserialize;

use crate::Cli;

/// Bind address used when neither a flag nor the file sets one.
pub const DEFAULT_BIND: &str = ":8888";

/// Contents of the `--config` file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub command: Option<String>,
    pub require_origin: Option<bool>,
    pub origin_prefix: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub editor_timeout_secs: Option<u64>,
    pub exit_policy: Option<ExitPolicy>,
    pub max_concurrent_edits: Option<usize>,
    pub max_body_bytes: Option<usize>,
}

/// Read and parse a JSON config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Merge flags over the file config and validate the result.
pub fn build_server_config(cli: &Cli, file: FileConfig) -> Result<ServerConfig, ConfigError> {
    let bind = cli
        .bind
        .clone()
        .or(file.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let command = cli
        .command
        .clone()
        .or(file.command)
        .unwrap_or_else(|| DEFAULT_EDITOR_COMMAND.to_string());

    let require_origin = !cli.allow_any_origin && file.require_origin.unwrap_or(true);
    let origin = OriginPolicy {
        require_origin,
        prefix: cli
            .origin_prefix
            .clone()
            .or(file.origin_prefix)
            .unwrap_or_else(|| DEFAULT_ORIGIN_PREFIX.to_string()),
    };

    let exit_policy = if cli.strict_exit {
        ExitPolicy::Strict
    } else {
        file.exit_policy.unwrap_or_default()
    };

    let config = ServerConfig {
        bind_addr: parse_bind_address(&bind)?,
        editor: EditorCommand::parse(&command)?,
        origin,
        scratch_dir: cli
            .temp_dir
            .clone()
            .or(file.temp_dir)
            .unwrap_or_else(std::env::temp_dir),
        exit_policy,
        editor_timeout: cli
            .editor_timeout_secs
            .or(file.editor_timeout_secs)
            .map(Duration::from_secs),
        max_concurrent_edits: cli.max_concurrent_edits.or(file.max_concurrent_edits),
        max_body_bytes: cli
            .max_body_bytes
            .or(file.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES),
    };

    config.validate()?;
    Ok(config)
}

/// Parse a bind address. A bare `:port` listens on all interfaces and host
/// names are resolved to their first address.
pub fn parse_bind_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBindAddress {
        address: address.to_string(),
        reason,
    };

    let full = match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => address.to_string(),
    };

    if let Ok(addr) = full.parse::<SocketAddr>() {
        return Ok(addr);
    }

    full.to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["edit-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = build_server_config(&cli(&[]), FileConfig::default()).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8888".parse().unwrap());
        assert_eq!(config.editor.program(), "gvim");
        assert_eq!(config.editor.args(), &["-f".to_string()]);
        assert!(config.origin.require_origin);
        assert_eq!(config.origin.prefix, DEFAULT_ORIGIN_PREFIX);
        assert_eq!(config.exit_policy, ExitPolicy::Tolerant);
        assert_eq!(config.editor_timeout, None);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            bind: Some("127.0.0.1:7000".to_string()),
            command: Some("vim".to_string()),
            editor_timeout_secs: Some(10),
            ..FileConfig::default()
        };
        let config = build_server_config(
            &cli(&["-c", "code --wait", "--editor-timeout-secs", "60"]),
            file,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.editor.to_string(), "code --wait");
        assert_eq!(config.editor_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_allow_any_origin_flag() {
        let file = FileConfig {
            require_origin: Some(true),
            ..FileConfig::default()
        };
        let config = build_server_config(&cli(&["--allow-any-origin"]), file).unwrap();
        assert!(!config.origin.require_origin);
    }

    #[test]
    fn test_file_disables_origin() {
        let file = FileConfig {
            require_origin: Some(false),
            exit_policy: Some(ExitPolicy::Strict),
            ..FileConfig::default()
        };
        let config = build_server_config(&cli(&[]), file).unwrap();
        assert!(!config.origin.require_origin);
        assert_eq!(config.exit_policy, ExitPolicy::Strict);
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = build_server_config(&cli(&["-c", "   "]), FileConfig::default());
        assert_eq!(result.unwrap_err(), ConfigError::EmptyEditorCommand);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = build_server_config(
            &cli(&["--max-concurrent-edits", "0"]),
            FileConfig::default(),
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(
            parse_bind_address(":8888").unwrap(),
            "0.0.0.0:8888".parse().unwrap()
        );
        assert_eq!(
            parse_bind_address("127.0.0.1:9000").unwrap(),
            "127.0.0.1:9000".parse().unwrap()
        );
        assert!(parse_bind_address("localhost:9000").is_ok());
        assert!(parse_bind_address("127.0.0.1").is_err());
        assert!(parse_bind_address(":99999").is_err());
    }

    #[test]
    fn test_load_file_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bind": ":9000", "command": "emacsclient -c", "exit_policy": "strict"}}"#
        )
        .unwrap();

        let config = load_file_config(file.path()).unwrap();
        assert_eq!(config.bind.as_deref(), Some(":9000"));
        assert_eq!(config.command.as_deref(), Some("emacsclient -c"));
        assert_eq!(config.exit_policy, Some(ExitPolicy::Strict));
    }

    #[test]
    fn test_load_file_config_rejects_unknown_keys() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"editor": "vim"}}"#).unwrap();
        assert!(load_file_config(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file_config(Path::new("/definitely/not/here.json")).is_err());
    }
}
