#![forbid(unsafe_code)]

//! Runtime configuration for the player server.
//!
//! Values come from three places with fixed precedence: explicit overrides
//! (CLI flags), then process environment variables, then a `.env` file next
//! to the binary. Everything has a default except the API credential, whose
//! absence is itself a recognized state.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Sentinel shipped in example configs; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_YOUTUBE_API_KEY";

/// The three recognized states of the metadata-provider credential.
///
/// `Absent` and `Placeholder` both put the resolver into fallback mode; they
/// are kept distinct so startup logging can tell an operator which one they
/// are in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCredential {
    Absent,
    Placeholder,
    Key(String),
}

impl ApiCredential {
    /// Classifies a raw configured value. Blank strings count as absent.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Absent,
            Some(PLACEHOLDER_API_KEY) => Self::Placeholder,
            Some(key) => Self::Key(key.to_string()),
        }
    }

    /// Returns the key when one is actually usable for remote lookups.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Absent | Self::Placeholder => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub port: u16,
    pub host: String,
    pub credential: ApiCredential,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_config(overrides: RuntimeOverrides) -> Result<RuntimeConfig> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_runtime_config(&file_vars, env_var_string, overrides)
}

fn build_runtime_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeConfig> {
    let port = overrides
        .port
        .or_else(|| {
            lookup_value("TUBEFRAME_PORT", file_vars, &env_lookup)
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(DEFAULT_PORT);
    let host = overrides
        .host
        .and_then(non_blank)
        .or_else(|| lookup_value("TUBEFRAME_HOST", file_vars, &env_lookup))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let raw_key = overrides
        .api_key
        .or_else(|| lookup_value("YOUTUBE_API_KEY", file_vars, &env_lookup));
    let credential = ApiCredential::from_raw(raw_key.as_deref());

    Ok(RuntimeConfig {
        port,
        host,
        credential,
    })
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned())
}

/// Parses a `.env` file: `KEY=value` lines, optional `export ` prefix, single
/// or double quotes stripped, `#` comments skipped. A missing file is an
/// empty configuration, not an error.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
