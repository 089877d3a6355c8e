//! Configuration loading from disk and the environment.
//!
//! Precedence, lowest to highest: built-in defaults, the optional TOML file,
//! a `.env` file in the working directory, then the process environment.
//! The `.env` values never overwrite variables that are already set, and the
//! process environment itself is left untouched.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ControlPlaneConfig, EabConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read {path}: {source}")]
    DotEnv {
        path: String,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Invalid value '{value}' for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Dotenv file read from the working directory.
pub const DOTENV_FILE: &str = ".env";

/// Load configuration from an optional TOML file, `./.env` and the process
/// environment, then validate it.
pub fn load_config(path: Option<&Path>) -> Result<ControlPlaneConfig, ConfigError> {
    load_config_with_dotenv(path, Path::new(DOTENV_FILE))
}

/// Like [`load_config`] with an explicit dotenv path. A missing dotenv file
/// is not an error; a malformed one is.
pub fn load_config_with_dotenv(
    path: Option<&Path>,
    dotenv: &Path,
) -> Result<ControlPlaneConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => ControlPlaneConfig::default(),
    };

    let dotenv = read_dotenv(dotenv)?;
    apply_env_overrides(&mut config, layered(|var| std::env::var(var).ok(), &dotenv))?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let dotenv_error = |source| ConfigError::DotEnv {
        path: path.display().to_string(),
        source,
    };
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(dotenv_error(e)),
    };
    entries.collect::<Result<_, _>>().map_err(dotenv_error)
}

/// Process variables first, dotenv values as fallback.
fn layered<'a, F>(process: F, dotenv: &'a HashMap<String, String>) -> impl Fn(&str) -> Option<String> + 'a
where
    F: Fn(&str) -> Option<String> + 'a,
{
    move |var| process(var).or_else(|| dotenv.get(var).cloned())
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Recognised variables: `HTTP_PORT`, `SHUTDOWN_SLEEP_SEC`, `ACME_EMAIL`,
/// `ZEROSSL_KID`, `ZEROSSL_HMAC`, `LOG_FORMAT`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut ControlPlaneConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(port) = get("HTTP_PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            var: "HTTP_PORT",
            value: port.clone(),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }

    if let Some(secs) = get("SHUTDOWN_SLEEP_SEC") {
        config.lifecycle.shutdown_sleep_secs =
            secs.trim().parse().map_err(|_| ConfigError::Env {
                var: "SHUTDOWN_SLEEP_SEC",
                value: secs.clone(),
            })?;
    }

    if let Some(email) = get("ACME_EMAIL") {
        config.acme.contact_email = email;
    }

    match (get("ZEROSSL_KID"), get("ZEROSSL_HMAC")) {
        (Some(kid), Some(hmac_key)) => config.acme.zerossl_eab = Some(EabConfig { kid, hmac_key }),
        (None, None) => {}
        (Some(kid), None) => {
            let existing = config.acme.zerossl_eab.take();
            config.acme.zerossl_eab = Some(EabConfig {
                kid,
                hmac_key: existing.map(|e| e.hmac_key).unwrap_or_default(),
            });
        }
        (None, Some(hmac_key)) => {
            let existing = config.acme.zerossl_eab.take();
            config.acme.zerossl_eab = Some(EabConfig {
                kid: existing.map(|e| e.kid).unwrap_or_default(),
                hmac_key,
            });
        }
    }

    if let Some(format) = get("LOG_FORMAT") {
        config.observability.log_format = match format.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Env {
                    var: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }

    Ok(())
}
