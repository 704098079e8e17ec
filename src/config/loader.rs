//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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

/// Load and validate configuration from a TOML file, then apply env overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    finalize(config, |key| std::env::var(key).ok())
}

/// Build configuration from defaults plus environment overrides only.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    finalize(GatewayConfig::default(), |key| std::env::var(key).ok())
}

fn finalize<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay deployment environment variables onto a loaded config.
///
/// Empty values are ignored so an exported-but-blank variable does not
/// clobber the file.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get("GATEWAY_PORT") {
        config.listener.bind_address = format!("0.0.0.0:{}", port.trim());
    }
    if let Some(url) = get("AUTH_SERVICE_URL") {
        config.upstreams.auth_url = url;
    }
    if let Some(url) = get("PROFILE_SERVICE_URL") {
        config.upstreams.profile_url = url;
    }
    if let Some(url) = get("ORCHESTRATOR_URL") {
        config.upstreams.orchestrator_url = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("GATEWAY_PORT", "9000"),
                ("AUTH_SERVICE_URL", "http://10.0.0.1:3500"),
                ("PROFILE_SERVICE_URL", ""),
            ]),
        );

        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.upstreams.auth_url, "http://10.0.0.1:3500");
        assert_eq!(config.upstreams.profile_url, "http://profiles:3600");
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let result = finalize(
            GatewayConfig::default(),
            env(&[("ORCHESTRATOR_URL", "orchestrator:8080")]),
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [upstreams]
            auth_url = "http://127.0.0.1:3500"
            timeout_secs = 3
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.upstreams.timeout_secs, 3);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstreams\nauth_url = ").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
