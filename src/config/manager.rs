//! Configuration Manager

use super::Config;
use crate::source::ScriptLocation;
use crate::Result;
use anyhow::{bail, Context};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(source) = std::env::var("PACRESOLVER_SCRIPT") {
            config.script.source = Some(source);
        }

        if let Ok(local_ip) = std::env::var("PACRESOLVER_LOCAL_IP") {
            config.predicates.local_ip_override = Some(
                local_ip
                    .trim()
                    .parse::<IpAddr>()
                    .with_context(|| format!("Invalid PACRESOLVER_LOCAL_IP: {}", local_ip))?,
            );
        }

        if let Ok(timeout) = std::env::var("PACRESOLVER_EVALUATION_TIMEOUT") {
            config.engine.evaluation_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid PACRESOLVER_EVALUATION_TIMEOUT: {}", timeout))?;
        }

        if let Ok(log_level) = std::env::var("PACRESOLVER_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_script_config()
            .with_context(|| "Script configuration validation failed")?;

        self.validate_engine_config()
            .with_context(|| "Engine configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_script_config(&self) -> Result<()> {
        if let Some(source) = &self.script.source {
            if source.trim().is_empty() {
                bail!("script.source must not be empty");
            }
            ScriptLocation::parse(source)?;
        }

        validate_timeout("script.connect_timeout", self.script.connect_timeout)?;
        validate_timeout("script.read_timeout", self.script.read_timeout)?;

        if let Some(ttl) = self.script.fallback_ttl {
            if ttl.is_zero() {
                bail!("script.fallback_ttl must be greater than 0 when set");
            }
        }

        Ok(())
    }

    fn validate_engine_config(&self) -> Result<()> {
        validate_timeout("engine.evaluation_timeout", self.engine.evaluation_timeout)?;

        if self.engine.loop_iteration_limit == 0 {
            bail!("engine.loop_iteration_limit must be greater than 0");
        }

        if self.engine.recursion_limit == 0 {
            bail!("engine.recursion_limit must be greater than 0");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "logging.level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        script: Option<&str>,
        local_ip: Option<IpAddr>,
        evaluation_timeout: Option<u64>,
    ) {
        if let Some(script) = script {
            self.script.source = Some(script.to_string());
            tracing::info!("CLI override: script source set to {}", script);
        }

        if let Some(ip) = local_ip {
            self.predicates.local_ip_override = Some(ip);
            tracing::info!("CLI override: local IP forced to {}", ip);
        }

        if let Some(timeout_secs) = evaluation_timeout {
            self.engine.evaluation_timeout = Duration::from_secs(timeout_secs);
            tracing::info!(
                "CLI override: evaluation timeout set to {}s",
                timeout_secs
            );
        }
    }
}

fn validate_timeout(name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        bail!("{} must be greater than 0", name);
    }

    if value > MAX_TIMEOUT {
        bail!("{} cannot exceed 5 minutes", name);
    }

    Ok(())
}
