//! Configuration file loading tests

use anyhow::Result;
use pacresolver::config::{BypassPolicy, ConfigManager};
use pacresolver::{FixedClock, Resolver};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_full_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("pacresolver.toml");
    fs::write(
        &config_path,
        r#"
[script]
source = "https://wpad.corp.example/wpad.dat"
connect_timeout = "5s"
read_timeout = "10s"
fallback_ttl = "15m"

[engine]
evaluation_timeout = "750ms"
loop_iteration_limit = 50000

[predicates]
local_ip_override = "10.20.30.40"

[resolver]
bypass = "source-host"

[logging]
level = "debug"
"#,
    )?;

    let config = ConfigManager::load_from_file(&config_path)?;
    assert_eq!(
        config.script.source.as_deref(),
        Some("https://wpad.corp.example/wpad.dat")
    );
    assert_eq!(config.script.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.script.read_timeout, Duration::from_secs(10));
    assert_eq!(config.script.fallback_ttl, Some(Duration::from_secs(900)));
    assert_eq!(config.engine.evaluation_timeout, Duration::from_millis(750));
    assert_eq!(config.engine.loop_iteration_limit, 50_000);
    assert_eq!(config.engine.recursion_limit, 512);
    assert_eq!(
        config.predicates.local_ip_override,
        Some("10.20.30.40".parse::<std::net::IpAddr>()?)
    );
    assert_eq!(config.resolver.bypass, BypassPolicy::SourceHost);
    assert_eq!(config.logging.level, "debug");
    Ok(())
}

#[test]
fn test_invalid_config_file_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("pacresolver.toml");

    fs::write(&config_path, "[script]\nsource = \"ftp://example.com/proxy.pac\"\n")?;
    assert!(ConfigManager::load_from_file(&config_path).is_err());

    fs::write(&config_path, "[engine]\nevaluation_timeout = \"0s\"\n")?;
    assert!(ConfigManager::load_from_file(&config_path).is_err());

    fs::write(&config_path, "[resolver]\nbypass = \"sometimes\"\n")?;
    assert!(ConfigManager::load_from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_missing_config_file_uses_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ConfigManager::load_from_file(&temp_dir.path().join("absent.toml"))?;
    assert!(config.script.source.is_none());
    assert_eq!(config.resolver.bypass, BypassPolicy::ScriptText);
    Ok(())
}

#[tokio::test]
async fn test_config_file_drives_resolver() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let script_path = temp_dir.path().join("proxy.pac");
    fs::write(
        &script_path,
        "function FindProxyForURL(url, host) { return 'PROXY ' + myIpAddress() + ':3128'; }\n",
    )?;

    let config_path = temp_dir.path().join("pacresolver.toml");
    fs::write(
        &config_path,
        format!(
            "[script]\nsource = {:?}\n\n[predicates]\nlocal_ip_override = \"172.16.0.9\"\n",
            script_path.to_str().unwrap_or_default()
        ),
    )?;

    let config = ConfigManager::load_from_file(&config_path)?;
    let resolver = Resolver::new(&config, Arc::new(FixedClock::parse("2026-10-19T12:00:00Z")?))?;
    let selection = resolver.select_url("http://www.example.com/").await?;
    assert_eq!(selection.to_string(), "PROXY 172.16.0.9:3128");
    Ok(())
}
