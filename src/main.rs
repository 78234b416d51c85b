//! pacresolver - PAC (proxy auto-config) resolver
//!
//! Evaluates a PAC script for one or more URLs and prints the proxies the
//! script selects, in the order a client should try them.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use pacresolver::{
    config::ConfigManager, source::ScriptWatcher, Clock, Config, FixedClock, PacError, Resolver,
    Selection, SystemClock,
};

/// CLI arguments for pacresolver
#[derive(Parser, Debug)]
#[command(name = "pacresolver")]
#[command(about = "Resolve proxies for URLs with a PAC script")]
#[command(version)]
#[command(long_about = "
pacresolver - PAC (proxy auto-config) resolver

Runs a PAC script's FindProxyForURL(url, host) for each URL and prints the
proxy candidates it returns, one URL per line.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  PACRESOLVER_SCRIPT             - Script path, file:// or http(s):// URL
  PACRESOLVER_LOCAL_IP           - Address reported by myIpAddress()
  PACRESOLVER_EVALUATION_TIMEOUT - Evaluation timeout (e.g., 10s, 500ms)
  PACRESOLVER_LOG_LEVEL          - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "pacresolver.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// PAC script location (overrides config file)
    #[arg(short, long, help = "PAC script path, file:// or http(s):// URL")]
    pub script: Option<String>,

    /// Address reported by myIpAddress() (overrides config file)
    #[arg(long, help = "Address reported by myIpAddress()")]
    pub local_ip: Option<IpAddr>,

    /// Evaluation timeout in seconds
    #[arg(long, help = "Evaluation timeout in seconds")]
    pub timeout: Option<u64>,

    /// Evaluate as if it were this instant (RFC 3339)
    #[arg(long, help = "Fixed evaluation time, e.g. 2026-10-19T09:30:00+02:00")]
    pub now: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Print selections as JSON
    #[arg(long, help = "Print one JSON object per URL")]
    pub json: bool,

    /// Print Prometheus metrics after resolving
    #[arg(long, help = "Print resolver metrics before exiting")]
    pub metrics: bool,

    /// Read URLs from standard input, one per line
    #[arg(long, help = "Read URLs from standard input")]
    pub stdin: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,

    /// URLs to resolve
    pub urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize tracing
    let log_filter = init_tracing(&args)?;

    // Load configuration with priority: CLI args > config file > environment > defaults
    let config_from_file = args.config.exists();
    let mut config = if config_from_file {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    // Apply CLI argument overrides (highest priority)
    config.merge_with_cli_args(args.script.as_deref(), args.local_ip, args.timeout);
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    // Final validation after all overrides
    config
        .validate()
        .context("Final configuration validation failed")?;

    apply_configured_level(&args, &config, &log_filter)?;

    if config_from_file {
        info!("Configuration loaded from {}", args.config.display());
    } else {
        info!("Config file not found, using environment variables");
    }

    if args.validate_config {
        print_config_summary(&config);
        return Ok(());
    }

    if args.urls.is_empty() && !args.stdin {
        bail!("no URLs given; pass URLs as arguments or use --stdin");
    }

    let clock: Arc<dyn Clock> = match &args.now {
        Some(now) => Arc::new(
            FixedClock::parse(now).with_context(|| format!("Invalid --now timestamp: {}", now))?,
        ),
        None => Arc::new(SystemClock),
    };

    let resolver = Resolver::new(&config, clock).context("Failed to set up PAC resolver")?;

    let mut failures = 0usize;
    for url in &args.urls {
        if !resolve_and_print(&resolver, url, args.json).await {
            failures += 1;
        }
    }

    if args.stdin {
        // Keep the cached script in step with edits while serving a stream of lookups.
        let _watcher = if config.script.watch && resolver.source().location().file_path().is_some() {
            match ScriptWatcher::new(resolver.source().clone()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    warn!("Script watching disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let url = line.trim();
            if url.is_empty() || url.starts_with('#') {
                continue;
            }
            if !resolve_and_print(&resolver, url, args.json).await {
                failures += 1;
            }
        }
    }

    if args.metrics {
        print!("{}", resolver.metrics().export_prometheus());
    }

    let stats = resolver.metrics().stats();
    info!(
        resolutions = stats.resolutions,
        no_decisions = stats.no_decisions,
        fetch_failures = stats.fetch_failures,
        "Done"
    );

    if failures > 0 {
        bail!("{} of {} lookups failed", failures, stats.resolutions.max(failures as u64));
    }
    Ok(())
}

/// Resolve one URL and print the outcome; false when the lookup failed
async fn resolve_and_print(resolver: &Resolver, url: &str, json: bool) -> bool {
    match resolver.select_url(url).await {
        Ok(selection) => {
            print_selection(url, &selection, json);
            true
        }
        Err(e) => {
            error!(url = %url, "{}", e);
            if json {
                let output = serde_json::json!({ "url": url, "error": error_kind(&e), "message": e.to_string() });
                println!("{}", output);
            }
            false
        }
    }
}

fn print_selection(url: &str, selection: &Selection, json: bool) {
    if json {
        let output = serde_json::json!({ "url": url, "result": selection });
        println!("{}", output);
    } else {
        println!("{}\t{}", url, selection);
    }
}

fn error_kind(error: &PacError) -> &'static str {
    match error {
        PacError::Fetch { .. } => "fetch",
        PacError::Parse { .. } => "parse",
        PacError::Evaluation(_) => "evaluation",
        PacError::Validation(_) => "validation",
        PacError::Config(_) => "config",
    }
}

fn print_config_summary(config: &Config) {
    info!("✅ Configuration is valid");
    info!("Configuration summary:");
    info!(
        "  Script source: {}",
        config.script.source.as_deref().unwrap_or("<none>")
    );
    info!(
        "  Fetch timeouts: connect {:?}, read {:?}",
        config.script.connect_timeout, config.script.read_timeout
    );
    info!("  Fallback TTL: {:?}", config.script.fallback_ttl);
    info!(
        "  Watch script: {}",
        if config.script.watch {
            "enabled"
        } else {
            "disabled"
        }
    );
    info!(
        "  Evaluation timeout: {:?}",
        config.engine.evaluation_timeout
    );
    info!("  Bypass policy: {:?}", config.resolver.bypass);
    if let Some(ip) = config.predicates.local_ip_override {
        info!("  Local IP override: {}", ip);
    }
}

/// Initialize tracing/logging
type LogFilter = reload::Handle<EnvFilter, Registry>;

/// Level chosen on the command line, if any
fn cli_log_level(args: &CliArgs) -> Option<&str> {
    if args.verbose {
        Some("debug")
    } else {
        args.log_level.as_deref()
    }
}

fn init_tracing(args: &CliArgs) -> Result<LogFilter> {
    let (subscriber, handle) = build_subscriber(args, std::io::stderr);
    subscriber.init();
    Ok(handle)
}

fn build_subscriber<W>(args: &CliArgs, writer: W) -> (impl tracing::Subscriber + Send + Sync + 'static, LogFilter)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli_log_level(args).unwrap_or("info")));
    let (filter, handle) = reload::Layer::new(env_filter);

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true),
    );

    (subscriber, handle)
}

/// Switch to the configured level once the configuration is known.
///
/// `RUST_LOG` and command-line levels keep precedence.
fn apply_configured_level(args: &CliArgs, config: &Config, log_filter: &LogFilter) -> Result<()> {
    if cli_log_level(args).is_some() || std::env::var_os("RUST_LOG").is_some() {
        return Ok(());
    }
    log_filter
        .reload(EnvFilter::new(&config.logging.level))
        .context("Failed to apply configured log level")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_loading_is_logged() {
        let args = CliArgs::parse_from(["pacresolver", "--log-level", "info"]);
        let captured = Captured::default();
        let writer = captured.clone();
        let (subscriber, _handle) = build_subscriber(&args, move || writer.clone());

        let dir = tempfile::TempDir::new().unwrap();
        tracing::subscriber::with_default(subscriber, || {
            ConfigManager::load_from_file(&dir.path().join("absent.toml")).unwrap();
        });

        assert!(captured.text().contains("Configuration file not found"));
    }

    #[test]
    fn test_command_line_level_wins_over_config() {
        let mut config = Config::default();
        config.logging.level = "error".to_string();

        let verbose = CliArgs::parse_from(["pacresolver", "-v", "http://x/"]);
        assert_eq!(cli_log_level(&verbose), Some("debug"));

        let explicit = CliArgs::parse_from(["pacresolver", "--log-level", "warn"]);
        assert_eq!(cli_log_level(&explicit), Some("warn"));
        let (_subscriber, handle) = build_subscriber(&explicit, std::io::sink);
        apply_configured_level(&explicit, &config, &handle).unwrap();

        let plain = CliArgs::parse_from(["pacresolver"]);
        assert_eq!(cli_log_level(&plain), None);
    }
}
