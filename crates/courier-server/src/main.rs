//! Courier - Entry point
//!
//! Loads configuration, installs logging and serves the command gateway.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use courier_config::{ConfigLoader, ENV_PREFIX};
use courier_router::{agents::InMemoryAgents, CommandRouter};
use courier_server::Server;
use courier_telemetry::init_logging;

/// Configuration file read when neither `--config` nor `COURIER_CONFIG` is set.
const DEFAULT_CONFIG_FILE: &str = "courier.toml";

/// Where the base configuration comes from, before environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    /// The built-in development preset. No file is read.
    Development,
    /// An explicit file from `--config` or `COURIER_CONFIG`.
    File(PathBuf),
    /// `./courier.toml` when present, else the defaults.
    DefaultFile,
}

/// Command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    source: ConfigSource,
}

/// What the command line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Run(Args),
    Help,
    Version,
}

/// Parses `args` (without the program name). `env_config` is the value of
/// `COURIER_CONFIG`, used when `--config` is absent.
fn parse_args<I>(args: I, env_config: Option<PathBuf>) -> Result<Invocation, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config = None;
    let mut development = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => return Err(format!("{arg} requires a path")),
            },
            "--dev" => development = true,
            "--help" | "-h" => return Ok(Invocation::Help),
            "--version" | "-v" => return Ok(Invocation::Version),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    let source = match (development, config) {
        (true, Some(_)) => return Err("--dev cannot be combined with --config".to_string()),
        (true, None) => ConfigSource::Development,
        (false, Some(path)) => ConfigSource::File(path),
        (false, None) => env_config.map_or(ConfigSource::DefaultFile, ConfigSource::File),
    };

    Ok(Invocation::Run(Args { source }))
}

impl Args {
    fn parse() -> Self {
        let env_config = std::env::var_os("COURIER_CONFIG").map(PathBuf::from);

        match parse_args(std::env::args().skip(1), env_config) {
            Ok(Invocation::Run(args)) => args,
            Ok(Invocation::Help) => {
                print_help();
                std::process::exit(0);
            }
            Ok(Invocation::Version) => {
                println!("courier {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Err(message) => {
                eprintln!("{message}");
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
        }
    }
}

fn print_help() {
    println!(
        r"Courier - command gateway

USAGE:
    courier [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
        --dev              Use the development preset instead of a file
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    COURIER_CONFIG                         Configuration file (same as --config)
    COURIER__SERVER__HTTP_ADDR             Listen address (default: 0.0.0.0:8052)
    COURIER__RATE_LIMIT__LIMIT             Requests per window (default: 100)
    COURIER__RATE_LIMIT__WINDOW_SECONDS    Window length (default: 60)
    COURIER__AUTH__ALLOW_ANONYMOUS         Accept requests without credentials
    COURIER__LOGGING__LEVEL                Log level (default: info)

Without --config, ./courier.toml is read when present. --dev reads no file
and cannot be combined with --config. A .env file in the working directory
is loaded before environment overrides are applied.
"
    );
}

fn load_config(args: &Args) -> anyhow::Result<courier_config::CourierConfig> {
    let loader = ConfigLoader::new().with_dotenv()?;
    let loader = match &args.source {
        ConfigSource::Development => loader.with_development(),
        ConfigSource::File(path) => loader
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        ConfigSource::DefaultFile => loader.with_optional_file(DEFAULT_CONFIG_FILE)?,
    };

    Ok(loader.with_env_prefix(ENV_PREFIX).load()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("invalid configuration")?;

    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.http_addr,
        config = ?args.source,
        "starting courier"
    );

    let router = CommandRouter::standard(Arc::new(InMemoryAgents::new()))?;
    tracing::debug!(commands = router.commands().len(), "command registry ready");

    let server = Server::from_config(&config, Arc::new(router))?;
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server error");
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], env_config: Option<&str>) -> Result<Invocation, String> {
        parse_args(
            args.iter().map(|a| (*a).to_string()),
            env_config.map(PathBuf::from),
        )
    }

    fn source(args: &[&str], env_config: Option<&str>) -> ConfigSource {
        match parse(args, env_config) {
            Ok(Invocation::Run(args)) => args.source,
            other => panic!("expected a run invocation, got {other:?}"),
        }
    }

    #[test]
    fn test_default_file_when_nothing_given() {
        assert_eq!(source(&[], None), ConfigSource::DefaultFile);
    }

    #[test]
    fn test_config_flag_beats_environment() {
        assert_eq!(
            source(&["--config", "a.toml"], Some("b.toml")),
            ConfigSource::File(PathBuf::from("a.toml"))
        );
        assert_eq!(
            source(&[], Some("b.toml")),
            ConfigSource::File(PathBuf::from("b.toml"))
        );
    }

    #[test]
    fn test_dev_skips_every_file() {
        assert_eq!(source(&["--dev"], None), ConfigSource::Development);
        assert_eq!(source(&["--dev"], Some("b.toml")), ConfigSource::Development);
    }

    #[test]
    fn test_dev_and_config_are_exclusive() {
        let err = parse(&["--dev", "-c", "a.toml"], None).unwrap_err();
        assert!(err.contains("--dev"));
    }

    #[test]
    fn test_dev_preset_survives_loading() {
        let args = Args {
            source: ConfigSource::Development,
        };
        let config = load_config(&args).unwrap();
        assert!(config.auth.allow_anonymous);
        assert!(config.error_handling.expose_internal_errors);
    }

    #[test]
    fn test_help_version_and_unknown() {
        assert_eq!(parse(&["-h"], None), Ok(Invocation::Help));
        assert_eq!(parse(&["--version"], None), Ok(Invocation::Version));
        assert!(parse(&["--config"], None).is_err());
        assert_eq!(parse(&["--bogus"], None).unwrap_err(), "Unknown argument: --bogus");
    }
}
