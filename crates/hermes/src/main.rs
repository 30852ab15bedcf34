//! Hermes relay - entry point.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use hermes::{ConfigLoader, HermesConfig};
use hermes_config::DEFAULT_ENV_PREFIX;
use hermes_server::ShutdownSignal;

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("hermes {}", hermes::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Hermes - WebSocket publish/subscribe relay

USAGE:
    hermes [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    Any setting can be overridden as HERMES__<SECTION>__<KEY>, e.g.
    HERMES__SERVER__LISTEN_ADDR        Listen address (default: 0.0.0.0:9900)
    HERMES__SERVER__PATH               Mount path (default: /)
    HERMES__SERVER__MAX_CONNECTIONS    Session limit (default: none)
    HERMES__BROKER__OUTBOUND_FORMAT    structured or legacy (default: structured)
    HERMES__BROKER__VERBOSE            Log every relay at info level
    HERMES__TELEMETRY__LOGGING__LEVEL  Log filter (default: info)
    HERMES__TELEMETRY__METRICS__ENABLED Prometheus exporter on 0.0.0.0:9091

    A .env file in the working directory is read first.

EXAMPLES:
    hermes --config /etc/hermes/hermes.toml
    HERMES__SERVER__LISTEN_ADDR=127.0.0.1:9000 hermes
"
    );
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HermesConfig> {
    let mut loader = ConfigLoader::new().with_dotenv();
    if let Some(path) = path {
        loader = loader
            .with_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    }

    loader
        .with_env_prefix(DEFAULT_ENV_PREFIX)
        .load()
        .context("invalid configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    hermes::init_telemetry(&hermes::telemetry_config(&config))
        .context("failed to initialize telemetry")?;

    info!(
        version = hermes::VERSION,
        config_file = ?args.config,
        listen_addr = %config.server.listen_addr,
        path = %config.server.path,
        outbound_format = %config.broker.outbound_format,
        "Starting Hermes relay"
    );

    let server = hermes::build_server(&config);
    server
        .run_with_shutdown(ShutdownSignal::with_os_signals())
        .await
        .context("relay failed")?;

    Ok(())
}
