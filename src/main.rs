/// SvcProbe - Network Service Scanner CLI
///
/// Main entry point for the command-line interface

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use svcprobe::config::{normalize_uri, ScanConfig};
use svcprobe::error::{ScanError, ScanResult};
use svcprobe::ports::parse_port_spec;
use svcprobe::{logging, output, Scanner};

#[derive(Parser)]
#[command(name = "svcprobe")]
#[command(version = svcprobe::VERSION)]
#[command(about = "Concurrent TCP/HTTP network service scanner", long_about = None)]
struct Cli {
    /// Target hostname or IPv4 address
    #[arg(value_name = "TARGET")]
    target: String,

    /// Ports to scan (e.g. "22,80,1000-1010")
    #[arg(value_name = "PORTS")]
    ports: Option<String>,

    /// Ports to scan (alternative to the positional form)
    #[arg(short = 'p', long = "port", value_name = "PORTS")]
    port: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(short = 't', long = "timeout", value_name = "MS", default_value_t = 3500)]
    timeout: u64,

    /// HTTP request URI
    #[arg(short = 'u', long = "uri", value_name = "URI", default_value = "/")]
    uri: String,

    /// Write the scan report to a file
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print per-connection status lines
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Emit the report as JSON
    #[arg(long = "json")]
    json: bool,

    /// Probe HTTP with GET on every open port
    #[arg(long = "curl")]
    curl: bool,

    /// Retry unidentified open ports over TLS
    #[arg(long = "tls")]
    tls: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        output::error_banner(&e.summary());
        eprintln!();
        eprintln!("{}", Cli::command().render_usage());
        process::exit(1);
    }
}

/// Build the scan configuration and run the scanner
async fn run(cli: Cli) -> ScanResult<()> {
    let config = build_config(cli)?;

    let mut scanner = Scanner::new(config)?;
    scanner.run().await
}

/// Translate parsed arguments into a validated scan configuration
fn build_config(cli: Cli) -> ScanResult<ScanConfig> {
    let spec = cli
        .port
        .or(cli.ports)
        .ok_or_else(|| ScanError::invalid_arg("PORTS", "No ports were specified"))?;

    let config = ScanConfig {
        target: cli.target,
        ports: parse_port_spec(&spec)?,
        connect_timeout: Duration::from_millis(cli.timeout),
        uri: normalize_uri(&cli.uri),
        curl: cli.curl,
        tls_enabled: cli.tls,
        verbose: cli.verbose,
        out_json: cli.json,
        out_path: cli.output,
        exe_path: std::env::args().next().unwrap_or_default(),
        argv: std::env::args().skip(1).collect(),
        ..Default::default()
    };

    config.validate()?;
    Ok(config)
}
