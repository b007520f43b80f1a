use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::exit;

use certwarn::config::Config;
use certwarn::HostExpiryChecker;

const DEFAULT_CONFIG_FILE: &str = "certwarn.toml";

/// Warns about TLS certificates that are close to expiring.
///
/// Checks each host in order, connecting on port 443 and reading the
/// certificate chain the server presents. Certificates expiring within the
/// warning window go to stdout, per-host failures go to stderr, and the
/// exit code is always 0.
#[derive(Parser)]
#[command(name = "certwarn", version, about)]
struct Cli {
    /// Hostnames to check, without scheme or port
    hosts: Vec<String>,

    /// Warn when a certificate expires within this many years
    #[arg(long, value_name = "N")]
    warn_years: Option<u32>,

    /// Warn when a certificate expires within this many months
    #[arg(long, value_name = "N")]
    warn_months: Option<u32>,

    /// Warn when a certificate expires within this many days [default: 30]
    #[arg(long, value_name = "N")]
    warn_days: Option<u32>,

    /// Connect/read timeout in seconds [default: 30]
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    init_config: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.init_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    let mut config = Config::default();

    let config_path = cli.config.clone().or_else(|| {
        Path::new(DEFAULT_CONFIG_FILE)
            .exists()
            .then(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    });
    if let Some(path) = config_path {
        match Config::from_file(&path) {
            Ok(file_config) => config = config.merge_with(file_config),
            Err(err) => {
                eprintln!("Failed to load config '{}': {}", path.display(), err);
                exit(0);
            }
        }
    }

    let cli_hosts = (!cli.hosts.is_empty()).then(|| cli.hosts.clone());
    config = config.merge_with(Config::from_cli_args(
        cli_hosts,
        cli.timeout,
        cli.warn_years,
        cli.warn_months,
        cli.warn_days,
    ));

    let hosts = config.hosts.clone().unwrap_or_default();
    if hosts.is_empty() {
        eprintln!(
            "No hosts to check. Pass hostnames as arguments or set 'hosts' in {}.",
            DEFAULT_CONFIG_FILE
        );
        exit(0);
    }

    let checker = HostExpiryChecker::new(config.warning_threshold(), config.timeout());

    // One host at a time; a failing host never stops the batch.
    for host in &hosts {
        let report = checker.check_host(host);
        for certificate in &report.certificates {
            println!("{}: {}", report.url, certificate);
        }
        if let Some(err) = &report.error {
            eprintln!("{}", err);
        }
    }

    exit(0);
}
