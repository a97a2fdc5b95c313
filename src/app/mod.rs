use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{
    DEFAULT_CONFIG_FILE, HostId, ServerConfig, ServerOverrides, TransportOverrides,
};
use crate::journal::JournalCatalog;
use crate::lql::{Expression, compile_tags_expr};

#[derive(Parser)]
#[command(name = "logrange", author, version, about = "Log Aggregation Service", long_about = None)]
pub struct Cli {
    /// The logrange configuration file (YAML or JSON)
    #[arg(long, global = true, env = "LOGRANGE_CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Number of threads (default: all cores)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective server configuration as JSON
    Config(ServerArgs),
    /// List the journals whose tags match a tags expression
    Select(SelectArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServerArgs {
    /// Unique host identifier, if 0 the id will be automatically assigned
    #[arg(long)]
    pub host_id: Option<HostId>,

    /// Lease TTL in seconds. Used in cluster config
    #[arg(long)]
    pub host_lease_ttl: Option<u32>,

    /// Host registration timeout in seconds. 0 means forever
    #[arg(long)]
    pub host_registration_timeout: Option<u32>,

    /// Path to the journals database directory
    #[arg(long)]
    pub journals_dir: Option<PathBuf>,

    /// Public RPC API address. Public clients will use the address to reach the server
    #[arg(long)]
    pub pb_api_rpc_listen_on: Option<String>,

    /// Whether TLS is enabled for the public RPC API
    #[arg(long)]
    pub pb_api_rpc_tls_enabled: Option<bool>,

    /// Whether 2-way TLS is enabled for the public RPC API
    #[arg(long = "pb-api-rpc-tls-2w")]
    pub pb_api_rpc_tls_2way: Option<bool>,

    /// Public RPC API TLS CA file
    #[arg(long)]
    pub pb_api_rpc_tls_ca: Option<PathBuf>,

    /// Public RPC API TLS key file
    #[arg(long)]
    pub pb_api_rpc_tls_key: Option<PathBuf>,

    /// Public RPC API TLS cert file
    #[arg(long)]
    pub pb_api_rpc_tls_cert: Option<PathBuf>,

    /// Private RPC API address. Cluster peers will use the address to connect to the server
    #[arg(long)]
    pub prvt_api_rpc_listen_on: Option<String>,

    /// Whether TLS is enabled for the private RPC API
    #[arg(long)]
    pub prvt_api_rpc_tls_enabled: Option<bool>,

    /// Whether 2-way TLS is enabled for the private RPC API
    #[arg(long = "prvt-api-rpc-tls-2w")]
    pub prvt_api_rpc_tls_2way: Option<bool>,

    /// Private RPC API TLS CA file
    #[arg(long)]
    pub prvt_api_rpc_tls_ca: Option<PathBuf>,

    /// Private RPC API TLS key file
    #[arg(long)]
    pub prvt_api_rpc_tls_key: Option<PathBuf>,

    /// Private RPC API TLS cert file
    #[arg(long)]
    pub prvt_api_rpc_tls_cert: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Journal catalog file (YAML or JSON)
    #[arg(short, long)]
    pub journals: PathBuf,

    /// Tags expression file (YAML or JSON); all journals match if omitted
    #[arg(short, long)]
    pub filter: Option<PathBuf>,
}

impl ServerArgs {
    pub fn overrides(&self) -> ServerOverrides {
        ServerOverrides {
            host_id: self.host_id,
            host_lease_ttl_sec: self.host_lease_ttl,
            host_register_timeout_sec: self.host_registration_timeout,
            journals_dir: self.journals_dir.clone(),
            public_api_rpc: TransportOverrides {
                listen_addr: self.pb_api_rpc_listen_on.clone(),
                tls_enabled: self.pb_api_rpc_tls_enabled,
                tls_2way: self.pb_api_rpc_tls_2way,
                tls_ca_file: self.pb_api_rpc_tls_ca.clone(),
                tls_key_file: self.pb_api_rpc_tls_key.clone(),
                tls_cert_file: self.pb_api_rpc_tls_cert.clone(),
            },
            private_api_rpc: TransportOverrides {
                listen_addr: self.prvt_api_rpc_listen_on.clone(),
                tls_enabled: self.prvt_api_rpc_tls_enabled,
                tls_2way: self.prvt_api_rpc_tls_2way,
                tls_ca_file: self.prvt_api_rpc_tls_ca.clone(),
                tls_key_file: self.prvt_api_rpc_tls_key.clone(),
                tls_cert_file: self.prvt_api_rpc_tls_cert.clone(),
            },
        }
    }
}

pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Commands::Config(args) => {
            let cfg = effective_config(&cli.config_file, args)?;
            serde_json::to_writer_pretty(&mut *out, &cfg)
                .context("CLI: Failed to write configuration")?;
            writeln!(out)?;
        }
        Commands::Select(args) => {
            for name in select_journals(args)? {
                writeln!(out, "{}", name)?;
            }
        }
    }
    Ok(())
}

/// Defaults, then the config file, then command line overrides.
pub fn effective_config(config_file: &Path, args: &ServerArgs) -> Result<ServerConfig> {
    let mut cfg = ServerConfig::load(config_file)?;
    cfg.apply(&args.overrides());
    cfg.validate()?;
    tracing::info!(
        "Config: host_id={}, lease_ttl={}s, journals_dir={:?}",
        cfg.host_id,
        cfg.host_lease_ttl_sec,
        cfg.journals_dir
    );
    Ok(cfg)
}

pub fn load_expression(path: &Path) -> Result<Expression> {
    let file =
        std::fs::File::open(path).with_context(|| format!("CLI: Failed to open {:?}", path))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("CLI: Failed to parse tags expression in {:?}", path))
}

pub fn select_journals(args: &SelectArgs) -> Result<Vec<String>> {
    let expr = args.filter.as_deref().map(load_expression).transpose()?;
    let predicate = compile_tags_expr(expr.as_ref()).context("CLI: Invalid tags expression")?;

    let catalog = JournalCatalog::load(&args.journals)?;
    let start = std::time::Instant::now();
    let selected: Vec<String> = catalog
        .select(&predicate)
        .into_iter()
        .map(|journal| journal.name.clone())
        .collect();

    tracing::info!(
        "Selected {} of {} journals in {:.3}ms",
        selected.len(),
        catalog.journals.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_server_flags() {
        let cli = Cli::try_parse_from([
            "logrange",
            "config",
            "--host-id",
            "4",
            "--pb-api-rpc-tls-enabled",
            "true",
            "--pb-api-rpc-tls-2w",
            "false",
            "--prvt-api-rpc-listen-on",
            "10.0.0.1:9967",
        ])
        .unwrap();

        let Commands::Config(args) = &cli.command else {
            panic!("expected config command");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.host_id, Some(4));
        assert_eq!(overrides.public_api_rpc.tls_enabled, Some(true));
        assert_eq!(overrides.public_api_rpc.tls_2way, Some(false));
        assert_eq!(
            overrides.private_api_rpc.listen_addr.as_deref(),
            Some("10.0.0.1:9967")
        );
        assert_eq!(overrides.host_lease_ttl_sec, None);
        assert_eq!(cli.config_file, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn select_requires_catalog() {
        assert!(Cli::try_parse_from(["logrange", "select"]).is_err());
    }

    #[test]
    fn effective_config_rejects_incomplete_tls() {
        let args = ServerArgs {
            pb_api_rpc_tls_enabled: Some(true),
            ..Default::default()
        };
        let err = effective_config(Path::new("/nonexistent/config.yaml"), &args).unwrap_err();
        assert!(err.to_string().contains("public RPC API"));
    }
}
