// # dnsdash - DNS dashboard CLI
//
// This binary is a THIN front end over dnsdash-core:
// - Address lab commands run locally, without network access
// - Zone and record commands drive a SyncEngine through the Cloudflare gateway
// - DO NOT add record, selection or bulk logic here; it lives in dnsdash-core
//
// ## Configuration
//
// Every global flag has an environment fallback.
//
// ### Credentials
// - `DNSDASH_API_TOKEN`: API token (bearer)
// - `DNSDASH_API_EMAIL` + `DNSDASH_API_KEY`: account e-mail and global key
//
// ### Gateway
// - `DNSDASH_API_BASE`: API base URL (defaults to the public Cloudflare endpoint)
// - `DNSDASH_TIMEOUT_SECS`: per-request timeout
//
// ### Behaviour
// - `DNSDASH_PER_PAGE`: page size for record listings
// - `DNSDASH_MAX_SAMPLES`: upper bound for `samples -n`
// - `DNSDASH_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// dnsdash arpa 2001:db8::1
// dnsdash subnet 192.168.10.0/24
//
// export DNSDASH_API_TOKEN=your_token
// dnsdash zones
// dnsdash records 023e105f4ecef8ad9ca31a8372d0c353 --filter www
// dnsdash proxy 023e105f4ecef8ad9ca31a8372d0c353 on 372e6795 9a7806061
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dnsdash_core::addr::AddressLab;
use dnsdash_core::records::transfer::{self, TransferFormat};
use dnsdash_core::records::{RecordQuery, RecordType, SslMode};
use dnsdash_core::traits::{Credentials, RemoteGateway};
use dnsdash_core::{BulkResult, DashConfig, GatewayConfig, LabConfig, Session, SyncConfig, SyncEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or usage error
/// - 2: Operation failed
/// - 3: Bulk operation finished with failed items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DashExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    PartialFailure = 3,
}

impl From<DashExitCode> for ExitCode {
    fn from(code: DashExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// DNS dashboard: IPv6/IPv4 address lab and Cloudflare record management
#[derive(Parser, Debug)]
#[command(name = "dnsdash", version, about, long_about = None)]
struct Cli {
    /// API token (bearer authentication)
    #[arg(long, env = "DNSDASH_API_TOKEN", hide_env_values = true, global = true)]
    api_token: Option<String>,

    /// Account e-mail (global key authentication)
    #[arg(long, env = "DNSDASH_API_EMAIL", global = true)]
    api_email: Option<String>,

    /// Global API key (global key authentication)
    #[arg(long, env = "DNSDASH_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, env = "DNSDASH_API_BASE", global = true)]
    api_base: Option<String>,

    /// Per-request timeout (in seconds)
    #[arg(long, env = "DNSDASH_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Page size for record listings
    #[arg(long, env = "DNSDASH_PER_PAGE", default_value_t = 100, global = true)]
    per_page: u32,

    /// Upper bound for generated samples
    #[arg(long, env = "DNSDASH_MAX_SAMPLES", default_value_t = 256, global = true)]
    max_samples: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DNSDASH_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand an IPv6 address and derive its ip6.arpa name
    Arpa { address: String },

    /// Random addresses inside an IPv6 prefix, with their ip6.arpa names
    Samples {
        /// Prefix in address/length form
        prefix: String,

        /// Number of samples
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Network, broadcast and host range of an IPv4 CIDR block
    Subnet { cidr: String },

    /// List zones
    Zones,

    /// List accounts
    Accounts,

    /// List the records of a zone
    Records {
        zone: String,

        /// Case-insensitive substring over name, content and type
        #[arg(long)]
        filter: Option<String>,

        /// Only records of this type
        #[arg(long = "type")]
        record_type: Option<RecordType>,
    },

    /// Export the records of a zone
    Export {
        zone: String,

        #[arg(long, default_value = "csv")]
        format: TransferFormat,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Create records from a CSV or JSON file
    Import {
        zone: String,

        file: PathBuf,

        /// Defaults to the file extension
        #[arg(long)]
        format: Option<TransferFormat>,
    },

    /// Delete records
    Delete {
        zone: String,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Turn proxying on or off
    Proxy {
        zone: String,

        state: Toggle,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show or change the SSL/TLS mode of a zone
    Ssl {
        zone: String,

        /// off, flexible, full or strict
        mode: Option<SslMode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Command {
    fn is_local(&self) -> bool {
        matches!(
            self,
            Command::Arpa { .. } | Command::Samples { .. } | Command::Subnet { .. }
        )
    }
}

impl Cli {
    fn dash_config(&self) -> DashConfig {
        DashConfig {
            gateway: GatewayConfig::Cloudflare {
                base_url: self.api_base.clone(),
                timeout_secs: self.timeout_secs,
            },
            lab: LabConfig {
                max_samples: self.max_samples,
            },
            sync: SyncConfig {
                per_page: self.per_page,
                ..SyncConfig::default()
            },
        }
    }

    /// Token wins over the e-mail/key pair
    fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = self.api_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Credentials::token(token));
        }
        match (self.api_email.as_deref(), self.api_key.as_deref()) {
            (Some(email), Some(key)) if !email.is_empty() && !key.is_empty() => {
                Ok(Credentials::new(email, key))
            }
            _ => anyhow::bail!(
                "Credentials are required. \
                Set DNSDASH_API_TOKEN, or DNSDASH_API_EMAIL and DNSDASH_API_KEY"
            ),
        }
    }
}

fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(log_level) = parse_level(&cli.log_level) else {
        eprintln!(
            "DNSDASH_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            cli.log_level
        );
        return DashExitCode::ConfigError.into();
    };

    // Logs go to stderr; stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DashExitCode::ConfigError.into();
    }

    let config = cli.dash_config();
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DashExitCode::ConfigError.into();
    }

    if cli.command.is_local() {
        let lab = AddressLab::new(&config.lab);
        return match run_local(&lab, &cli.command) {
            Ok(()) => DashExitCode::Success.into(),
            Err(e) => {
                eprintln!("Error: {}", e);
                DashExitCode::RuntimeError.into()
            }
        };
    }

    let credentials = match cli.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DashExitCode::ConfigError.into();
        }
    };

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DashExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_remote(config, credentials, cli.command).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                DashExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Address lab commands
fn run_local(lab: &AddressLab, command: &Command) -> Result<()> {
    match command {
        Command::Arpa { address } => {
            let analysis = lab.analyze(address)?;
            println!("address:  {}", analysis.input);
            println!("expanded: {}", analysis.expanded);
            println!("arpa:     {}", analysis.arpa);
        }
        Command::Samples { prefix, count } => {
            for sample in lab.generate_samples_from_text(prefix, *count)? {
                println!("{:<39}  {}", sample.address, sample.arpa);
            }
        }
        Command::Subnet { cidr } => {
            let report = lab.subnet(cidr)?;
            println!("address:      {}/{}", report.address, report.prefix);
            println!("netmask:      {}", report.mask);
            println!("network:      {}", report.network);
            println!("broadcast:    {}", report.broadcast);
            println!("host range:   {}", report.host_range());
            println!("usable hosts: {}", report.usable_hosts);
        }
        _ => {}
    }
    Ok(())
}

fn create_gateway(config: &GatewayConfig) -> Result<Box<dyn RemoteGateway>> {
    #[cfg(feature = "cloudflare")]
    {
        use dnsdash_core::RemoteGatewayFactory;
        Ok(dnsdash_gateway_cloudflare::CloudflareFactory.create(config)?)
    }

    #[cfg(not(feature = "cloudflare"))]
    {
        anyhow::bail!(
            "dnsdash was built without a '{}' gateway",
            config.type_name()
        )
    }
}

/// Zone and record commands
async fn run_remote(
    config: DashConfig,
    credentials: Credentials,
    command: Command,
) -> Result<DashExitCode> {
    let gateway = create_gateway(&config.gateway)?;
    info!("Using {} gateway", gateway.gateway_name());

    let (engine, mut events) = SyncEngine::new(gateway, &config.sync)?;
    let trail = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(at = %event.at.to_rfc3339(), "{:?}", event.kind);
        }
    });

    let mut session = Session::new(credentials)?;
    let code = dispatch(&engine, &mut session, command).await;

    // Closing the channel lets the log trail drain and finish
    drop(engine);
    if let Err(e) = trail.await {
        debug!("Log trail task ended abnormally: {}", e);
    }
    code
}

async fn dispatch(
    engine: &SyncEngine,
    session: &mut Session,
    command: Command,
) -> Result<DashExitCode> {
    match command {
        Command::Zones => {
            for zone in engine.list_zones(session).await? {
                println!("{}  {:<32}  {}", zone.id, zone.name, zone.status);
            }
        }
        Command::Accounts => {
            for account in engine.list_accounts(session).await? {
                println!("{}  {}", account.id, account.name);
            }
        }
        Command::Records {
            zone,
            filter,
            record_type,
        } => {
            engine.list_records(session, &zone).await?;
            let query = RecordQuery {
                text: filter,
                record_type,
                case_insensitive: true,
            };
            for record in session.store().filter(&query) {
                println!(
                    "{}  {:<6} {:<32} {:<40} proxied={} ttl={}",
                    record.id,
                    record.record_type(),
                    record.name,
                    record.content(),
                    record.proxied,
                    if record.ttl == 1 {
                        "auto".to_string()
                    } else {
                        record.ttl.to_string()
                    }
                );
            }
        }
        Command::Export {
            zone,
            format,
            output,
        } => {
            engine.list_records(session, &zone).await?;
            let text = transfer::export(format, session.store().records())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("Exported {} record(s) to {}", session.store().len(), path.display());
                }
                None => print!("{}", text),
            }
        }
        Command::Import { zone, file, format } => {
            let format = match format.or_else(|| TransferFormat::from_path(&file)) {
                Some(format) => format,
                None => anyhow::bail!(
                    "cannot infer format from '{}'; pass --format csv|json",
                    file.display()
                ),
            };
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let records = transfer::import(format, &text)?;
            let result = engine.bulk_create(session, &zone, &records).await?;
            return Ok(report_bulk("import", &result));
        }
        Command::Delete { zone, ids } => {
            let result = engine.bulk_delete(session, &zone, &ids).await?;
            return Ok(report_bulk("delete", &result));
        }
        Command::Proxy { zone, state, ids } => {
            // Proxyability is decided from the current snapshot
            engine.list_records(session, &zone).await?;
            let result = engine
                .bulk_set_proxied(session, &zone, &ids, state == Toggle::On)
                .await?;
            return Ok(report_bulk("proxy", &result));
        }
        Command::Ssl { zone, mode } => {
            let mode = match mode {
                Some(mode) => engine.set_ssl_mode(session, &zone, mode).await?,
                None => engine.ssl_mode(session, &zone).await?,
            };
            println!("{}", mode);
        }
        Command::Arpa { .. } | Command::Samples { .. } | Command::Subnet { .. } => {}
    }
    Ok(DashExitCode::Success)
}

/// Print the aggregate of a bulk operation
fn report_bulk(action: &str, result: &BulkResult) -> DashExitCode {
    println!(
        "{}: {} attempted, {} succeeded, {} failed",
        action,
        result.attempted,
        result.succeeded,
        result.failed()
    );
    for failure in &result.failures {
        println!("  {}: {}", failure.id, failure.reason);
    }
    if let Some(reason) = &result.refresh_error {
        eprintln!("warning: records could not be refreshed: {}", reason);
    }

    if result.is_success() {
        DashExitCode::Success
    } else {
        DashExitCode::PartialFailure
    }
}
