mod policy_commands;
mod preview_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    readgate_config::GateConfig,
    readgate_policy::{ChannelScope, Domain, DomainPolicy},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "readgate",
    about = "readgate: read-only gate for Monday.com and Slack tool calls"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to readgate.{toml,yaml,yml,json} discovery).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify operation names as allowed or denied.
    Classify {
        #[arg(long)]
        domain: Domain,
        #[arg(required = true)]
        operations: Vec<String>,
    },
    /// Inspect a GraphQL document for mutations (reads stdin without FILE).
    CheckQuery { file: Option<PathBuf> },
    /// Filter a JSON tool catalog down to read-only operations.
    FilterCatalog {
        #[arg(long)]
        domain: Domain,
        /// JSON array of tools, or an object with a `tools` array.
        file: PathBuf,
    },
    /// Check whether a Slack channel may be read.
    CheckChannel {
        channel: String,
        /// public_channel, private_channel, im or mpim.
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Run a call through the full gate against an echo transport.
    Preview {
        #[arg(long)]
        domain: Domain,
        operation: String,
        /// JSON object of arguments.
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Print the effective configuration.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Build a domain's policy from the loaded configuration.
pub(crate) fn policy_for(domain: Domain, config: &GateConfig) -> anyhow::Result<DomainPolicy> {
    let policy = match domain {
        Domain::Monday => DomainPolicy::monday(config.monday.allowed_board().map(String::from))?,
        Domain::Slack => DomainPolicy::slack(ChannelScope::new(&config.slack.allowed_channels))?,
    };
    Ok(policy)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "readgate starting");
    let config = readgate_config::load_effective(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify { domain, operations } => {
            policy_commands::classify(&policy_for(domain, &config)?, &operations)
        },
        Commands::CheckQuery { file } => policy_commands::check_query(file.as_deref()),
        Commands::FilterCatalog { domain, file } => {
            policy_commands::filter_catalog(&policy_for(domain, &config)?, &file)
        },
        Commands::CheckChannel { channel, kind } => {
            policy_commands::check_channel(&config, &channel, kind.as_deref())
        },
        Commands::Preview {
            domain,
            operation,
            arguments,
        } => preview_commands::preview(&config, domain, &operation, &arguments).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        },
    }
}
