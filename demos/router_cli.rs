//! Router CLI - run one API operation against a device.
//!
//! This example demonstrates:
//! - Loading a session config from a JSON file or `ROUTEROS_*` variables
//! - Running operations through the one-shot [`Router`] facade
//! - Reporting failures with their remediation hint
//!
//! # Usage
//!
//! ```bash
//! ROUTEROS_HOST=192.168.88.1 ROUTEROS_PASSWORD=secret \
//!     cargo run --example router_cli -- interfaces
//!
//! cargo run --example router_cli -- --config router.json \
//!     vlan --name vlan100 --id 100 --parent ether2
//!
//! cargo run --example router_cli -- --config router.json seed users.json
//! ```

use clap::{Parser, Subcommand};
use routeros_client::seed::{JsonFileSource, SeedColumns};
use routeros_client::{AttributeMap, OpResult, Router, SessionConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RouterOS API command-line client
#[derive(Parser, Debug)]
#[command(name = "router-cli")]
#[command(about = "Run RouterOS API operations")]
#[command(version)]
struct Args {
    /// JSON config file (defaults to ROUTEROS_* environment variables)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List interfaces
    Interfaces,
    /// List PPP profiles
    Profiles,
    /// List PPP secrets
    Secrets,
    /// List IP pools
    Pools,
    /// Create a PPP secret
    AddSecret {
        name: String,
        password: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Create an IP pool
    AddPool { name: String, ranges: String },
    /// Create a VLAN interface
    Vlan {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: u16,
        #[arg(long)]
        parent: String,
    },
    /// Create a PPPoE server
    Pppoe {
        #[arg(long)]
        service: String,
        #[arg(long)]
        interface: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Enable a PPP secret by name
    Enable { name: String },
    /// Disable a PPP secret by name
    Disable { name: String },
    /// Remove a PPP secret by name
    Remove { name: String },
    /// Create PPP secrets from a JSON array of records
    Seed { file: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::from_env()?,
    };
    tracing::info!(host = %config.host, port = config.port, "using device");

    let router = Router::new(config);
    if let Err(e) = run(&router, args.command).await {
        tracing::error!(kind = %e.kind, hint = %e.hint, "{}", e.message);
        println!("{}", serde_json::to_string_pretty(&e)?);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(router: &Router, command: Command) -> OpResult<()> {
    match command {
        Command::Interfaces => print_rows(&router.list_interfaces().await?),
        Command::Profiles => print_rows(&router.list_ppp_profiles().await?),
        Command::Secrets => print_rows(&router.list_ppp_secrets().await?),
        Command::Pools => print_rows(&router.list_ip_pools().await?),
        Command::AddSecret {
            name,
            password,
            profile,
        } => {
            let mut extra = AttributeMap::new();
            if let Some(profile) = profile {
                extra.insert("profile".to_string(), profile);
            }
            let response = router.create_ppp_secret(&name, &password, &extra).await?;
            tracing::info!(id = ?response.done_ret(), "secret created");
        }
        Command::AddPool { name, ranges } => {
            let response = router
                .create_ip_pool(&name, &ranges, &AttributeMap::new())
                .await?;
            tracing::info!(id = ?response.done_ret(), "pool created");
        }
        Command::Vlan { name, id, parent } => {
            let response = router.create_vlan_interface(&name, id, &parent).await?;
            tracing::info!(id = ?response.done_ret(), "vlan created");
        }
        Command::Pppoe {
            service,
            interface,
            profile,
        } => {
            let response = router
                .create_pppoe_server(&service, &interface, profile.as_deref())
                .await?;
            tracing::info!(id = ?response.done_ret(), "pppoe server created");
        }
        Command::Enable { name } => {
            router.enable_ppp_secret(&name).await?;
            tracing::info!(%name, "secret enabled");
        }
        Command::Disable { name } => {
            router.disable_ppp_secret(&name).await?;
            tracing::info!(%name, "secret disabled");
        }
        Command::Remove { name } => {
            router.remove_ppp_secret(&name).await?;
            tracing::info!(%name, "secret removed");
        }
        Command::Seed { file } => {
            let summary = router
                .seed_ppp_secrets(&JsonFileSource::new(file), &SeedColumns::default())
                .await?;
            tracing::info!(
                created = summary.created,
                failed = summary.failed.len(),
                "seeding finished"
            );
            for (label, e) in &summary.failed {
                tracing::warn!(%label, "{e}");
            }
        }
    }
    Ok(())
}

fn print_rows(rows: &[AttributeMap]) {
    for row in rows {
        match serde_json::to_string(row) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "could not format row"),
        }
    }
}
