use clap::{Parser, Subcommand, ValueEnum};
use mercato_store::domain::{Product, PurchaseOrder, PurchaseOrderViews};
use mercato_store::sdk::{self, ConfigOverrides, GatewayConfig};
use mercato_store::{Entity, EntityStore, LogNotifier};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the REST API. Defaults to MERCATO_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token. Defaults to MERCATO_API_TOKEN.
    #[arg(long)]
    token: Option<String>,

    /// Request timeout in seconds. Defaults to MERCATO_API_TIMEOUT_SECS, then 30.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Resource {
    Products,
    PurchaseOrders,
}

#[derive(Subcommand, Clone)]
enum Commands {
    List { resource: Resource },
    Get { resource: Resource, id: u64 },
    Delete {
        resource: Resource,
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Purchase-order totals and counts by status.
    Summary,
}

fn config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    Ok(GatewayConfig::from_env_with(ConfigOverrides {
        base_url: cli.api_url.clone(),
        token: cli.token.clone(),
        timeout: cli.timeout_secs.map(Duration::from_secs),
    })?)
}

fn check<T: Entity>(store: &EntityStore<T>) -> anyhow::Result<()> {
    match store.error() {
        Some(err) => anyhow::bail!("{} request failed: {}", T::RESOURCE, err),
        None => Ok(()),
    }
}

enum Action {
    List,
    Get(u64),
    Delete(Vec<u64>),
}

async fn run<T: Entity<Id = u64>>(config: &GatewayConfig, action: Action) -> anyhow::Result<()> {
    let store = sdk::connect::<T>(config, Arc::new(LogNotifier))?;

    match action {
        Action::List => {
            store.init().await;
            check(&store)?;
            println!("{}", serde_json::to_string_pretty(&store.items())?);
        }
        Action::Get(id) => {
            store.find_one(id).await;
            check(&store)?;
            println!("{}", serde_json::to_string_pretty(&store.get(&id))?);
        }
        Action::Delete(ids) => {
            let count = ids.len();
            store.delete_all_by_id(ids).await;
            check(&store)?;
            println!("Deleted {} {}", count, T::RESOURCE);
        }
    }
    Ok(())
}

async fn summary(config: &GatewayConfig) -> anyhow::Result<()> {
    let store = sdk::connect::<PurchaseOrder>(config, Arc::new(LogNotifier))?;
    store.init().await;
    check(&store)?;

    let views = PurchaseOrderViews::new(store);
    println!("Orders: {}", views.store().count());
    println!("Open orders: {}", views.open_orders().len());
    println!("Total amount: {:.2}", views.total_amount());
    for (status, count) in views.count_by_status() {
        println!("  {:?}: {}", status, count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = config(&cli)?;

    let (resource, action) = match cli.command {
        Commands::List { resource } => (resource, Action::List),
        Commands::Get { resource, id } => (resource, Action::Get(id)),
        Commands::Delete { resource, ids } => (resource, Action::Delete(ids)),
        Commands::Summary => return summary(&config).await,
    };

    match resource {
        Resource::Products => run::<Product>(&config, action).await,
        Resource::PurchaseOrders => run::<PurchaseOrder>(&config, action).await,
    }
}
