//! Command line host for a single SLO resource
//!
//! Reads the desired configuration from a JSON file and keeps the resource
//! state (id plus the server's last known document) in a second JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use slo_reconciler::{
    ClientConfig, HttpGateway, MemoryGateway, ReadOutcome, ResourceData, ResourceState,
    SloGateway, SloKind, SloResource, codec,
    plan::{Plan, plan},
};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(name = "slo")]
#[command(about = "Reconcile an SLO definition with the remote service", long_about = None)]
struct Args {
    /// Client configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Run against an in-memory server seeded from the state file and print
    /// the calls that would be made. Nothing is written.
    #[arg(long, global = true)]
    dry_run: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create the SLO, or update it when it differs from the configuration
    Apply {
        /// Resource configuration (JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        state: PathBuf,
    },
    /// Refresh the state file from the server
    Refresh {
        #[arg(short, long, value_name = "FILE")]
        state: PathBuf,
    },
    /// Delete the SLO and clear the state's id
    Destroy {
        #[arg(short, long, value_name = "FILE")]
        state: PathBuf,
    },
    /// Adopt an existing SLO into a new state file
    Import {
        id: String,

        #[arg(short, long, value_name = "FILE")]
        state: PathBuf,
    },
}

impl Command {
    fn state_path(&self) -> &Path {
        match self {
            Command::Apply { state, .. }
            | Command::Refresh { state }
            | Command::Destroy { state }
            | Command::Import { state, .. } => state,
        }
    }
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![("slo_reconciler", level), ("slo", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let mut state = load_state(args.command.state_path())?;

    if args.dry_run {
        let gateway = MemoryGateway::new();
        seed(&gateway, &state).await;

        run(&SloResource::new(gateway.clone()), &args.command, &mut state).await?;

        for call in gateway.calls().await {
            println!("{call:?}");
        }
        return Ok(());
    }

    let config = ClientConfig::load(args.config.as_deref())?.with_env_overrides();
    debug!(api_url = %config.api_url, "using remote service");
    let gateway = HttpGateway::new(&config)?;

    let result = run(&SloResource::new(gateway), &args.command, &mut state).await;

    // the id may have changed even when the command failed halfway
    save_state(args.command.state_path(), &state)?;
    result
}

async fn run<G>(resource: &SloResource<G>, command: &Command, state: &mut ResourceData) -> Result<()>
where
    G: SloGateway,
{
    match command {
        Command::Apply { file, .. } => apply(resource, &load_config(file)?, state).await,
        Command::Refresh { .. } => {
            match resource.read(state).await? {
                ReadOutcome::Present(slo) => println!("{} is at version {}", slo.id, slo.version),
                ReadOutcome::Absent => println!("SLO does not exist"),
            }
            Ok(())
        }
        Command::Destroy { .. } => {
            resource.delete(&*state).await?;
            state.set_id("");
            println!("SLO destroyed");
            Ok(())
        }
        Command::Import { id, .. } => {
            if !state.id().is_empty() {
                anyhow::bail!("state already tracks SLO {}", state.id());
            }
            let slo = resource.import(state, id).await?;
            println!("imported '{}' ({})", slo.name, slo.id);
            Ok(())
        }
    }
}

async fn apply<G>(
    resource: &SloResource<G>,
    config: &Map<String, Value>,
    state: &mut ResourceData,
) -> Result<()>
where
    G: SloGateway,
{
    let observed = resource.read(state).await?;
    if observed.is_absent() {
        *state = ResourceData::new(config.clone());
    } else {
        state.merge_config(config);
    }

    match plan(&*state, observed.into_slo().as_ref())? {
        Plan::Create => {
            resource.create(state).await?;
            println!("created {}", state.id());
        }
        Plan::Update(fields) => {
            info!("changed fields: {}", fields.join(", "));
            resource.update(state).await?;
            println!("updated {}", state.id());
        }
        Plan::NoOp => println!("{} is up to date", state.id()),
    }

    Ok(())
}

/// Seed the in-memory server with the last known document so a dry run
/// sees the same world as a real one.
async fn seed(gateway: &MemoryGateway, state: &ResourceData) {
    if state.id().is_empty() {
        return;
    }

    match codec::decode(state, SloKind::SlosLibrarySlo) {
        Ok(slo) => {
            gateway.seed(slo).await;
        }
        Err(e) => warn!("state cannot be replayed, dry run starts empty: {e}"),
    }
}

fn load_config(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read resource file: {}", path.display()))?;

    match serde_json::from_str::<Value>(&content)
        .with_context(|| format!("Failed to parse resource file: {}", path.display()))?
    {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{}: expected a JSON object", path.display()),
    }
}

fn load_state(path: &Path) -> Result<ResourceData> {
    if !path.exists() {
        return Ok(ResourceData::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))
}

fn save_state(path: &Path, state: &ResourceData) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write state file: {}", path.display()))
}
