use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use launcher_core::{
    prepare_roots, CategoryOrderPolicy, Launcher, PermissionGrants, PresentationState,
    ENGINE_LOAD_FAILED,
};
use relay::{
    surface_channel, FileGrantProvider, NativeEventRelay, PersistedCounter, RelayConfig,
    RelayDispatcher,
};
use shared::domain::{FilesystemRoots, SelectionSpec};
use storage::Storage;
use tracing::{error, info, warn};

mod config;
mod console;
mod engine;

use config::{load_settings, prepare_database_url, Settings};
use console::{run_surface, ConsoleViewer};
use engine::ProcessEngine;

const SURFACE_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "vkb-launcher", about = "Browse and launch Vulkan best practice samples")]
struct Cli {
    /// Settings file; defaults to ./launcher.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Engine executable, overriding the configured one.
    #[arg(long)]
    engine: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every sample as an Id | Name | Description table.
    List,
    /// Print the category tabs in presentation order.
    Categories,
    /// Start an engine session. Runs the demo when no selection is given.
    Launch(LaunchArgs),
}

#[derive(Args, Debug)]
struct LaunchArgs {
    #[arg(long, conflicts_with_all = ["category", "tab"])]
    sample: Option<String>,
    #[arg(long, conflicts_with = "tab")]
    category: Option<String>,
    /// Run every sample of the tab at this index (see `categories`).
    #[arg(long)]
    tab: Option<usize>,
    #[arg(long)]
    asset_dir: Option<PathBuf>,
    #[arg(long)]
    temp_dir: Option<PathBuf>,
    #[arg(long)]
    storage_dir: Option<PathBuf>,
    /// Open the log attached to fatal notifications as soon as they arrive.
    #[arg(long)]
    open_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(engine) = cli.engine {
        settings.engine_path = engine;
    }
    let policy = CategoryOrderPolicy::new(settings.preferred_categories.clone());

    match cli.command {
        Command::List => {
            let roots = prepare_roots(&settings.engine_root(), settings.storage_root)?;
            let (launcher, _) = build_launcher(&settings, policy, None);
            match launcher.start(check_grants(&roots)) {
                PresentationState::Ready(catalog) => {
                    for line in catalog.render_listing() {
                        println!("{line}");
                    }
                }
                other => print_blocked(&other),
            }
        }
        Command::Categories => {
            let roots = prepare_roots(&settings.engine_root(), settings.storage_root)?;
            let (launcher, _) = build_launcher(&settings, policy, None);
            match launcher.start(check_grants(&roots)) {
                PresentationState::Ready(catalog) => {
                    for (index, section) in catalog.sections().iter().enumerate() {
                        println!("{index}: {} ({})", section.category, section.samples.len());
                    }
                }
                other => print_blocked(&other),
            }
        }
        Command::Launch(args) => launch(&settings, policy, args).await?,
    }

    Ok(())
}

fn build_launcher(
    settings: &Settings,
    policy: CategoryOrderPolicy,
    relay: Option<NativeEventRelay>,
) -> (Launcher, Option<Arc<ProcessEngine>>) {
    match ProcessEngine::load(&settings.engine_path) {
        Ok(engine) => {
            let engine = Arc::new(match relay {
                Some(relay) => engine.with_relay(relay),
                None => engine,
            });
            (Launcher::new(engine.clone(), policy), Some(engine))
        }
        Err(err) => {
            error!("{err:#}");
            (Launcher::without_engine(ENGINE_LOAD_FAILED, policy), None)
        }
    }
}

fn print_blocked(state: &PresentationState) {
    match state {
        PresentationState::Ready(_) => {}
        PresentationState::PermissionRequired { missing } => {
            let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
            println!("Storage permission required: {}", missing.join(", "));
        }
        PresentationState::EngineUnavailable { reason } => println!("{reason}"),
    }
}

/// Host storage grants, re-evaluated on every start: assets must be listable
/// and the temp root writable.
fn check_grants(roots: &FilesystemRoots) -> PermissionGrants {
    PermissionGrants {
        read: fs::read_dir(&roots.asset).is_ok(),
        write: is_writable_dir(&roots.temp),
    }
}

fn is_writable_dir(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
        .unwrap_or(false)
}

fn resolve_roots(settings: &Settings, args: &LaunchArgs) -> Result<FilesystemRoots> {
    let defaults = prepare_roots(&settings.engine_root(), settings.storage_root)
        .with_context(|| format!("failed to prepare '{}'", settings.engine_root().display()))?;
    let mut roots = FilesystemRoots::new(
        args.asset_dir.clone().unwrap_or(defaults.asset),
        args.temp_dir.clone().unwrap_or(defaults.temp),
    );
    roots.storage = args.storage_dir.clone().or(defaults.storage);
    Ok(roots)
}

async fn launch(settings: &Settings, policy: CategoryOrderPolicy, args: LaunchArgs) -> Result<()> {
    let roots = resolve_roots(settings, &args)?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open notification counter database"
        );
        error
    })?;

    let grants = settings
        .shared_roots
        .iter()
        .fold(FileGrantProvider::new(&settings.provider_authority), |grants, root| {
            grants.with_root(root)
        });
    let (sink, surface) = surface_channel(SURFACE_CAPACITY);
    let (relay, dispatcher) = RelayDispatcher::new(
        Arc::new(PersistedCounter::new(storage)),
        Arc::new(sink),
        grants,
        RelayConfig {
            channel: settings.notification_channel.clone(),
            title: settings.notification_title.clone(),
        },
    )
    .spawn();

    let open_logs = args.open_logs;
    let presenter = tokio::task::spawn_blocking(move || {
        let viewer = ConsoleViewer::new(std::io::stdout());
        run_surface(surface, &mut std::io::stdout(), &viewer, open_logs)
    });

    let (launcher, engine) = build_launcher(settings, policy, Some(relay.clone()));
    let outcome = run_selection(&launcher, engine, &args, &roots).await;

    drop(launcher);
    drop(relay);
    dispatcher.await.context("notification dispatcher failed")?;
    let shown = presenter.await.context("notification surface failed")??;
    info!(shown, "launcher finished");
    outcome
}

async fn run_selection(
    launcher: &Launcher,
    engine: Option<Arc<ProcessEngine>>,
    args: &LaunchArgs,
    roots: &FilesystemRoots,
) -> Result<()> {
    let catalog = match launcher.start(check_grants(roots)) {
        PresentationState::Ready(catalog) => catalog,
        PresentationState::PermissionRequired { missing } => {
            bail!("storage permission required: {missing:?}")
        }
        PresentationState::EngineUnavailable { reason } => bail!(reason),
    };

    let launched = match (&args.sample, &args.category, args.tab) {
        (Some(id), _, _) => launcher.launch(&SelectionSpec::BySampleId(id.clone()), roots),
        (None, Some(category), _) => {
            launcher.launch(&SelectionSpec::ByCategory(category.clone()), roots)
        }
        (None, None, Some(tab)) => launcher.launch_category(&catalog, tab, roots),
        (None, None, None) => launcher.launch(&SelectionSpec::Demo, roots),
    };
    launched.context("launch failed")?;

    let Some(engine) = engine else {
        return Ok(());
    };
    let status = tokio::task::spawn_blocking(move || engine.wait())
        .await
        .context("engine wait task failed")??;
    if let Some(status) = status.filter(|status| !status.success()) {
        warn!(%status, "engine exited unsuccessfully");
    }
    Ok(())
}
