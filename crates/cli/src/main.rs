use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facegate_core::capture::domain::frame_source::FrameSource;
use facegate_core::capture::infrastructure::replay_frame_source::ReplayFrameSource;
use facegate_core::display::notifier::LogNotifier;
use facegate_core::display::presenter::LogPresenter;
use facegate_core::recognition::domain::feature_store::FeatureStore;
use facegate_core::recognition::infrastructure::histogram_engine::HistogramPerceptionEngine;
use facegate_core::recognition::infrastructure::sqlite_feature_store::SqliteFeatureStore;
use facegate_core::session::coordinator::{CoordinatorConfig, FaceCoordinator};
use facegate_core::shared::constants::DEFAULT_CAPACITY;

/// Live face identification over replayed camera streams.
#[derive(Parser)]
#[command(name = "facegate")]
struct Cli {
    /// Directory of frames for the main (recognition) stream.
    watch_dir: PathBuf,

    /// Directory of frames for the liveness stream. Without it,
    /// matches stay unconfirmed and no proceed cue is given.
    #[arg(long)]
    liveness_dir: Option<PathBuf>,

    /// SQLite database of enrolled faces. Omit for a volatile
    /// in-memory store.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Directory of reference images to enroll at startup.
    #[arg(long)]
    preload_dir: Option<PathBuf>,

    /// Maximum number of enrolled faces.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Delay between replayed frames, in milliseconds.
    #[arg(long, default_value = "40")]
    interval_ms: u64,

    /// Replay the stream directories in a loop.
    #[arg(long = "loop")]
    looped: bool,

    /// How long to keep the session running, in seconds.
    #[arg(long, default_value = "10")]
    duration_secs: u64,

    /// Start a registration session immediately.
    #[arg(long)]
    register: bool,

    /// Start a deletion session immediately.
    #[arg(long)]
    delete: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let store = open_store(&cli.db)?;
    let config = CoordinatorConfig {
        capacity: cli.capacity,
        preload_dir: cli.preload_dir.clone(),
        ..CoordinatorConfig::default()
    };
    let mut coordinator = FaceCoordinator::start(
        Box::new(HistogramPerceptionEngine::new()),
        store,
        Arc::new(LogPresenter),
        Arc::new(LogNotifier),
        config,
    )?;

    if cli.register {
        coordinator.request_register();
    } else if cli.delete {
        coordinator.request_delete();
    }

    let interval = Duration::from_millis(cli.interval_ms);
    let mut main_source = ReplayFrameSource::new(&cli.watch_dir, interval, cli.looped);
    main_source.start(coordinator.main_sink())?;

    let mut liveness_source = match &cli.liveness_dir {
        Some(dir) => {
            let mut source = ReplayFrameSource::new(dir, interval, cli.looped);
            source.start(coordinator.liveness_sink())?;
            Some(source)
        }
        None => None,
    };

    std::thread::sleep(Duration::from_secs(cli.duration_secs));

    main_source.stop();
    if let Some(source) = liveness_source.as_mut() {
        source.stop();
    }
    coordinator.shutdown();
    Ok(())
}

fn open_store(db: &Option<PathBuf>) -> Result<Box<dyn FeatureStore>, Box<dyn std::error::Error>> {
    let store = match db {
        Some(path) => SqliteFeatureStore::open(path)?,
        None => {
            log::warn!("no --db given, enrollments will not survive this run");
            SqliteFeatureStore::open_in_memory()?
        }
    };
    Ok(Box::new(store))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.watch_dir.is_dir() {
        return Err(format!("Watch directory not found: {}", cli.watch_dir.display()).into());
    }
    if let Some(dir) = &cli.liveness_dir {
        if !dir.is_dir() {
            return Err(format!("Liveness directory not found: {}", dir.display()).into());
        }
    }
    if let Some(dir) = &cli.preload_dir {
        if !dir.is_dir() {
            return Err(format!("Preload directory not found: {}", dir.display()).into());
        }
    }
    if cli.register && cli.delete {
        return Err("--register and --delete are mutually exclusive".into());
    }
    if cli.capacity == 0 {
        return Err("Capacity must be at least 1".into());
    }
    if cli.interval_ms == 0 {
        return Err("Interval must be at least 1 ms".into());
    }
    Ok(())
}
