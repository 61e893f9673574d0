mod cli;

use reelshelf::{
    config::{self, Config},
    probe,
    server::{self, AppContext},
    store::{RecordStore, SqliteStore},
    sync::{SyncCoordinator, SyncEngine, SyncReport, SyncSettings},
};
use reelshelf_db::pool::init_pool;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let db_path = &config.library.database_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path_str);
    let pool = init_pool(&db_path_str)?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting Reelshelf server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let store = open_store(&config)?;
    let engine = SyncEngine::with_defaults(SyncSettings::from_config(&config), Arc::clone(&store))?;
    let ctx = AppContext::new(config, store, engine);

    server::start_server(ctx).await
}

async fn run_sync(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let store = open_store(&config)?;
    let engine = SyncEngine::with_defaults(SyncSettings::from_config(&config), store)?;

    let coordinator = SyncCoordinator::new();
    let permit = coordinator.try_begin()?;
    let report = permit.run(&engine).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.directory_missing {
        println!("Video directory not found; nothing was changed.");
        return;
    }

    println!("Files found: {}", report.files_found);
    println!("  Inserted:  {}", report.inserted);
    println!("  Updated:   {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    println!("Retired:     {}", report.retired);
    println!("Failed:      {}", report.failed);
    if let (Some(start), Some(end)) = (report.started_at, report.finished_at) {
        let elapsed = (end - start).num_milliseconds() as f64 / 1000.0;
        println!("Elapsed:     {:.2}s", elapsed);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelshelf=trace,reelshelf_db=debug,reelshelf_av=debug,reelshelf_common=debug,tower_http=debug".to_string()
        } else {
            "reelshelf=debug,reelshelf_db=info,reelshelf_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Sync { json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_sync(cli.config.as_deref(), json))
        }
        Commands::Probe { file, json } => probe_file(&file, json),
        Commands::Parse { filename, json } => parse_filename(&filename, json),
        Commands::CheckTools => check_tools(),
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelshelf {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(file: &std::path::Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let meta = probe::probe_file(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    if let Some(size) = meta.size_bytes {
        println!("Size: {} bytes", size);
    }
    if let Some(duration) = meta.duration_seconds {
        let secs = duration as u64;
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if let Some(ref codec) = meta.codec_name {
        print!("Video: {}", codec);
        if let Some(resolution) = meta.resolution() {
            print!(" {}", resolution);
        }
        if let Some(fps) = meta.frames_per_second() {
            print!(", {:.3} fps", fps);
        }
        println!();
    }
    if let Some(ref dar) = meta.display_aspect_ratio {
        println!("Aspect ratio: {}", dar);
    }
    if let Some(bit_rate) = meta.bit_rate {
        println!("Bit rate: {} kb/s", bit_rate / 1000);
    }

    Ok(())
}

fn parse_filename(filename: &str, json: bool) -> Result<()> {
    let parsed = reelshelf_parser::parse(filename);

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("Title: {}", parsed.title.as_deref().unwrap_or("-"));
    match parsed.year {
        Some(year) => println!("Year: {}", year),
        None => println!("Year: -"),
    }
    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = probe::check_tools();
    let mut ffprobe_ok = false;

    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };
        if tool.name == "ffprobe" {
            ffprobe_ok = tool.available;
        }

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if ffprobe_ok {
        println!("ffprobe is available; technical metadata will be probed.");
    } else {
        println!("ffprobe is missing; records will only carry file sizes.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::load_config_or_default(None)?
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    match config.library.video_directory {
        Some(ref dir) => println!("  Video directory: {}", dir.display()),
        None => println!("  Video directory: (not set)"),
    }
    println!(
        "  Allowed extensions: {}",
        config.library.allowed_extensions.join(", ")
    );
    println!("  Database: {}", config.library.database_path.display());
    println!(
        "  Metadata lookup: {}",
        if config.metadata.tmdb_api_key.is_some() {
            "enabled"
        } else {
            "disabled (no TMDB API key)"
        }
    );
    println!("  Sync concurrency: {}", config.sync.concurrency);
    println!("  Sync on startup: {}", config.sync.on_startup);

    Ok(())
}
