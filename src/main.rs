//! Skinwalker - on-demand image transforms with a disk cache.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skinwalker::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    key::KeyPolicy,
    pipeline::ImagePipeline,
    server::{create_router, RouterConfig},
    source::LocalImageSource,
    store::{FsCacheStore, TEMP_FILE_PREFIX},
    transform::ImageTransformer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = match LocalImageSource::new(&config.source_root) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open source root: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = check_writable(&config.cache_dir) {
        error!(
            "Cache directory {} is not writable: {}",
            config.cache_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    info!("Skinwalker v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Source root: {}", source.root().display());
    info!("  Cache directory: {}", config.cache_dir.display());
    info!("  JPEG quality: {}", config.jpeg_quality);
    info!("  Max output: {} pixels", config.max_output_pixels);
    info!("  Cache max-age: {}s", config.cache_max_age);

    match config.key_policy() {
        KeyPolicy::Raw => info!("  Cache keys: raw parameter order"),
        KeyPolicy::Canonical => info!("  Cache keys: canonical parameter order"),
    }
    if config.allow_upscale {
        info!("  Upscaling: enabled for contain");
    }
    if config.bad_request_status {
        info!("  Invalid parameters: 400 Bad Request");
    }
    if config.cors_origins.is_none() {
        warn!("  CORS: any origin allowed");
    }

    let engine = ImageTransformer::new()
        .with_jpeg_quality(config.jpeg_quality)
        .with_max_output_pixels(config.max_output_pixels)
        .with_upscale(config.allow_upscale);

    let pipeline = ImagePipeline::new(source, FsCacheStore::new(&config.cache_dir), engine)
        .with_key_policy(config.key_policy());

    let router = create_router(pipeline, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl 'http://{}/<image>?r=widen&w=200'", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "skinwalker=debug,tower_http=debug"
    } else {
        "skinwalker=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_bad_request_status(config.bad_request_status)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Create and remove a temp file in `dir`.
fn check_writable(dir: &Path) -> std::io::Result<()> {
    tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(dir)
        .map(drop)
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Skinwalker Configuration Check");
    println!("══════════════════════════════");
    println!();

    match LocalImageSource::new(&config.source_root) {
        Ok(source) if source.root().is_dir() => {
            println!("✓ Source root: {}", source.root().display());
        }
        Ok(source) => {
            println!("✗ Source root: {} is not a directory", source.root().display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            println!("✗ Source root: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if !config.cache_dir.is_dir() {
        println!(
            "✗ Cache directory: {} does not exist",
            config.cache_dir.display()
        );
        println!();
        println!("Create it before starting the server, for example:");
        println!("  mkdir -p {}", config.cache_dir.display());
        return ExitCode::FAILURE;
    }
    println!("✓ Cache directory: {}", config.cache_dir.display());

    print!("Testing cache write... ");
    match check_writable(&config.cache_dir) {
        Ok(()) => println!("✓ success"),
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!();
    match FsCacheStore::new(&config.cache_dir).stats().await {
        Ok(stats) => {
            println!("Cache entries: {}", stats.entries);
            println!(
                "Cache size: {:.2} MB",
                stats.total_bytes as f64 / (1024.0 * 1024.0)
            );
        }
        Err(e) => {
            println!("  Error reading cache statistics: {}", e);
        }
    }

    println!();
    println!("══════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
