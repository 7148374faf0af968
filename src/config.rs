//! Configuration management for Skinwalker.
//!
//! This module provides the command-line interface, which supports:
//! - Command-line arguments via clap
//! - Environment variables with `SKINWALKER_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` - Run the image server
//! - `check` - Verify the source root and cache directory before deploying
//!
//! # Environment Variables
//!
//! - `SKINWALKER_HOST` - Server bind address (default: 0.0.0.0)
//! - `SKINWALKER_PORT` - Server port (default: 3000)
//! - `SKINWALKER_SOURCE_ROOT` - Directory containing the source images (required)
//! - `SKINWALKER_CACHE_DIR` - Writable cache directory, must already exist (required)
//! - `SKINWALKER_JPEG_QUALITY` - JPEG output quality (default: 90)
//! - `SKINWALKER_MAX_OUTPUT_PIXELS` - Largest resize output in pixels (default: 25000000)
//! - `SKINWALKER_ALLOW_UPSCALE` - Let `contain` enlarge small images (default: false)
//! - `SKINWALKER_CANONICAL_KEYS` - Sort query parameters in cache keys (default: false)
//! - `SKINWALKER_BAD_REQUEST_STATUS` - Answer invalid parameters with 400 (default: false)
//! - `SKINWALKER_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `SKINWALKER_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::key::KeyPolicy;
use crate::server::routes::DEFAULT_CACHE_MAX_AGE;
use crate::transform::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_OUTPUT_PIXELS, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Skinwalker - on-demand image transforms with a disk cache.
///
/// Serves resized, cropped and fitted versions of stored images, controlled by
/// URL query parameters. Every distinct transformation is computed once and
/// cached on disk.
#[derive(Parser, Debug, Clone)]
#[command(name = "skinwalker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the CLI and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the image server
    Serve(ServeConfig),

    /// Check the source root and cache directory
    Check(CheckConfig),
}

/// Options for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SKINWALKER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SKINWALKER_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory containing the source images.
    ///
    /// Request paths are resolved relative to this directory and may not
    /// leave it.
    #[arg(long, env = "SKINWALKER_SOURCE_ROOT")]
    pub source_root: PathBuf,

    /// Directory where transformed images are cached.
    ///
    /// Must exist and be writable before the server starts.
    #[arg(long, env = "SKINWALKER_CACHE_DIR")]
    pub cache_dir: PathBuf,

    // =========================================================================
    // Transform Configuration
    // =========================================================================
    /// JPEG quality for transformed images (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "SKINWALKER_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Largest number of pixels a resize may produce.
    ///
    /// Larger resize requests are answered with 404.
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_PIXELS, env = "SKINWALKER_MAX_OUTPUT_PIXELS")]
    pub max_output_pixels: u64,

    /// Let `contain` enlarge images smaller than the requested box.
    #[arg(long, default_value_t = false, env = "SKINWALKER_ALLOW_UPSCALE")]
    pub allow_upscale: bool,

    /// Sort query parameters before deriving cache keys.
    ///
    /// Reordered but otherwise identical requests then share one cache entry.
    /// Changes cache file names, so existing entries will not be reused.
    #[arg(long, default_value_t = false, env = "SKINWALKER_CANONICAL_KEYS")]
    pub canonical_keys: bool,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Answer invalid parameters with 400 instead of 404.
    #[arg(long, default_value_t = false, env = "SKINWALKER_BAD_REQUEST_STATUS")]
    pub bad_request_status: bool,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "SKINWALKER_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SKINWALKER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.source_root.is_dir() {
            return Err(format!(
                "Source root {} is not a directory. Set --source-root or SKINWALKER_SOURCE_ROOT",
                self.source_root.display()
            ));
        }

        if !self.cache_dir.is_dir() {
            return Err(format!(
                "Cache directory {} does not exist. Create it before starting the server",
                self.cache_dir.display()
            ));
        }

        if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.max_output_pixels == 0 {
            return Err("max_output_pixels must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cache key ordering policy selected by `--canonical-keys`.
    pub fn key_policy(&self) -> KeyPolicy {
        if self.canonical_keys {
            KeyPolicy::Canonical
        } else {
            KeyPolicy::Raw
        }
    }
}

/// Options for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Directory containing the source images.
    #[arg(long, env = "SKINWALKER_SOURCE_ROOT")]
    pub source_root: PathBuf,

    /// Directory where transformed images are cached.
    #[arg(long, env = "SKINWALKER_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
