//! Configuration file and environment binding for the CLI

use crate::GenerateArgs;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OUTPUT: &str = "stdout";
const DEFAULT_FORMAT: &str = "json";
const DEFAULT_OUT_PATH: &str = ".";

/// Settings read from `~/.config/kbom/kbom.json` and `KBOM_*` variables
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    pub out_path: Option<PathBuf>,
    pub namespace: Option<String>,
    pub resource: Option<String>,
    pub format: Option<String>,
    pub output: Option<String>,
    pub short: Option<bool>,
    pub context: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
}

impl Settings {
    /// Load the configuration file (if present) overlaid with the environment
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = Self::config_path() {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder
            .add_source(config::Environment::with_prefix("KBOM"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("kbom").join("kbom.json"))
    }
}

/// Generate options after applying flags, settings and defaults in that order
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub context: Option<String>,
    pub short: bool,
    pub output: String,
    pub format: String,
    pub out_path: PathBuf,
    pub namespace: String,
    pub resource: String,
    pub request_timeout: Option<Duration>,
    pub concurrency: Option<usize>,
}

impl GenerateOptions {
    pub fn resolve(context: Option<String>, args: GenerateArgs, settings: Settings) -> Self {
        Self {
            context: context.or(settings.context),
            short: match (args.short, args.full) {
                (true, _) => true,
                (false, true) => false,
                (false, false) => settings.short.unwrap_or(false),
            },
            output: args
                .output
                .or(settings.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            format: args
                .format
                .or(settings.format)
                .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            out_path: args
                .out_path
                .or(settings.out_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_PATH)),
            namespace: args.namespace.or(settings.namespace).unwrap_or_default(),
            resource: args.resource.or(settings.resource).unwrap_or_default(),
            request_timeout: args
                .request_timeout_secs
                .or(settings.request_timeout_secs)
                .map(Duration::from_secs),
            concurrency: args.concurrency.or(settings.concurrency),
        }
    }
}
