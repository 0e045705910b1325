use std::fs::canonicalize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ::config::{Config as cfg, Environment, File};
use clap::{Parser, ValueEnum};
use error_stack::{Result, ResultExt};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use echod::config::Config;
use echod::Error;

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Set the paths for config file lookup. Can be defined multiple times (configs get merged)
    #[arg(short, long, default_values_os_t = vec![std::path::PathBuf::from("~/.echod/config.toml"), std::path::PathBuf::from("config.toml")])]
    pub config: Vec<PathBuf>,

    /// Set the output style of the logs
    #[arg(short, long, value_enum, default_value_t = Output::Text)]
    pub output: Output,
}

#[derive(Debug, Clone, Parser, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Args = Args::parse();
    set_up_logger(&args.output);

    info!(?args, "starting echod");
    let cfg = init_config(&args.config);

    let result = echod::run(cfg).await;
    info!("shutting down");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            error!("{report:#}");

            // print detailed error report as the last output if in text mode
            if matches!(args.output, Output::Text) {
                eprintln!("{report:?}");
            }

            ExitCode::FAILURE
        }
    }
}

fn set_up_logger(output: &Output) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match output {
        Output::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .init();
        }
        Output::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .init();
        }
    };
}

fn init_config(config_paths: &[PathBuf]) -> Config {
    let files = find_config_files(config_paths);

    load_config(&files)
        .inspect_err(|report| error!(?files, "{report:#}"))
        .unwrap_or_default()
}

/// Existing config files among `config_paths`, in the order given
fn find_config_files(config_paths: &[PathBuf]) -> Vec<PathBuf> {
    let files: Vec<_> = config_paths
        .iter()
        .map(expand_home_dir)
        .filter_map(|path| match canonicalize(&path) {
            Ok(file) => {
                info!(file = %file.display(), "found config file");
                Some(file)
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "skipping config file");
                None
            }
        })
        .collect();

    if files.is_empty() {
        info!("found no config files to load");
    }

    files
}

// later files override earlier ones, and ECHOD_* variables override all files
fn load_config(files: &[PathBuf]) -> Result<Config, Error> {
    let sources: Vec<_> = files.iter().map(|file| File::from(file.as_path())).collect();

    cfg::builder()
        .add_source(sources)
        .add_source(Environment::with_prefix(clap::crate_name!()))
        .build()
        .and_then(|merged| merged.try_deserialize::<Config>())
        .change_context(Error::LoadConfig)
        .attach_printable_lazy(|| format!("config files: {files:?}"))
}

fn expand_home_dir(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(home_subfolder) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    dirs::home_dir().map_or(path.to_path_buf(), |home| home.join(home_subfolder))
}
