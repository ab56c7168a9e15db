//! stash CLI - `stash` コマンド
//!
//! ここでの queue は常に disk です。memory と accelerator の queue は
//! 1 プロセスより長く残らないためです。

mod cli;

use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands};
use stash_core::select::parse_extensions;
use stash_core::{
    CursorStart, LoadDevice, LoadRequest, PreviewRequest, PreviewResponse, SelectionQuery, Stash,
    StashConfig, StorageMode, StoreDevice, TensorTriplet,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "stash.toml";

type CliResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log.filter);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<StashConfig, stash_core::domain::ConfigError> {
    match path {
        Some(path) => StashConfig::from_path(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => StashConfig::from_path(DEFAULT_CONFIG_FILE),
        None => Ok(StashConfig::default()),
    }
}

/// `RUST_LOG` wins over `log.filter`. Logs go to stderr so stdout stays parseable.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(command: Commands, config: StashConfig) -> CliResult {
    let stash = Stash::builder(config).build()?;

    match command {
        Commands::Save {
            queue,
            primary,
            positive,
            negative,
        } => {
            let payload = TensorTriplet::new(read(&primary)?, read(&positive)?, read(&negative)?);
            let saved = stash.save(StorageMode::Disk, &queue, payload, StoreDevice::Cpu)?;
            println!("{}", saved.summary());
        }

        Commands::Load {
            queue,
            peek,
            reset_cursor,
            cursor,
            out,
        } => {
            let request = LoadRequest {
                consume: !peek,
                start: CursorStart::from_inputs(reset_cursor, cursor),
                load_device: LoadDevice::Cpu,
            };
            let outcome = stash.load(StorageMode::Disk, &queue, request)?;
            if let Some(loaded) = &outcome.artifact {
                fs::create_dir_all(&out)?;
                let names = ["primary.bin", "positive.bin", "negative.bin"];
                for (name, blob) in names.iter().zip(loaded.artifact.payload.components()) {
                    fs::write(out.join(name), blob.as_bytes())?;
                }
            }
            println!("{}", outcome.summary());
            println!("cursor {}", outcome.cursor_before);
        }

        Commands::Resolve {
            root,
            kind,
            sort,
            include,
            exclude,
            ext,
            index,
            on_out_of_range,
            json,
        } => {
            let query = SelectionQuery {
                root_dir: root,
                kind,
                sort,
                include_regex: include,
                exclude_regex: exclude,
                extensions: parse_extensions(&ext),
                index,
                on_out_of_range,
            };
            let selection = stash.resolve(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&selection)?);
            } else {
                println!("{}", selection.path.display());
            }
        }

        Commands::Describe { queue } => {
            for line in stash.describe_queue(StorageMode::Disk, &queue)? {
                println!("{line}");
            }
        }

        Commands::Preview => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            let response = match serde_json::from_str::<PreviewRequest>(&body) {
                Ok(request) => stash.preview_service().serve(request).await,
                Err(e) => PreviewResponse::failure(format!("invalid request body: {e}")),
            };
            println!("{}", serde_json::to_string(&response)?);
        }

        Commands::Prune => {
            let removed = stash.prune_disk_queues()?;
            println!("removed {removed} empty queue directories");
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()).into())
}
