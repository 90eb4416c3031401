use anyhow::{Context, Result};
use invahelp::cli::{self, Command};
use invahelp::config::Config;
use invahelp::context::{AppContext, SharedContext, StandardContext};
use invahelp::logging;
use invahelp::model::Dataset;
use invahelp::sanitize::clean_incoming;
use invahelp::storage::{FileStore, LocalStore};
use invahelp::{DataService, RemoteGateway, ServiceError};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn read_dataset(path: &Path) -> Result<Dataset> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let raw: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("{:?} is not valid JSON", path))?;
    clean_incoming(&raw)
}

fn build_service(ctx: &dyn AppContext, config: &Config) -> Result<DataService> {
    let gateway = RemoteGateway::new(config)?;
    let store = LocalStore::new(Arc::new(FileStore::new(ctx.get_store_dir()?)));
    Ok(DataService::new(gateway, store))
}

async fn run(ctx: SharedContext, command: Command) -> Result<ExitCode> {
    let config = Config::load_or_default(ctx.as_ref())?;
    logging::init_logging(ctx.as_ref(), logging::level_or_default(&config.log_level));

    match command {
        Command::Help => {
            cli::print_help("invahelp");
            Ok(ExitCode::SUCCESS)
        }
        Command::ConfigPath => {
            println!("{}", Config::get_path_string(ctx.as_ref())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Load => {
            let service = build_service(ctx.as_ref(), &config)?;
            let data = service.load().await;
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::SaveFallback(path) => {
            let data = read_dataset(&path)?;
            let store = LocalStore::new(Arc::new(FileStore::new(ctx.get_store_dir()?)));
            store.try_save(&data)?;
            println!(
                "Stored {} events and {} help services locally",
                data.events.len(),
                data.help.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Override(path) => {
            let data = read_dataset(&path)?;
            let service = build_service(ctx.as_ref(), &config)?;
            match service.override_remote(&data).await {
                Ok(true) => {
                    println!("Remote dataset replaced");
                    Ok(ExitCode::SUCCESS)
                }
                Ok(false) => {
                    eprintln!("Remote endpoint did not accept the upload");
                    Ok(ExitCode::from(1))
                }
                Err(ServiceError::EndpointNotConfigured) => {
                    eprintln!(
                        "Error: no endpoint configured. Set `endpoint` in {} or INVAHELP_ENDPOINT.",
                        Config::get_path_string(ctx.as_ref())?
                    );
                    Ok(ExitCode::from(2))
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let invocation = match cli::parse_args(env::args().skip(1)) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_help("invahelp");
            return Ok(ExitCode::from(2));
        }
    };

    let ctx: SharedContext = Arc::new(StandardContext::new(invocation.root));
    run(ctx, invocation.command).await
}
