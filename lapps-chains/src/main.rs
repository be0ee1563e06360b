use anyhow::Context;
use clap::{Parser, Subcommand};
use lapps_chains::utils::url::is_remote;
use lapps_chains::{
    render_document, BypassMode, ChainConfig, ChainExecutor, ChainRegistry, ClientConfig,
    DirectoryCache, Document, EnvCredentials, LappsClient, ServiceDirectory, ServiceFilter,
    StepRecording,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "lapps-chains")]
#[command(about = "Run chains of LAPPS Grid services and visualize the results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available service chains.
    Chains,

    /// List services grouped on the annotation types they produce.
    Services {
        /// Only load this server's listing.
        #[arg(long)]
        server: Option<String>,
    },

    /// Show the service manager record of one service.
    Service { identifier: String },

    /// Run a chain on a local file or a URL.
    Run {
        #[arg(long)]
        chain: String,

        /// Path or http(s) URL of the text to process.
        #[arg(long)]
        input: String,

        /// Write an HTML page here instead of printing the visualizations.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Skip the remote services and use the example document.
        #[arg(long)]
        bypass: bool,

        /// Save the output of every step in this directory.
        #[arg(long)]
        save_steps: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client_config = ClientConfig::default();
    let cache_dir = env::var("LAPPS_CACHE_DIR").unwrap_or_else(|_| "data/services".to_string());

    match cli.cmd {
        Commands::Chains => {
            print!("{}", ChainRegistry::builtin().describe());
        }
        Commands::Services { server } => {
            let servers = match server {
                Some(server) => vec![server],
                None => client_config.server_names(),
            };
            let mut directory = load_directory(client_config, &cache_dir, &servers).await?;
            directory.load_all_metadata().await;
            print!("{}", directory.categorized_listing());
        }
        Commands::Service { identifier } => {
            let servers = client_config.server_names();
            let directory = load_directory(client_config, &cache_dir, &servers).await?;
            let info = directory
                .lookup(&identifier)
                .map(|service| service.info.clone())
                .unwrap_or_else(|| serde_json::Value::String("SERVICE NOT FOUND".to_string()));
            let response = serde_json::json!({ "service": identifier, "info": info });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Run {
            chain,
            input,
            out,
            bypass,
            save_steps,
        } => {
            let registry = ChainRegistry::builtin();
            let chain = registry.require(&chain)?;

            let chain_config = ChainConfig {
                save_steps: save_steps
                    .map(StepRecording::Directory)
                    .unwrap_or_default(),
                bypass: if bypass {
                    BypassMode::BuiltinExample
                } else {
                    BypassMode::Disabled
                },
            };
            let remote = Arc::new(LappsClient::new(client_config, Arc::new(EnvCredentials))?);
            let executor = ChainExecutor::new(remote, &chain_config)?;

            info!("Opening {}", input);
            let text = read_input(&input).await?;
            let result = executor.run(chain, Document::text(text)).await.map_err(|e| {
                error!("{}", e);
                e
            })?;

            let rendered = render_document(&result)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered.to_html(Some(chain), &input))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", rendered.to_text()),
            }
        }
    }

    Ok(())
}

async fn load_directory(
    client_config: ClientConfig,
    cache_dir: &str,
    servers: &[String],
) -> anyhow::Result<ServiceDirectory> {
    let remote = Arc::new(LappsClient::new(client_config, Arc::new(EnvCredentials))?);
    let cache = Arc::new(DirectoryCache::new(cache_dir));
    let directory = ServiceDirectory::load(
        servers,
        remote,
        cache,
        vec![ServiceFilter::vassar_exclusions()],
    )
    .await?;
    Ok(directory)
}

async fn read_input(location: &str) -> anyhow::Result<String> {
    if is_remote(location) {
        let response = reqwest::get(location).await?.error_for_status()?;
        Ok(response.text().await?)
    } else {
        std::fs::read_to_string(location).with_context(|| format!("could not read {}", location))
    }
}
