pub mod classify;
pub mod config;
pub mod data;
pub mod demographics;
pub mod grouping;
pub mod render;
pub mod server;
pub mod state;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write styled choropleth GeoJSON for every display mode
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map data and comparison API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating styled output with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let map_data = data::load_data(&app_config)?;
            render::generate_styled(&app_config, &map_data)?;

            info!("Generation complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let map_data = data::load_data(&app_config)?;
            server::start_server(app_config, map_data).await?;
        }
    }

    Ok(())
}
