pub mod config;
pub mod data;
pub mod join;
pub mod legend;
pub mod projection;
pub mod render;
pub mod scale;
pub mod server;
pub mod tooltip;
pub mod topology;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the county education choropleth to SVG and HTML
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the map, then serve it together with the hover API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

async fn render_map(app_config: &config::AppConfig) -> anyhow::Result<render::ChoroplethMap> {
    // 1. Load both datasets
    let (counties, records) = data::load_data(app_config).await?;

    // 2. Join, scale and draw
    let map = render::build_map(&app_config.render, counties, records)?;

    // 3. Write documents
    render::write_outputs(app_config, &map)?;

    let summary = map.summary();
    tracing::info!(
        "Rendered {} counties ({} matched, {} unmatched), domain {:?}",
        summary.counties,
        summary.matched,
        summary.unmatched,
        summary.domain
    );
    Ok(map)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            tracing::info!("Rendering map with config: {:?}", config);
            let app_config = config::AppConfig::load_or_default(config)?;
            render_map(&app_config).await?;
            tracing::info!("Render complete!");
        }
        Commands::Serve { config } => {
            tracing::info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_or_default(config)?;
            let map = render_map(&app_config).await?;
            server::start_server(app_config, map).await?;
        }
    }

    Ok(())
}
