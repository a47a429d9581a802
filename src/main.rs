//! Wayfarer CLI - plan a San Francisco day trip with two agents

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use wayfarer::config::{mask_api_key, WayfarerConfig};
use wayfarer::error::{FixSuggestion, WayfarerError};
use wayfarer::gateway::MAPBOX_TOKEN_VAR;
use wayfarer::travel::{plan_trip, GatewayMode};

#[derive(Parser)]
#[command(name = "wayfarer")]
#[command(about = "Wayfarer - multi-agent travel planner over an MCP tool gateway")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/wayfarer/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use built-in canned responses instead of spawning the gateway
    #[arg(long)]
    offline: bool,

    /// Only print the final plan
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), WayfarerError> {
    let verbose = !cli.quiet;
    let mode = if cli.offline {
        GatewayMode::Offline
    } else {
        GatewayMode::Stdio
    };

    let config = match &cli.config {
        Some(path) => WayfarerConfig::load_from(path)?,
        None => WayfarerConfig::load()?,
    }
    .with_env();

    if verbose {
        println!("{} Setting up tool gateway configuration...", "→".cyan());
        match mode {
            GatewayMode::Offline => println!("  {} offline (canned responses)", "gateway:".dimmed()),
            GatewayMode::Stdio => {
                println!(
                    "  {} {} {}",
                    "gateway:".dimmed(),
                    config.gateway.command.cyan().bold(),
                    config.gateway.args.join(" ").cyan()
                );
                if let Some(token) = config.gateway.env.get(MAPBOX_TOKEN_VAR) {
                    println!(
                        "  {} {}",
                        format!("{}:", MAPBOX_TOKEN_VAR).dimmed(),
                        mask_api_key(token, 8)
                    );
                }
            }
        }
        println!("{} Creating agents and tasks...", "→".cyan());
        println!("{} Starting travel planning pipeline...\n", "→".cyan());
    }

    let result = plan_trip(&config, mode, verbose).await?;

    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("{}", "TRAVEL PLAN".bold());
    println!("{}", rule);
    println!("{}", result.final_output());
    println!("{}", rule);

    Ok(())
}
