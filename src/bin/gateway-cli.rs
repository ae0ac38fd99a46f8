use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use action_gateway::manifest::{ManifestError, ManifestRegistry};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the action gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List registered actions
    Actions,
    /// Show rate-limit policy and per-client usage
    RateLimits,
    /// Reload the manifest from its configured source
    Reload,
    /// Parse and check a manifest file locally
    Check {
        /// Path to the manifest JSON
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Check { manifest } => return check_manifest(&manifest),
        Commands::Status => "status",
        Commands::Actions => "actions",
        Commands::RateLimits => "rate-limits",
        Commands::Reload => "reload",
    };

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let url = format!("{}/admin/{}", cli.url.trim_end_matches('/'), path);
    let request = if path == "reload" {
        client.post(url)
    } else {
        client.get(url)
    };
    let res = request.headers(headers).send().await?;
    print_response(res).await
}

fn check_manifest(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    match ManifestRegistry::parse(&text) {
        Ok(registry) => {
            println!("{}: OK ({} actions)", path.display(), registry.len());
            for action in registry.actions() {
                println!(
                    "  {:<24} {:<7} {}",
                    action.id,
                    action.method.to_ascii_uppercase(),
                    action.endpoint
                );
            }
            Ok(())
        }
        Err(ManifestError::Invalid(issues)) => {
            eprintln!("{}: {} problem(s)", path.display(), issues.len());
            for issue in &issues {
                eprintln!("  {}", issue);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
