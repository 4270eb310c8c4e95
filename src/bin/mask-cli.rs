use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::path::PathBuf;

use path_mask_proxy::artifact::{RuleArtifact, DEFAULT_MARKER};
use path_mask_proxy::config::{load_config, sanitized_paths, validate_paths};
use path_mask_proxy::masking::{MaskSnapshot, RawPaths};

#[derive(Parser)]
#[command(name = "mask-cli")]
#[command(about = "Management CLI for the path-masking proxy", long_about = None)]
struct Cli {
    /// Admin API base URL (remote commands).
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key (remote commands).
    #[arg(short, long, env = "MASK_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the rule block for a config file into its artifact
    Sync {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Remove the rule block from a config file's artifact
    Teardown {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the replacement table and rule block for a config file
    Preview {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Check proxy status
    Status,
    /// Show the live path masks
    Paths,
    /// Save new path masks on the running proxy
    SetPaths {
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        includes: Option<String>,
        #[arg(long)]
        uploads: Option<String>,
        #[arg(long)]
        comments: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(&config)?;
            let paths = sanitized_paths(&config);
            if let Err(errors) = validate_paths(&paths, &config.layout) {
                for e in errors {
                    eprintln!("Warning: {}", e);
                }
            }
            let artifact = artifact_for(&config)?;
            let report = artifact.sync(&paths, &config.layout)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Teardown { config } => {
            let config = load_config(&config)?;
            let report = artifact_for(&config)?.teardown()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Preview { config } => {
            let config = load_config(&config)?;
            let snapshot = MaskSnapshot::from_config(&config, 0);
            for entry in snapshot.table().entries() {
                println!("{:<60} -> {}", entry.from, entry.to);
            }
            println!();
            let marker = config.artifact.marker.as_str();
            let artifact = RuleArtifact::new(
                config.artifact.path.as_deref().unwrap_or(".htaccess"),
                if marker.is_empty() { DEFAULT_MARKER } else { marker },
            );
            match artifact.preview(snapshot.paths(), snapshot.layout()) {
                Some(block) => print!("{}", block),
                None => println!("(no rule block: nothing is masked)"),
            }
        }
        Commands::Status => {
            let res = admin_client(&cli.key)?
                .get(format!("{}/admin/status", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Paths => {
            let res = admin_client(&cli.key)?
                .get(format!("{}/admin/paths", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::SetPaths {
            content,
            includes,
            uploads,
            comments,
        } => {
            let raw = RawPaths {
                content,
                includes,
                uploads,
                comments,
            };
            let res = admin_client(&cli.key)?
                .put(format!("{}/admin/paths", cli.url))
                .json(&raw)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn artifact_for(
    config: &path_mask_proxy::ProxyConfig,
) -> Result<RuleArtifact, Box<dyn std::error::Error>> {
    let path = config
        .artifact
        .path
        .as_deref()
        .ok_or("config has no [artifact] path")?;
    Ok(RuleArtifact::new(path, config.artifact.marker.clone()))
}

fn admin_client(key: &str) -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", key))?,
    );
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
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
