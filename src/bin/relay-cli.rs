use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the webhook relay", long_about = None)]
struct Cli {
    /// Base URL of the relay.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Admin API key.
    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the relay version and the currently resolved target
    Status,
    /// Point the relay at a new backend base URL
    SetTarget {
        /// New backend base URL, e.g. https://bot.example.com
        new_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::SetTarget { new_url } => {
            client
                .post(format!("{}/admin/config", base))
                .headers(headers)
                .form(&[("action", "update_url"), ("new_url", new_url.as_str())])
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
