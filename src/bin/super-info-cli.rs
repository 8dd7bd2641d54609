use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "super-info-cli")]
#[command(about = "Query a running super-info service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the aggregate for a country
    Lookup {
        /// Country name, e.g. "new zealand"
        country: String,
    },
    /// Probe the upstream services
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/api/super-info", cli.url.trim_end_matches('/'));

    let res = match cli.command {
        Commands::Lookup { country } => {
            client
                .get(&endpoint)
                .query(&[("country", country.as_str())])
                .send()
                .await?
        }
        Commands::Health => {
            client
                .get(&endpoint)
                .query(&[("health", "check")])
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
        eprintln!("Error: service returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
