use clap::{Parser, Subcommand};
use serde_json::Value;

use gildra_control_plane::http::CreateCertRequest;

#[derive(Parser)]
#[command(name = "gildra-cli")]
#[command(about = "Command line client for the Gildra control plane", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CONTROL_PLANE_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the control plane is up
    Health,
    /// Issue a certificate for a domain
    Create {
        domain: String,
        /// le-staging (default) or zerossl
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Print the stored certificate and key
    Cert { domain: String },
    /// Print the routing document for a domain
    Config { domain: String },
    /// Print the key authorization for a pending challenge token
    Challenge { domain: String, token: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/hc")).send().await?;
            print_text(res).await?;
        }
        Commands::Create { domain, provider } => {
            let body = CreateCertRequest { domain, provider };
            let res = client.post(format!("{base}/create")).json(&body).send().await?;
            print_text(res).await?;
        }
        Commands::Cert { domain } => {
            let res = client.get(format!("{base}/domains/{domain}/cert")).send().await?;
            print_json(res).await?;
        }
        Commands::Config { domain } => {
            let res = client.get(format!("{base}/domains/{domain}/config")).send().await?;
            print_json(res).await?;
        }
        Commands::Challenge { domain, token } => {
            let res = client
                .get(format!("{base}/domains/{domain}/challenge/{token}"))
                .send()
                .await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

async fn check_status(res: reqwest::Response) -> Option<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Some(res);
    }
    eprintln!("Error: control plane returned status {}", status);
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    None
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(res) = check_status(res).await {
        println!("{}", res.text().await?);
    }
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(res) = check_status(res).await {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}
