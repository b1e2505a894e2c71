use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

#[derive(Parser)]
#[command(name = "hostgate-ctl")]
#[command(about = "Control CLI for the hostgate proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy's HTTPS listener
    #[arg(short, long, default_value = "https://localhost")]
    url: String,

    /// Bearer token matching `reloadToken`
    #[arg(short, long)]
    token: Option<String>,

    /// Accept self-signed or otherwise unverifiable certificates
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-read the config file and swap in the new routes
    Reload,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .build()?;

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    }

    match cli.command {
        Commands::Reload => {
            let res = client
                .post(format!("{}/_/reload", cli.url.trim_end_matches('/')))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: proxy returned status {status}");
        eprintln!("Response: {text}");
        std::process::exit(1);
    }

    println!("{text}");
    Ok(())
}
