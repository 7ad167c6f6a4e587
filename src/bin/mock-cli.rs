use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use mock_router::config::load_config;
use mock_router::mock::build_registry;

#[derive(Parser)]
#[command(name = "mock-cli")]
#[command(about = "Inspect and exercise mock-router configurations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every route a config defines, in path order
    Routes {
        #[arg(short, long)]
        config: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Send a request to a running server
    Request {
        #[arg(short, long, default_value = "http://127.0.0.1:3000")]
        url: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Routes { config, json } => {
            let config = load_config(&config)?;
            let routes = build_registry(&config).setup().await?;
            let info = routes.describe();
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                for route in info {
                    let params = if route.params.is_empty() {
                        String::new()
                    } else {
                        format!("  ({})", route.params.join(", "))
                    };
                    println!("{:<8} {}{}", route.method.as_str().to_uppercase(), route.path, params);
                }
            }
        }
        Commands::Request { url, method, path, data } => {
            let client = reqwest::Client::new();
            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut request = client.request(method, format!("{}{}", url.trim_end_matches('/'), path));
            if let Some(data) = data {
                let body: Value = serde_json::from_str(&data)?;
                request = request.json(&body);
            }
            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    println!("HTTP {}", status);
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
