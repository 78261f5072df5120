use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ORIGIN, USER_AGENT};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "collector-cli")]
#[command(about = "Smoke-test CLI for the event collector", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check collector and database health
    Health,
    /// Send a sample event
    Send {
        /// Ask the collector to geolocate and parse the user agent
        #[arg(long)]
        deep: bool,

        /// Origin header to present, to exercise the origin policy
        #[arg(long)]
        origin: Option<String>,

        /// Event name
        #[arg(long, default_value = "cli_test")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Send { deep, origin, name } => {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(
                USER_AGENT,
                HeaderValue::from_static(concat!("collector-cli/", env!("CARGO_PKG_VERSION"))),
            );
            if let Some(origin) = origin {
                headers.insert(ORIGIN, HeaderValue::from_str(&origin)?);
            }

            let event = json!({
                "Cookie": "cli",
                "Page": "/cli",
                "Event_name": name,
                "Language": "en",
                "Deep": deep,
            });

            let res = client
                .post(format!("{}/record_event", cli.url))
                .headers(headers)
                .body(event.to_string())
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    println!("Status: {}", status);
    for (name, value) in res.headers() {
        if name.as_str().starts_with("access-control-") {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
