use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use thumbor_guard::imaging::SignedRequest;
use thumbor_guard::keys::InMemoryKeyStore;
use thumbor_guard::signature::{CascadeOutcome, HmacSha1Factory, HmacSha1Signer, SignatureRepair, Signer};

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Sign and inspect thumbor URLs", long_about = None)]
struct Cli {
    /// Security key shared with the image service.
    #[arg(short, long, env = "THUMBOR_GUARD_SECURITY_KEY", hide_env_values = true)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign `<options>/<image>` and print the full path
    Sign { path: String },
    /// Run the repair cascade over a received path
    Diagnose {
        path: String,
        /// Key stored for the requested image
        #[arg(long)]
        image_key: Option<String>,
    },
    /// Sign a path and request it through a running guard
    Probe {
        path: String,
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { path } => {
            println!("{}", sign(&cli.key, &path));
        }
        Commands::Diagnose { path, image_key } => {
            let mut request = SignedRequest::parse(&path)?;
            let mut repair = SignatureRepair::new(Arc::new(HmacSha1Factory), cli.key.as_bytes());

            if let Some(image_key) = image_key {
                let store = InMemoryKeyStore::new();
                store.insert(request.image(), image_key.into_bytes());
                repair = repair.with_key_store(Arc::new(store), Duration::from_secs(1));
            }

            let outcome = repair.apply(&mut request).await;
            match outcome {
                CascadeOutcome::Unsigned => println!("unsigned request, nothing to validate"),
                CascadeOutcome::Accepted { stage, key } => {
                    println!("accepted at stage {} with {} key", stage.as_str(), key.as_str());
                }
                CascadeOutcome::Exhausted => println!("no candidate validated"),
            }
            println!("path: {}", request.path());
            println!("image: {}", request.image());
        }
        Commands::Probe { path, url } => {
            let signed = sign(&cli.key, &path);
            let res = reqwest::Client::new()
                .get(format!("{}{}", url.trim_end_matches('/'), signed))
                .send()
                .await?;

            println!("GET {}", signed);
            println!("status: {}", res.status());
            if let Some(request_id) = res.headers().get("x-request-id") {
                println!("request id: {}", request_id.to_str().unwrap_or("<binary>"));
            }
            if let Some(content_type) = res.headers().get(reqwest::header::CONTENT_TYPE) {
                println!("content type: {}", content_type.to_str().unwrap_or("<binary>"));
            }
        }
    }

    Ok(())
}

fn sign(key: &str, path: &str) -> String {
    let payload = path.trim_start_matches('/');
    format!("/{}/{}", HmacSha1Signer::new(key).signature(payload), payload)
}
