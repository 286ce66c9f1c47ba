use clap::Parser;
use std::io::Read;
use triage_flow::app;
use triage_flow::config::DEFAULT_CONFIG_FILE;
use triage_flow::utils::{logger, validation::Validate};
use triage_flow::{AppConfig, TriageError, TriageRequest};

/// Runs a single triage request through the full pipeline and prints the decision as JSON.
#[derive(Debug, Parser)]
#[command(name = "triage-once")]
#[command(about = "Assess one symptom description and print the decision")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Symptom description; read from stdin when omitted
    description: Option<String>,

    /// Optional image reference passed through with the request
    #[arg(long)]
    image_reference: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = AppConfig::load_or_default(&args.config)?.with_api_key_from_env();
    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let description = match args.description {
        Some(description) => description,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut request = TriageRequest::new(description);
    if let Some(image_reference) = args.image_reference {
        request = request.with_image_reference(image_reference);
    }

    let service = match app::build_service(&config) {
        Ok(service) => service,
        Err(e) if e.is_unavailable() => {
            eprintln!("❌ Triage service unavailable: {}", e);
            std::process::exit(3);
        }
        Err(e) => return Err(e.into()),
    };

    let result = service.assess(request).await;
    service.drain().await;

    match result {
        Ok(decision) => {
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        Err(TriageError::ValidationError { message }) => {
            eprintln!("❌ {}", message);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
