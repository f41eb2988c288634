mod analysis;
mod api;
mod commands;
mod config;
mod display;
mod probe;
mod state;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use api::{ApiClient, ClientOptions, Credential, NewRecord, ResourceClient};
use commands::ConsoleCommand;
use config::{Overrides, Settings};
use state::Session;

/// Management console for an MSP gateway collection.
#[derive(Parser, Debug)]
#[command(name = "msp-console", version)]
struct Cli {
    /// Gateway base URL [env: MSP_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API key sent in the x-msp-api-key header [env: MSP_API_KEY]
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Collection to manage [env: MSP_COLLECTION]
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Request timeout in seconds [env: MSP_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all records
    List,
    /// Show one record
    Get { id: String },
    /// Create a record
    Create {
        email: String,
        password: String,
        display_name: String,
        /// Provenance tag (direct, api, portal, ...)
        #[arg(long)]
        via: Option<String>,
    },
    /// Change only the given fields of a record
    Update {
        id: String,
        /// field=value pairs; values that parse as JSON keep their type
        fields: Vec<String>,
    },
    /// Delete a record
    Delete { id: String },
    /// Interactive console with a cached record list
    Shell,
    /// Diagnose connectivity: try URL shapes and main endpoints
    Probe {
        /// API key (overrides --api-key / MSP_API_KEY; prompted when absent)
        key: Option<String>,
        /// Additional absolute URL to try
        #[arg(long = "candidate")]
        candidates: Vec<String>,
    },
    /// Submit email content for analysis
    Analyze {
        /// Email content; read from stdin when omitted
        #[arg(long)]
        text: Option<String>,
        /// Analysis endpoint path
        #[arg(long, default_value = analysis::DEFAULT_ANALYZE_PATH)]
        path: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env is fine; the environment and flags still apply.
    let _ = dotenvy::dotenv();

    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, String> {
    let probe_key = match &cli.command {
        Command::Probe { key, .. } => key.clone(),
        _ => None,
    };
    let settings = Settings::load(Overrides {
        api_url: cli.api_url,
        api_key: probe_key.or(cli.api_key),
        collection: cli.collection,
        timeout_secs: cli.timeout,
    })
    .map_err(|e| e.to_string())?;

    log::info!("Using gateway {} (collection /{})", settings.api_url, settings.collection);

    match cli.command {
        Command::Probe { candidates, .. } => {
            let raw_key = match settings.api_key.clone() {
                Some(key) => key,
                None => prompt("Enter your MSP API key: ").await?,
            };
            let credential = Credential::new(&raw_key).map_err(|e| e.to_string())?;
            let api = build_api(&settings, &credential)?;

            let mut stdout = std::io::stdout();
            let passed = probe::run(&api, &credential, &settings.collection, &candidates, &mut stdout)
                .await
                .map_err(|e| e.to_string())?;
            Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Analyze { text, path } => {
            let credential = credential(&settings)?;
            let api = build_api(&settings, &credential)?;
            let content = match text {
                Some(text) => text,
                None => read_stdin().await?,
            };
            let result = analysis::analyze(&api, &path, &content)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", display::value_table(&result));
            Ok(ExitCode::SUCCESS)
        }
        Command::Shell => {
            let mut session = session(&settings)?;
            let input = BufReader::new(tokio::io::stdin());
            commands::run_shell(&mut session, input, &mut std::io::stdout())
                .await
                .map_err(|e| e.to_string())?;
            Ok(ExitCode::SUCCESS)
        }
        one_shot => {
            let command = console_command(one_shot)?;
            let mut session = session(&settings)?;
            let text = commands::execute(&mut session, &command).await?;
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Map a one-shot subcommand onto the console command it runs.
fn console_command(command: Command) -> Result<ConsoleCommand, String> {
    Ok(match command {
        Command::List => ConsoleCommand::List { refresh: true },
        Command::Get { id } => ConsoleCommand::Get { id },
        Command::Create {
            email,
            password,
            display_name,
            via,
        } => {
            let record = NewRecord::new(&email, &password, &display_name);
            ConsoleCommand::Create(match via {
                Some(tag) => record.with_create_via(&tag),
                None => record,
            })
        }
        Command::Update { id, fields } => {
            let pairs: Vec<&str> = fields.iter().map(String::as_str).collect();
            ConsoleCommand::Update {
                id,
                fields: commands::parse_assignments(&pairs)?,
            }
        }
        Command::Delete { id } => ConsoleCommand::Delete { id },
        Command::Shell | Command::Probe { .. } | Command::Analyze { .. } => {
            return Err("not a one-shot console command".to_string())
        }
    })
}

fn credential(settings: &Settings) -> Result<Credential, String> {
    let raw = settings
        .api_key
        .as_deref()
        .ok_or_else(|| "No API key provided (set MSP_API_KEY or pass --api-key)".to_string())?;
    Credential::new(raw).map_err(|e| e.to_string())
}

fn build_api(settings: &Settings, credential: &Credential) -> Result<ApiClient, String> {
    ApiClient::new(
        &settings.api_url,
        credential,
        ClientOptions::with_timeout(settings.timeout),
    )
    .map_err(|e| e.to_string())
}

fn session(settings: &Settings) -> Result<Session, String> {
    let credential = credential(settings)?;
    let api = build_api(settings, &credential)?;
    Ok(Session::new(ResourceClient::new(api, &settings.collection)))
}

async fn prompt(message: &str) -> Result<String, String> {
    use std::io::Write;

    print!("{}", message);
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| format!("Failed to read API key: {}", e))?;
    Ok(line.trim().to_string())
}

async fn read_stdin() -> Result<String, String> {
    let mut content = String::new();
    tokio::io::stdin()
        .read_to_string(&mut content)
        .await
        .map_err(|e| format!("Failed to read email content from stdin: {}", e))?;
    Ok(content)
}
