use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

use voxroute::MasterRouter;
use voxroute::classifier::{IntentClassifier, LlmClassifier, StaticClassifier};
use voxroute::domain::{HandlerResponse, Organ};
use voxroute::handlers::{BrowserLauncher, RecordingLauncher, SystemBrowser};
use voxroute::llm::{AnthropicClient, LlmClient, ToolCall};
use voxroute::router::{MEDICAL_TOOL, NAVIGATE_TOOL};
use voxroute::store::DomainStore;
use voxroute::tools::HttpDataProvider;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxroute")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("voxroute.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn load_store(config: &Config) -> Result<Arc<DomainStore>> {
    let store = match &config.registry {
        Some(path) => DomainStore::from_file(path).context(format!("Failed to load registry {}", path.display()))?,
        None => DomainStore::builtin(),
    };
    Ok(store.shared())
}

fn llm_client(config: &Config) -> Result<Arc<dyn LlmClient>> {
    let client = AnthropicClient::new(config.llm.to_anthropic()).context("Failed to create LLM client")?;
    Ok(Arc::new(client))
}

fn build_router(
    cli: &Cli,
    config: &Config,
    store: Arc<DomainStore>,
    client: Option<Arc<dyn LlmClient>>,
) -> Result<MasterRouter> {
    let classifier: Arc<dyn IntentClassifier> = match client {
        Some(client) => Arc::new(LlmClassifier::new(client).with_store(&store)),
        // Direct handler commands never classify
        None => Arc::new(StaticClassifier::failing("classifier not configured for this command")),
    };

    let launcher: Arc<dyn BrowserLauncher> = if cli.dry_run || !config.browser.enabled {
        Arc::new(RecordingLauncher::new())
    } else {
        Arc::new(SystemBrowser)
    };

    let provider = Arc::new(
        HttpDataProvider::new(Duration::from_millis(config.providers.timeout_ms))
            .context("Failed to create HTTP client")?,
    );

    Ok(MasterRouter::new(
        store,
        classifier,
        launcher,
        provider.clone(),
        provider,
        config.router_settings(),
    ))
}

fn print_response(response: &HandlerResponse) -> Result<()> {
    let json = response.to_json().context("Failed to serialize response")?;
    let status = if response.is_error() {
        response.type_name().red()
    } else {
        response.type_name().green()
    };
    eprintln!("{} {}", "Result:".bold(), status);
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        eprintln!("{}", "Verbose mode enabled".yellow());
    }

    let store = load_store(config)?;
    let client = if cli.needs_classifier() {
        Some(llm_client(config)?)
    } else {
        None
    };

    match &cli.command {
        Some(Commands::Tools) => {
            for tool in store.tools.all() {
                let params: Vec<&str> = tool.params.iter().map(|p| p.name.as_str()).collect();
                println!("{}({})  {}", tool.name.cyan(), params.join(", "), tool.description);
            }
            Ok(())
        }
        Some(Commands::Pages) => {
            for page in store.pages.all() {
                println!("{}  {}", page.name.cyan(), page.url);
            }
            Ok(())
        }
        Some(Commands::Sites { organ }) => {
            let organs = match organ {
                Some(name) => vec![Organ::parse(name).ok_or_else(|| eyre::eyre!("Unknown organ: {}", name))?],
                None => Organ::ALL.to_vec(),
            };
            for organ in organs {
                println!("{}", organ.to_string().cyan());
                for site in store.medical.valid_sites(organ) {
                    println!("  {}", site);
                }
            }
            Ok(())
        }
        Some(Commands::Route {
            utterance,
            function_call,
        }) => {
            let router = build_router(cli, config, store, client.clone())?;
            let utterance = utterance.join(" ");
            let response = match client {
                Some(client) if *function_call => router.route_function_call(client.as_ref(), &utterance).await,
                _ => router.route(&utterance).await,
            };
            print_response(&response)
        }
        Some(Commands::Navigate { page }) => {
            let router = build_router(cli, config, store, client)?;
            let call = ToolCall::new("cli", NAVIGATE_TOOL, serde_json::json!({ "page_name": page }));
            print_response(&router.dispatch(&call).await)
        }
        Some(Commands::Medical { text }) => {
            let router = build_router(cli, config, store, client)?;
            let call = ToolCall::new("cli", MEDICAL_TOOL, serde_json::json!({ "user_query": text.join(" ") }));
            print_response(&router.dispatch(&call).await)
        }
        Some(Commands::Tool { name, params }) => {
            let router = build_router(cli, config, store, client)?;
            let input = voxroute::router::params_from_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let call = ToolCall::new("cli", name.as_str(), serde_json::Value::Object(input));
            print_response(&router.dispatch(&call).await)
        }
        None => {
            let router = build_router(cli, config, store, client)?;
            run_interactive(&router).await
        }
    }
}

/// Route one utterance per stdin line until EOF
async fn run_interactive(router: &MasterRouter) -> Result<()> {
    info!("Reading utterances from stdin");
    eprintln!("{}", "Listening for utterances (Ctrl-D to quit)".cyan());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", ">".bold());
        io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        print_response(&router.route(utterance).await)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
