//! memagent CLI
//!
//! Interactive chat with long-term memory, plus configuration and
//! maintenance commands.

use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use memagent::agent::ChatClient;
use memagent::config::{
    config_path, save_config, validate_config, Config, OpenAIConfig, StoreBackendType,
};
use memagent::database::{connect_store, init_pool_for_migrations, migrations};
use memagent::memory::{CachedEmbedder, Embedder, EmbeddingService};
use memagent::{Error, MemoryOrchestrator, Result, VERSION};
use secrecy::SecretString;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "memagent",
    version = VERSION,
    about = "memagent - a conversational agent with long-term memory",
    long_about = None
)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat {
        /// Vector store backend (qdrant, postgres, memory)
        #[arg(long)]
        store: Option<StoreBackendType>,
    },

    /// Check configuration and service health
    Status,

    /// Run PostgreSQL migrations
    Migrate,

    /// Write a sample configuration file
    InitConfig {
        /// Overwrite an existing file without asking
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Chat { store }) => chat(store).await,
        Some(Commands::Status) => check_status().await,
        Some(Commands::Migrate) => run_migrations().await,
        Some(Commands::InitConfig { force }) => init_config(force),
        None => chat(None).await,
    }
}

/// Logs go to stderr so chat output on stdout stays clean
fn init_logging(verbose: bool) {
    let default = if verbose { "memagent=debug" } else { "memagent=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Load config and refuse to start on validation errors
fn load_checked_config(store: Option<StoreBackendType>) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(backend) = store {
        config.storage.backend = backend;
    }

    let result = validate_config(&config);
    for issue in &result.warnings {
        warn!("{}", issue);
    }
    if !result.valid {
        for issue in &result.errors {
            eprintln!("{} {}", style("✗").red(), issue);
        }
        return Err(Error::Config("Invalid configuration. Run `memagent status` for details.".into()));
    }

    Ok(config)
}

/// Interactive chat loop
async fn chat(store: Option<StoreBackendType>) -> Result<()> {
    let config = load_checked_config(store)?;

    let llm = Arc::new(ChatClient::new(config.provider.resolve()?)?);
    let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
        Arc::new(EmbeddingService::new(&config.storage.embedding)?),
        config.storage.embedding.cache_capacity,
    ));
    let store = connect_store(&config.storage).await?;
    let agent = MemoryOrchestrator::new(llm, embedder, store, config.agent.clone())?;

    let mut session = agent.open_session().await?;

    println!("{}", style("--- Conversational Memory Agent ---").cyan().bold());
    println!("Welcome! Your session ID is: {}", style(session.id()).yellow());
    println!("Type '{}' to exit.", style("quit").yellow());

    let stdin = io::stdin();
    loop {
        print!("\n{} ", style("You:").green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        println!("{} Thinking...", style("Bot:").cyan().bold());
        match agent.handle_user_message(&mut session, input).await {
            Ok(report) => println!("{} {}", style("Bot:").cyan().bold(), report.render()),
            Err(e) => {
                error!("Ending session: {}", e);
                return Err(e);
            }
        }
    }

    println!("Goodbye!");
    agent.close_session(session).await?;
    Ok(())
}

/// Check configuration and service health
async fn check_status() -> Result<()> {
    println!("{}\n", style("memagent status").bold());

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            println!("Configuration: {} {}", style("✗").red(), e);
            return Ok(());
        }
    };

    let result = validate_config(&config);
    if result.valid {
        println!("Configuration: {} Loaded", style("✓").green());
    } else {
        println!("Configuration: {} Invalid", style("✗").red());
    }
    for issue in &result.errors {
        println!("  {} {}", style("error:").red(), issue);
    }
    for issue in &result.warnings {
        println!("  {} {}", style("warning:").yellow(), issue);
    }

    match config.provider.resolve() {
        Ok(endpoint) => println!(
            "Language model: {} {} ({})",
            style("✓").green(),
            endpoint.model,
            endpoint.provider
        ),
        Err(e) => println!("Language model: {} {}", style("✗").red(), e),
    }

    println!(
        "Embeddings: {} ({} dimensions)",
        config.storage.embedding.model, config.storage.embedding.dimensions
    );

    let backend = config.storage.backend;
    match connect_store(&config.storage).await {
        Ok(store) => match store.health_check().await {
            Ok(true) => println!("Vector store ({}): {} Healthy", backend, style("✓").green()),
            Ok(false) => println!("Vector store ({}): {} Unhealthy", backend, style("✗").red()),
            Err(e) => println!("Vector store ({}): {} {}", backend, style("✗").red(), e),
        },
        Err(e) => println!("Vector store ({}): {} {}", backend, style("✗").red(), e),
    }

    Ok(())
}

/// Run database migrations
async fn run_migrations() -> Result<()> {
    println!("Running database migrations...\n");

    let config = Config::from_env()?;
    let postgres = config
        .storage
        .postgres
        .as_ref()
        .ok_or_else(|| Error::Config("PostgreSQL not configured for migrations. Set DATABASE_URL.".into()))?;
    // Skip the pgvector check; the migrations create it
    let pool = init_pool_for_migrations(postgres).await?;

    migrations::run(&pool, config.storage.embedding.dimensions).await?;

    println!("\n{} Migrations complete!", style("✓").green());
    Ok(())
}

/// Write a sample configuration file
fn init_config(force: bool) -> Result<()> {
    let path = config_path();

    if path.exists() && !force {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()
            .map_err(|e| Error::Config(format!("Input error: {}", e)))?;
        if !overwrite {
            println!("Keeping existing configuration.");
            return Ok(());
        }
    }

    let mut config = Config::default();
    config.provider.openai = Some(OpenAIConfig::with_api_key(SecretString::from(String::new())));
    save_config(&config, &path)?;

    println!("{} Wrote {}", style("✓").green(), path.display());
    println!("API keys are never written to the file. Set OPENAI_API_KEY in the environment or a .env file.");
    Ok(())
}
