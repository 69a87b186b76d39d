use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing::warn;

use notes_rag::chat::{
    ChannelLines, ConversationalRetrievalChain, FAREWELL, SessionEnd, run_until_interrupted,
};
use notes_rag::config::{Config, OpenAiConfig, show_config};
use notes_rag::database::{LanceVectorStore, VectorStore};
use notes_rag::ingest::Ingestor;
use notes_rag::openai::OpenAiClient;
use notes_rag::retrieval::Retriever;

#[derive(Parser)]
#[command(name = "notes-rag")]
#[command(about = "Chat with your text and PDF notes using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every .txt and .pdf file in the data directory into the vector store
    Ingest,
    /// Start an interactive chat over the ingested notes
    Chat,
    /// Show the current configuration
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
        .and_then(|runtime| {
            let result = runtime.block_on(run(cli.command));
            // an interrupted chat may leave a blocking call in flight
            runtime.shutdown_background();
            result
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Ingest => {
            let stats = Ingestor::new(Config::load_default()?)?.run().await?;
            println!(
                "Ingested {} chunk(s) from {} file(s) in {:.1?}",
                stats.chunks, stats.files, stats.duration
            );
        }
        Commands::Chat => chat(Config::load_default()?).await?,
        Commands::Config { init } => {
            if init {
                init_config()?;
            }
            show_config(&Config::load_default()?)?;
        }
    }

    Ok(())
}

async fn chat(config: Config) -> Result<()> {
    let client = OpenAiClient::new(&config.openai, OpenAiConfig::api_key()?)?;

    let store = LanceVectorStore::open(&config.vector_database_path()).await?;
    if store.count().await? == 0 {
        warn!(
            "Vector store at {} is empty, run `notes-rag ingest` first",
            store.path().display()
        );
    }

    let retriever = Retriever::new(client.clone(), store, config.retrieval.top_k);
    let chain = ConversationalRetrievalChain::new(client, retriever);

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let end = run_until_interrupted(
        chain,
        ChannelLines::stdin()?,
        std::io::stdout(),
        interrupt,
    )
    .await?;

    if let SessionEnd::Interrupted = end {
        println!();
        println!("{}", FAREWELL);
    }

    Ok(())
}

fn init_config() -> Result<()> {
    let config = Config::with_base_dir(Config::resolve_base_dir()?);
    let path = config.config_file_path();

    if path.exists() {
        eprintln!(
            "{} {}",
            style("Config file already exists:").yellow(),
            path.display()
        );
    } else {
        config.save()?;
        eprintln!("{} {}", style("Wrote").green(), path.display());
    }

    Ok(())
}
