use anyhow::Result;
use console::style;

use super::{Config, OpenAiConfig};

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    match config.openai.api_url() {
        Ok(url) => eprintln!("  API URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  API URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
    eprintln!("  Temperature: {}", style(config.openai.temperature).cyan());
    eprintln!("  Batch Size: {}", style(config.openai.batch_size).cyan());
    eprintln!("  Timeout: {}s", style(config.openai.timeout_secs).cyan());
    eprintln!("  Max Retries: {}", style(config.openai.max_retries).cyan());
    if OpenAiConfig::api_key_present() {
        eprintln!("  API Key: {}", style("set").green());
    } else {
        eprintln!("  API Key: {}", style("not set").red());
    }

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Chunk Size: {} chars",
        style(config.chunking.chunk_size).cyan()
    );
    eprintln!(
        "  Chunk Overlap: {} chars",
        style(config.chunking.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "Data directory: {}",
        style(config.data_dir_path().display()).dim()
    );
    eprintln!(
        "Vector store: {}",
        style(config.vector_database_path().display()).dim()
    );
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}
