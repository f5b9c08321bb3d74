use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write the default configuration file")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Show the configuration file path")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(format),
    }
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config path"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default()
        .save()
        .context("failed to write config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = redacted(Config::load()?);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path().filter(|p| p.exists()) {
        println!("# Config file: {}", path.display());
    } else {
        println!("# No config file, using defaults and environment");
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path(format: OutputFormat) -> Result<()> {
    let path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config path"))?;
    let state = if path.exists() { "active" } else { "would be" };

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "path": path, "exists": path.exists() })
        );
    } else {
        println!("Config ({}): {}", state, path.display());
    }
    Ok(())
}

/// Mask secrets before printing.
fn redacted(mut config: Config) -> Config {
    let mask = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some("********".to_string());
        }
    };
    mask(&mut config.embedding.api_key);
    mask(&mut config.generation.api_key);
    mask(&mut config.vector_store.api_key);
    mask(&mut config.vector_store.pinecone_api_key);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = Config::default();
        config.embedding.api_key = Some("sk-secret".to_string());
        config.vector_store.pinecone_api_key = Some("pc-secret".to_string());

        let shown = redacted(config);
        assert_eq!(shown.embedding.api_key.as_deref(), Some("********"));
        assert_eq!(shown.vector_store.pinecone_api_key.as_deref(), Some("********"));
        assert!(shown.generation.api_key.is_none());
    }
}
