use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::build_pipeline;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Question to answer from the indexed documents
    #[arg(required = true)]
    pub question: String,

    /// Number of chunks to retrieve (overrides retrieval.top_k)
    #[arg(long, short = 'k')]
    pub top_k: Option<u32>,

    /// Print the retrieved chunks with the answer
    #[arg(long, short = 's')]
    pub sources: bool,
}

pub async fn handle_query(args: QueryArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }

    let pipeline = build_pipeline(&config)
        .await
        .context("failed to initialize pipeline")?;
    let answer = pipeline
        .answer(&args.question)
        .await
        .context("query failed")?;

    let formatter = get_formatter(format);
    print!("{}", formatter.format_answer(&answer, args.sources));
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}
