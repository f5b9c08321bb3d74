use anyhow::{Context, Result};
use clap::Args;

use crate::models::Config;
use crate::server;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind (overrides BACKEND_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides BACKEND_PORT)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    server::run(config).await.context("server error")
}
