mod config;
mod ingest;
mod query;
mod serve;

pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use query::QueryArgs;
pub use serve::ServeArgs;

pub use config::handle_config;
pub use ingest::handle_ingest;
pub use query::handle_query;
pub use serve::handle_serve;
