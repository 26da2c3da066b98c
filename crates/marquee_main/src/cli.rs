use std::path::PathBuf;

use clap::Parser;
use marquee_domain::{Environment, SessionId, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "marquee", version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Question to answer without entering interactive mode.
    #[arg(long, short = 'p')]
    pub prompt: Option<String>,

    /// Session whose history the questions continue.
    #[arg(long)]
    pub session: Option<String>,

    /// JSON or NDJSON file of movies to query instead of the configured
    /// store.
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Print each response as a JSON object with `answer` and `chart`.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log at debug level.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn session(&self) -> Option<SessionId> {
        self.session.as_deref().map(SessionId::new)
    }

    /// Applies command line overrides on top of the resolved environment.
    pub fn apply(&self, environment: Environment) -> Environment {
        match &self.dataset {
            Some(path) => environment.store(StoreConfig::Dataset(path.clone())),
            None => environment,
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "marquee=debug" } else { "marquee=info" }
    }
}
