//! Startup configuration.
//!
//! An explicit struct passed to the listener at startup; there is no
//! ambient configuration and no config file. Every value can come from a
//! command-line flag or a `PARROT_*` environment variable, flags winning.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "parrot")]
#[command(version)]
#[command(about = "Catch-all HTTP listener that logs every request", long_about = None)]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "PARROT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PARROT_PORT", default_value_t = 4567)]
    pub port: u16,

    /// Maximum number of connection-handling threads
    #[arg(short = 'w', long, env = "PARROT_WORKERS", default_value_t = 512)]
    pub workers: usize,

    /// Log level for operational logging (trace, debug, info, warn, error)
    #[arg(long, env = "PARROT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn load() -> Self {
        Config::parse()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
