use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Fadebin paste server.
#[derive(Parser, Debug)]
#[clap(name = "fadebin-server", version, about)]
pub struct Config {
    /// Address to listen on.
    #[clap(long, env = "FADEBIN_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,
    /// Directory holding the paste database.
    #[clap(long, env = "FADEBIN_DB_PATH", default_value = "database")]
    pub db_path: PathBuf,
    /// Keep pastes in memory only, ignoring `--db-path`.
    #[clap(long, env = "FADEBIN_EPHEMERAL")]
    pub ephemeral: bool,
    /// Base of generated share links. Defaults to the request's origin.
    #[clap(long, env = "FADEBIN_BASE_URL")]
    pub base_url: Option<String>,
    /// Upper bound on a single storage operation, in milliseconds.
    #[clap(long, env = "FADEBIN_STORE_TIMEOUT_MS", default_value_t = 5_000)]
    pub store_timeout_ms: u64,
    /// Seconds between sweeps for expired pastes; 0 disables sweeping.
    #[clap(long, env = "FADEBIN_SWEEP_INTERVAL", default_value_t = crate::time::FIVE_MINUTES.as_secs())]
    pub sweep_interval: u64,
}

impl Config {
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub const fn sweep_interval(&self) -> Option<Duration> {
        match self.sweep_interval {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
