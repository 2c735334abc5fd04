use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;
use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Movie records over HTTP, stored in a flat JSON file", long_about = None)]
pub struct Config {
    /// Address the HTTP API binds to
    #[arg(long, env = "MARQUEE_ADDR", default_value = "0.0.0.0:3200")]
    pub addr: SocketAddr,

    /// JSON file holding the movie collection
    #[arg(long, env = "MARQUEE_DATA_FILE", default_value = "movies.json")]
    pub data_file: PathBuf,

    /// File receiving one line per request
    #[arg(long, env = "MARQUEE_ACCESS_LOG", default_value = "access_log.txt")]
    pub access_log: PathBuf,

    /// Address recorded instead of a loopback client address
    #[arg(long, env = "MARQUEE_LOOPBACK_PLACEHOLDER", default_value = "192.168.20.123")]
    pub loopback_placeholder: String,

    /// Runtime worker threads (default: one per logical core)
    #[arg(long, env = "MARQUEE_WORKERS")]
    pub workers: Option<usize>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MARQUEE_BODY_LIMIT", default_value = "65536")]
    pub body_limit: u64,
}

impl Config {
    pub fn worker_threads(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}
