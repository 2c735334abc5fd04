use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use warp::http::{HeaderMap, Method};

/// Entries waiting for the writer before new ones are dropped.
const QUEUE_DEPTH: usize = 1024;

/// Appends one line per request: date, method, path, headers as JSON.
///
/// Entries are formatted on the calling thread and handed to a single writer
/// task, which appends them on the blocking pool in arrival order.
#[derive(Debug, Clone)]
pub struct AccessLog {
    tx: mpsc::Sender<String>,
}

impl AccessLog {
    /// Spawns the writer task, so this must run inside a tokio runtime.
    pub fn new(path: &Path) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(write_entries(path.to_path_buf(), rx));
        Self { tx }
    }

    /// Never fails or blocks the request; write errors are only reported.
    pub fn record(&self, method: &Method, path: &str, headers: &HeaderMap) {
        let entry = format_entry(Local::now(), method, path, headers);

        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("access log queue full, dropping entry for {} {}", method, path),
            Err(TrySendError::Closed(_)) => warn!("access log writer stopped, dropping entry for {} {}", method, path),
        }
    }
}

async fn write_entries(path: PathBuf, mut rx: mpsc::Receiver<String>) {
    while let Some(first) = rx.recv().await {
        let mut batch = first;
        while let Ok(next) = rx.try_recv() {
            batch.push_str(&next);
        }

        let target = path.clone();
        match tokio::task::spawn_blocking(move || append(&target, &batch)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("failed to write access log {}: {}", path.display(), e),
            Err(e) => warn!("access log write task failed: {}", e),
        }
    }
}

fn append(path: &Path, text: &str) -> io::Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(text.as_bytes())
}

/// Repeated headers are joined with ", " under one key.
pub fn format_entry(at: DateTime<Local>, method: &Method, path: &str, headers: &HeaderMap) -> String {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_owned(), Value::String(joined));
    }

    format!(
        "{} {} {} {}\n",
        at.format("%d-%m-%Y %H:%M:%S"),
        method,
        path,
        Value::Object(map)
    )
}
