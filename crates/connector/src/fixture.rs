//! Recorded responses on disk, one `<isrc>.json` per identifier.

use std::path::PathBuf;

use async_trait::async_trait;
use streamwatch_core::{FetchOutcome, FetchQuery};

use crate::Fetcher;

/// Serves responses from a directory. The query window is ignored.
#[derive(Debug, Clone)]
pub struct FixtureFetcher {
    dir: PathBuf,
}

impl FixtureFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, isrc: &str) -> PathBuf {
        self.dir.join(format!("{isrc}.json"))
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, isrc: &str, _query: &FetchQuery) -> FetchOutcome {
        let path = self.path_for(isrc);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return FetchOutcome::failed(format!("no recorded response at {}", path.display()));
            }
            Err(e) => {
                return FetchOutcome::failed(format!("failed to read {}: {e}", path.display()));
            }
        };

        if text.trim().is_empty() {
            return FetchOutcome::Empty;
        }
        match serde_json::from_str(&text) {
            Ok(body) => FetchOutcome::from_body(body),
            Err(e) => FetchOutcome::failed(format!("invalid JSON in {}: {e}", path.display())),
        }
    }
}
