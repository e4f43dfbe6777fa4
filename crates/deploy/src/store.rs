//! File-backed record store for the CLI.
//!
//! One JSON document per line, appended on create. Good enough for a
//! single-host CLI; a real service would put a database behind the
//! [`RecordSink`] seam instead.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use anyhow::Context;

use crate::record::{DeploymentRecord, NewDeploymentRecord, RecordSink};

/// Append-only JSONL deployment record store.
pub struct JsonlStore {
    path: PathBuf,
    // Serializes appends within this process. Cross-process writers are not
    // coordinated.
    write_lock: Mutex<()>,
}

impl JsonlStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> anyhow::Result<Vec<DeploymentRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("malformed record in {}", self.path.display()))
            })
            .collect()
    }
}

#[async_trait]
impl RecordSink for JsonlStore {
    async fn create(&self, record: NewDeploymentRecord) -> anyhow::Result<DeploymentRecord> {
        let stored = DeploymentRecord {
            id: Uuid::new_v4().to_string(),
            user: record.user,
            repo_url: record.repo_url,
            image_name: record.image_name,
            service_url: record.service_url,
            status: record.status,
            deployed_at: record.deployed_at,
        };

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(&stored).context("failed to encode record")?;
        line.push('\n');

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;

        Ok(stored)
    }

    async fn find(&self, user: &str) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.user == user)
            .collect())
    }
}
