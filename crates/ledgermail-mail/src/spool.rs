//! Spool-directory mailbox
//!
//! Messages are `.eml` files dropped into `<root>/incoming/`. Moving a file to
//! `<root>/processed/` is the checkpoint: it is never returned again.

use crate::MailError;
use async_trait::async_trait;
use ledgermail_domain::{InboundMessage, MessageSource};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Unprocessed messages
pub const INCOMING_DIR: &str = "incoming";

/// Checkpointed messages
pub const PROCESSED_DIR: &str = "processed";

/// Mailbox backed by a spool directory
#[derive(Debug)]
pub struct SpoolMailbox {
    incoming: PathBuf,
    processed: PathBuf,
}

impl SpoolMailbox {
    /// Open (creating if needed) the spool at `root`
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, MailError> {
        let root = root.as_ref();
        let incoming = root.join(INCOMING_DIR);
        let processed = root.join(PROCESSED_DIR);
        fs::create_dir_all(&incoming).await?;
        fs::create_dir_all(&processed).await?;
        info!("Spool mailbox opened at {}", root.display());
        Ok(Self {
            incoming,
            processed,
        })
    }

    /// Directory holding unprocessed messages
    pub fn incoming_dir(&self) -> &Path {
        &self.incoming
    }

    /// Directory holding checkpointed messages
    pub fn processed_dir(&self) -> &Path {
        &self.processed
    }

    fn incoming_path(&self, id: &str) -> Result<PathBuf, MailError> {
        // Ids are bare file names handed out by fetch_new
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(MailError::UnknownMessage(id.to_string()));
        }
        Ok(self.incoming.join(id))
    }
}

#[async_trait]
impl MessageSource for SpoolMailbox {
    type Error = MailError;

    async fn fetch_new(&mut self) -> Result<Vec<InboundMessage>, MailError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.incoming).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_eml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("eml"));
            if !is_eml || !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();

        let mut messages = Vec::with_capacity(names.len());
        for id in names {
            let raw = fs::read(self.incoming.join(&id)).await?;
            messages.push(InboundMessage { id, raw });
        }

        debug!("Spool holds {} new messages", messages.len());
        Ok(messages)
    }

    async fn mark_processed(&mut self, id: &str) -> Result<(), MailError> {
        let from = self.incoming_path(id)?;
        if !fs::try_exists(&from).await? {
            return Err(MailError::UnknownMessage(id.to_string()));
        }
        fs::rename(&from, self.processed.join(id)).await?;
        debug!("Checkpointed {}", id);
        Ok(())
    }
}
