//! Remote store, local archive, or both

use crate::{ArchiveNames, LocalArchive, RestDocumentStore, StoreError};
use async_trait::async_trait;
use ledgermail_domain::{DocumentSink, DocumentUpload, SinkReceipt};
use tracing::warn;

/// Sink writing to the remote store and/or a local archive.
///
/// With both configured the remote store is authoritative: its receipt is
/// returned and a failed local mirror write is only logged. Both copies are
/// named from one timestamp.
#[derive(Debug, Clone)]
pub struct ArchiveSink {
    remote: Option<RestDocumentStore>,
    local: Option<LocalArchive>,
}

impl ArchiveSink {
    /// Create a sink. At least one target is required.
    pub fn new(
        remote: Option<RestDocumentStore>,
        local: Option<LocalArchive>,
    ) -> Result<Self, StoreError> {
        if remote.is_none() && local.is_none() {
            return Err(StoreError::Config(
                "neither a remote store nor a local archive is configured".to_string(),
            ));
        }
        Ok(Self { remote, local })
    }

    /// Remote store only
    pub fn remote(store: RestDocumentStore) -> Self {
        Self {
            remote: Some(store),
            local: None,
        }
    }

    /// Local archive only
    pub fn local(archive: LocalArchive) -> Self {
        Self {
            remote: None,
            local: Some(archive),
        }
    }

    /// Remote store, if configured
    pub fn remote_store(&self) -> Option<&RestDocumentStore> {
        self.remote.as_ref()
    }

    /// Local archive, if configured
    pub fn local_archive(&self) -> Option<&LocalArchive> {
        self.local.as_ref()
    }
}

#[async_trait]
impl DocumentSink for ArchiveSink {
    type Error = StoreError;

    async fn persist(&self, upload: &DocumentUpload<'_>) -> Result<SinkReceipt, StoreError> {
        match (&self.remote, &self.local) {
            (Some(remote), Some(local)) => {
                let names = ArchiveNames::now(upload.original_filename);
                let receipt = remote.persist_as(upload, &names).await?;
                if let Err(e) = local.persist_as(upload, &names).await {
                    warn!(
                        "Local mirror of {} failed: {}",
                        upload.original_filename, e
                    );
                }
                Ok(receipt)
            }
            (Some(remote), None) => remote.persist(upload).await,
            (None, Some(local)) => local.persist(upload).await,
            (None, None) => Err(StoreError::Config("no storage target".to_string())),
        }
    }
}
