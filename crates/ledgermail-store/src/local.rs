//! Local disk archive
//!
//! Layout: `<root>/<primary folder id>/<timestamp>_<name>.pdf` with the derived
//! JSON written next to it as `<timestamp>_<stem>.json`. Files are created
//! exclusively; a name already on disk gets a `_<n>` suffix instead.

use crate::naming::{sanitize_filename, ArchiveNames};
use crate::StoreError;
use async_trait::async_trait;
use ledgermail_domain::{DocumentSink, DocumentUpload, SinkReceipt};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Suffixes tried before giving up on a name
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A stored document read back together with its JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedPair {
    /// Document file name
    pub name: String,
    /// Document bytes
    pub pdf: Vec<u8>,
    /// Derived JSON
    pub json: Value,
}

/// Archive rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
}

impl LocalArchive {
    /// Archive rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Archive root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `upload` under `names`, or under the first free
    /// [`ArchiveNames::with_suffix`] variant when another document already
    /// holds them. Existing files are never overwritten.
    pub async fn persist_as(
        &self,
        upload: &DocumentUpload<'_>,
        names: &ArchiveNames,
    ) -> Result<SinkReceipt, StoreError> {
        let folder = sanitize_filename(&upload.destination.primary_folder_id);
        let dir = self.root.join(&folder);
        fs::create_dir_all(&dir).await?;

        let json_text = upload
            .derived_json
            .map(serde_json::to_string_pretty)
            .transpose()?;

        for n in 0..MAX_NAME_ATTEMPTS {
            let names = names.with_suffix(n);
            let document_path = dir.join(&names.document);
            if !write_new(&document_path, upload.bytes).await? {
                continue;
            }

            let secondary_file_id = match &json_text {
                Some(text) => {
                    let written = match write_new(&dir.join(&names.json), text.as_bytes()).await {
                        Ok(written) => written,
                        Err(e) => {
                            remove_quietly(&document_path).await;
                            return Err(e.into());
                        }
                    };
                    if !written {
                        // Stray JSON under this name; give the document up and move on
                        remove_quietly(&document_path).await;
                        continue;
                    }
                    Some(format!("{}/{}", folder, names.json))
                }
                None => None,
            };

            debug!("Archived {} under {}", names.document, dir.display());
            return Ok(SinkReceipt {
                primary_file_id: format!("{}/{}", folder, names.document),
                secondary_file_id,
            });
        }

        Err(StoreError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free name for {} in {} after {} attempts",
                names.document,
                dir.display(),
                MAX_NAME_ATTEMPTS
            ),
        )))
    }

    /// Every document with a JSON companion, in the root and its immediate
    /// subdirectories, ordered by path.
    ///
    /// Documents are found through their companions: `<stem>.json` pairs
    /// with `<stem>.<ext>` (any extension but `json`) or with a bare
    /// `<stem>`. Documents without a companion are skipped. A companion that
    /// is not valid JSON, or that has no document, is logged and skipped.
    pub async fn pairs(&self) -> Result<Vec<ArchivedPair>, StoreError> {
        let mut dirs = vec![self.root.clone()];
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(entry.path());
            }
        }

        let mut found = Vec::new();
        for dir in dirs {
            let mut files = BTreeSet::new();
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    files.insert(entry.file_name().to_string_lossy().into_owned());
                }
            }

            for json_name in files.iter().filter(|f| is_json(f)) {
                let stem = &json_name[..json_name.len() - ".json".len()];
                let document = files.iter().find(|f| {
                    !is_json(f)
                        && (f.as_str() == stem
                            || f.rsplit_once('.').is_some_and(|(s, _)| s == stem))
                });
                match document {
                    Some(document) => found.push((dir.join(document), dir.join(json_name))),
                    None => debug!("No document for {}", dir.join(json_name).display()),
                }
            }
        }
        found.sort();

        let mut pairs = Vec::with_capacity(found.len());
        for (document_path, json_path) in found {
            let text = fs::read_to_string(&json_path).await?;
            let json: Value = match serde_json::from_str(&text) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Skipping {}: invalid JSON: {}", json_path.display(), e);
                    continue;
                }
            };

            let name = document_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            pairs.push(ArchivedPair {
                name,
                pdf: fs::read(&document_path).await?,
                json,
            });
        }

        Ok(pairs)
    }
}

fn is_json(name: &str) -> bool {
    name.len() > ".json".len() && name.to_ascii_lowercase().ends_with(".json")
}

/// Create `path` and write `bytes`; `false` if the file already exists
async fn write_new(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(true)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

#[async_trait]
impl DocumentSink for LocalArchive {
    type Error = StoreError;

    async fn persist(&self, upload: &DocumentUpload<'_>) -> Result<SinkReceipt, StoreError> {
        self.persist_as(upload, &ArchiveNames::now(upload.original_filename))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledgermail_domain::Destination;
    use serde_json::json;
    use tempfile::TempDir;

    fn destination(folder: &str) -> Destination {
        Destination {
            primary_folder_id: folder.to_string(),
            secondary_folder_id: None,
        }
    }

    #[tokio::test]
    async fn test_persist_writes_pdf_and_json() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path());
        let json = json!({"isCreditMemo": true});
        let dest = destination("1001");

        let receipt = archive
            .persist(&DocumentUpload {
                bytes: b"%PDF-1.4",
                original_filename: "memo.pdf",
                derived_json: Some(&json),
                destination: &dest,
            })
            .await
            .unwrap();

        assert!(receipt.primary_file_id.starts_with("1001/"));
        assert!(receipt.primary_file_id.ends_with("_memo.pdf"));
        let secondary = receipt.secondary_file_id.unwrap();
        assert!(secondary.ends_with("_memo.json"));

        let written = std::fs::read(dir.path().join(&receipt.primary_file_id)).unwrap();
        assert_eq!(written, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_pairs_reads_back_matched_documents() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path());
        let dest = destination("1001");

        for (i, name) in ["a.pdf", "b.pdf"].iter().enumerate() {
            let json = json!({"documentNumber": format!("CM{}", i)});
            archive
                .persist(&DocumentUpload {
                    bytes: b"%PDF",
                    original_filename: name,
                    derived_json: Some(&json),
                    destination: &dest,
                })
                .await
                .unwrap();
        }
        // No JSON companion, not listed
        archive
            .persist(&DocumentUpload {
                bytes: b"%PDF",
                original_filename: "orphan.pdf",
                derived_json: None,
                destination: &dest,
            })
            .await
            .unwrap();

        let pairs = archive.pairs().await.unwrap();

        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].name.ends_with("_a.pdf"));
        assert_eq!(pairs[0].json["documentNumber"], "CM0");
        assert_eq!(pairs[1].json["documentNumber"], "CM1");
        assert_eq!(pairs[1].pdf, b"%PDF");
    }

    #[tokio::test]
    async fn test_pairs_skips_invalid_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("x.json"), b"not json").unwrap();
        std::fs::write(dir.path().join("y.PDF"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("y.json"), b"{}").unwrap();

        let pairs = LocalArchive::new(dir.path()).pairs().await.unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "y.PDF");
    }

    #[tokio::test]
    async fn test_folder_id_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path().join("archive"));
        let dest = destination("../outside");

        let receipt = archive
            .persist(&DocumentUpload {
                bytes: b"%PDF",
                original_filename: "m.pdf",
                derived_json: None,
                destination: &dest,
            })
            .await
            .unwrap();

        assert!(receipt.primary_file_id.starts_with("outside/"));
        assert!(dir.path().join("archive/outside").is_dir());
    }

    #[tokio::test]
    async fn test_concurrent_same_name_uploads_both_kept() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path());
        let dest = destination("1001");
        let first = json!({"documentNumber": "CM1"});
        let second = json!({"documentNumber": "CM2"});
        let one = DocumentUpload {
            bytes: b"%PDF one",
            original_filename: "CreditMemo.pdf",
            derived_json: Some(&first),
            destination: &dest,
        };
        let two = DocumentUpload {
            bytes: b"%PDF two",
            derived_json: Some(&second),
            ..one
        };
        // Same instant, same attachment name
        let names = ArchiveNames::new(Utc::now(), "CreditMemo.pdf");

        let (a, b) = tokio::join!(
            archive.persist_as(&one, &names),
            archive.persist_as(&two, &names),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.primary_file_id, b.primary_file_id);
        assert_ne!(a.secondary_file_id, b.secondary_file_id);
        let pairs = archive.pairs().await.unwrap();
        assert_eq!(pairs.len(), 2);
        let mut numbers: Vec<_> = pairs
            .iter()
            .map(|p| p.json["documentNumber"].as_str().unwrap().to_string())
            .collect();
        numbers.sort();
        assert_eq!(numbers, ["CM1", "CM2"]);
        let mut contents: Vec<_> = pairs.iter().map(|p| p.pdf.clone()).collect();
        contents.sort();
        assert_eq!(contents, [b"%PDF one".to_vec(), b"%PDF two".to_vec()]);
    }

    #[tokio::test]
    async fn test_persist_as_uses_given_names() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path());
        let dest = destination("1001");
        let json = json!({});
        let names = ArchiveNames::new(Utc::now(), "memo.pdf");

        let receipt = archive
            .persist_as(
                &DocumentUpload {
                    bytes: b"%PDF",
                    original_filename: "memo.pdf",
                    derived_json: Some(&json),
                    destination: &dest,
                },
                &names,
            )
            .await
            .unwrap();

        assert_eq!(receipt.primary_file_id, format!("1001/{}", names.document));
        assert_eq!(receipt.secondary_file_id, Some(format!("1001/{}", names.json)));
    }

    #[tokio::test]
    async fn test_stray_json_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path());
        let dest = destination("1001");
        let names = ArchiveNames::new(Utc::now(), "memo.pdf");
        std::fs::create_dir_all(dir.path().join("1001")).unwrap();
        std::fs::write(dir.path().join("1001").join(&names.json), b"{\"stray\": true}").unwrap();
        let json = json!({"stray": false});

        let receipt = archive
            .persist_as(
                &DocumentUpload {
                    bytes: b"%PDF",
                    original_filename: "memo.pdf",
                    derived_json: Some(&json),
                    destination: &dest,
                },
                &names,
            )
            .await
            .unwrap();

        assert_eq!(receipt.primary_file_id, format!("1001/{}", names.with_suffix(1).document));
        assert!(!dir.path().join("1001").join(&names.document).exists());
        let stray = std::fs::read_to_string(dir.path().join("1001").join(&names.json)).unwrap();
        assert!(stray.contains("true"));
    }

    #[tokio::test]
    async fn test_extensionless_document_pairs_with_its_json() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path());
        let dest = destination("1001");
        let json = json!({"documentNumber": "CM9"});

        let receipt = archive
            .persist(&DocumentUpload {
                bytes: b"%PDF",
                original_filename: "attachment-1",
                derived_json: Some(&json),
                destination: &dest,
            })
            .await
            .unwrap();

        let pairs = archive.pairs().await.unwrap();

        assert_eq!(pairs.len(), 1);
        assert!(receipt.primary_file_id.ends_with(&pairs[0].name));
        assert!(pairs[0].name.ends_with("_attachment-1"));
        assert_eq!(pairs[0].json["documentNumber"], "CM9");
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let archive = LocalArchive::new(dir.path().join("missing"));
        assert!(matches!(archive.pairs().await, Err(StoreError::Io(_))));
    }
}
