//! ledgermail Store
//!
//! Where accepted documents end up.
//!
//! # Overview
//!
//! - **RestDocumentStore**: OAuth 1.0a (HMAC-SHA256) signed client for the
//!   back-office REST endpoint. Uploads a document plus its derived JSON and
//!   searches transactions for the reconciliation stage.
//! - **LocalArchive**: mirrors the same files to a local directory and reads
//!   PDF/JSON pairs back.
//! - **ArchiveSink**: remote, local, or both behind one [`DocumentSink`].
//!
//! Stored names are `<ISO-8601 timestamp>_<sanitised original name>`, see
//! [`timestamped_filename`].
//!
//! [`DocumentSink`]: ledgermail_domain::DocumentSink

#![warn(missing_docs)]

mod error;
mod local;
mod naming;
mod rest;
mod signing;
mod sink;

pub use error::StoreError;
pub use local::{ArchivedPair, LocalArchive};
pub use naming::{sanitize_filename, timestamp_prefix, timestamped_filename, ArchiveNames};
pub use rest::{RestDocumentStore, RestStoreConfig};
pub use signing::{sign, signature_base_string, Nonce, OAuthCredentials, SIGNATURE_METHOD};
pub use sink::ArchiveSink;
