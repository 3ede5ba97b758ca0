//! ledgermail Mail
//!
//! Turns inbound messages into documents.
//!
//! - [`parse_message`] reads sender, subject, date and message id from raw
//!   RFC 822 bytes and decodes attachments.
//! - [`ParsedMessage::pdf_attachments`] yields one
//!   [`RawDocument`](ledgermail_domain::RawDocument) per PDF attachment.
//! - [`SpoolMailbox`] is a [`MessageSource`](ledgermail_domain::MessageSource)
//!   over a directory of `.eml` files, checkpointed by moving files to
//!   `processed/`.

#![warn(missing_docs)]

mod error;
mod message;
mod spool;

pub use error::MailError;
pub use message::{parse_message, Attachment, ParsedMessage, PDF_MEDIA_TYPE};
pub use spool::{SpoolMailbox, INCOMING_DIR, PROCESSED_DIR};
