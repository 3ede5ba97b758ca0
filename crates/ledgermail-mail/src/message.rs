//! RFC 822 message parsing

use crate::MailError;
use ledgermail_domain::{RawDocument, SourceMetadata};
use mail_parser::{MessageParser, MimeHeaders};

/// Media type accepted as a document
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// One attachment of a parsed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment file name, or `attachment-<n>` when none was given
    pub filename: String,
    /// `type/subtype`, lowercased
    pub content_type: String,
    /// Decoded content
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Declared as PDF or named `*.pdf`
    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_MEDIA_TYPE || self.filename.to_ascii_lowercase().ends_with(".pdf")
    }

    /// File name for the stored document, always ending in `.pdf`
    pub fn document_filename(&self) -> String {
        if self.filename.to_ascii_lowercase().ends_with(".pdf") {
            self.filename.clone()
        } else {
            format!("{}.pdf", self.filename)
        }
    }
}

/// Headers and attachments of one message
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// Sender, subject, date and message id
    pub metadata: SourceMetadata,
    /// Every attachment, in message order
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    /// Sender address
    pub fn sender(&self) -> &str {
        &self.metadata.sender
    }

    /// Subject line
    pub fn subject(&self) -> &str {
        &self.metadata.subject
    }

    /// One document per PDF attachment, carrying this message's metadata.
    /// Declared PDFs without a `.pdf` name get the extension appended.
    pub fn pdf_attachments(&self) -> Vec<RawDocument> {
        self.attachments
            .iter()
            .filter(|a| a.is_pdf())
            .map(|a| {
                RawDocument::new(a.bytes.clone(), a.document_filename(), self.metadata.clone())
            })
            .collect()
    }
}

/// Parse raw message bytes.
///
/// `fallback_id` identifies the message when it has no `Message-ID` header.
/// Missing sender or subject become empty strings, which no rule with a
/// non-empty predicate will match.
pub fn parse_message(raw: &[u8], fallback_id: &str) -> Result<ParsedMessage, MailError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MailError::Parse {
            id: fallback_id.to_string(),
            reason: "not an RFC 822 message".to_string(),
        })?;

    let sender = message
        .from()
        .and_then(|addrs| addrs.first())
        .and_then(|addr| addr.address())
        .unwrap_or_default()
        .to_string();

    let metadata = SourceMetadata {
        message_id: message
            .message_id()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_id.to_string()),
        sender,
        subject: message.subject().unwrap_or_default().to_string(),
        date: message.date().map(|d| d.to_rfc3339()),
    };

    let attachments = message
        .attachments()
        .enumerate()
        .map(|(i, part)| {
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string())
                .to_ascii_lowercase();

            Attachment {
                filename: part
                    .attachment_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("attachment-{}", i + 1)),
                content_type,
                bytes: part.contents().to_vec(),
            }
        })
        .collect();

    Ok(ParsedMessage {
        metadata,
        attachments,
    })
}
