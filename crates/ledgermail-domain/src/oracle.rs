//! Requests and responses exchanged with the extraction oracle

/// A binary document attached to an oracle request
#[derive(Debug, Clone, Copy)]
pub struct DocumentPart<'a> {
    /// Raw bytes; encoded by the client as needed
    pub bytes: &'a [u8],

    /// MIME type, e.g. `application/pdf`
    pub media_type: &'a str,
}

impl<'a> DocumentPart<'a> {
    /// A PDF document part
    pub fn pdf(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            media_type: "application/pdf",
        }
    }
}

/// One oracle call
#[derive(Debug, Clone)]
pub struct OracleRequest<'a> {
    /// Optional document to analyse
    pub document: Option<DocumentPart<'a>>,

    /// Instruction text
    pub instructions: &'a str,

    /// Output cap; the client's default applies when `None`
    pub max_output_tokens: Option<u32>,
}

/// Token counters reported by the oracle. Logged only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u64,

    /// Completion tokens
    pub output_tokens: u64,
}

/// Free-form oracle output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    /// Response text, expected to contain one JSON object
    pub text: String,

    /// Usage counters
    pub usage: TokenUsage,
}

impl OracleResponse {
    /// A response with no usage information
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
        }
    }
}
