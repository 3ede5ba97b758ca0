//! Archive file naming
//!
//! Every stored document is prefixed with the time it was stored so repeated
//! deliveries of the same attachment never overwrite each other.

use chrono::{DateTime, SecondsFormat, Utc};

/// Replace path separators and anything outside `[A-Za-z0-9._-]`
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// `2024-05-01T12:30:45.123Z` becomes `2024-05-01T12-30-45-123Z`
pub fn timestamp_prefix(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// `<timestamp>_<sanitised name>`
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use ledgermail_store::timestamped_filename;
///
/// let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
/// assert_eq!(
///     timestamped_filename(ts, "inbox/Credit Memo.pdf"),
///     "2024-05-01T12-30-45-000Z_Credit_Memo.pdf"
/// );
/// ```
pub fn timestamped_filename(ts: DateTime<Utc>, original: &str) -> String {
    format!("{}_{}", timestamp_prefix(ts), sanitize_filename(original))
}

/// File names for a document and its derived JSON, sharing one timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveNames {
    /// Name of the stored document
    pub document: String,
    /// Name of the JSON companion (`<timestamp>_<stem>.json`)
    pub json: String,
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}

impl ArchiveNames {
    /// Names for `original` stored at `ts`
    pub fn new(ts: DateTime<Utc>, original: &str) -> Self {
        let document = timestamped_filename(ts, original);
        let (stem, _) = split_extension(&document);
        let json = format!("{}.json", stem);
        Self { document, json }
    }

    /// The same names with `_<n>` before each extension, for when the
    /// unsuffixed pair is already taken. `n == 0` returns the names unchanged.
    pub fn with_suffix(&self, n: u32) -> Self {
        if n == 0 {
            return self.clone();
        }
        let (stem, ext) = split_extension(&self.document);
        Self {
            document: format!("{}_{}{}", stem, n, ext),
            json: format!("{}_{}.json", stem, n),
        }
    }

    /// Names stamped with the current time
    pub fn now(original: &str) -> Self {
        Self::new(Utc::now(), original)
    }
}
