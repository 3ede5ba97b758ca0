//! Prompt text handed to the extraction oracle

use ledgermail_domain::RawDocument;
use serde_json::Value;

/// Extraction instructions used when a routing rule carries no prompt of its own.
///
/// `{subject}`, `{sender}`, `{date}` and `{filename}` are filled in per document.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are reading a PDF attached to a vendor email.

Email subject: {subject}
Sender: {sender}
Received: {date}
Attachment: {filename}

Step 1. Decide whether this document is a credit memo (a document crediting the
customer's account, often titled "Credit Memo", "Credit Note" or "Credit
Advice"). Invoices, statements and remittance advices are NOT credit memos.
Set "isCreditMemo" accordingly. If it is not a credit memo, stop here and return
{"isCreditMemo": false, "lineItems": []}.

Step 2. Extract the header:
- "vendorName": the issuing company
- "documentNumber": the credit memo number as printed
- "documentDate": the document date as YYYY-MM-DD
- "totalAmount": the credit total as a positive decimal string, e.g. "125.40"
- "currency": three-letter code if shown

Step 3. Extract every line item into "lineItems". For each line:
- "billNumber": the 8-digit bill (claim) number the credit applies to, exactly as printed
- "nardaCode": the NARDA code for the line, if one is printed
- "description": short description
- "amount": line amount as a positive decimal string

Step 4. If the line amounts do not add up to the total, or anything else looks
inconsistent, describe the problem in "validationError". Otherwise omit it.

Return exactly one JSON object and nothing else."#;

/// Fill the per-document placeholders of a prompt template
pub fn render_instructions(template: &str, document: &RawDocument) -> String {
    let metadata = document.metadata();
    template
        .replace("{subject}", &metadata.subject)
        .replace("{sender}", &metadata.sender)
        .replace("{date}", metadata.date.as_deref().unwrap_or("unknown"))
        .replace("{filename}", document.original_filename())
}

/// Prompt for the single corrective attempt after a validation failure:
/// a fixed preamble naming the rule and the diagnostic, then the original
/// instructions unchanged.
pub fn corrective_prompt(rule: &str, diagnostic: &str, original: &str) -> String {
    format!(
        "IMPORTANT: A previous extraction of this document failed validation.\n\
         Rule: {rule}\n\
         Problems found: {diagnostic}\n\
         Re-read the document carefully and correct these values. Report numbers \
         exactly as printed; do not pad, truncate or invent digits to satisfy the rule.\n\n\
         {original}"
    )
}

/// Prompt asking the oracle to compare a booked transaction with its source document
pub fn reconcile_prompt(transaction: &Value, extracted: &Value) -> String {
    let transaction = serde_json::to_string_pretty(transaction).unwrap_or_default();
    let extracted = serde_json::to_string_pretty(extracted).unwrap_or_default();
    format!(
        r#"The attached PDF is the source document for an accounting transaction.

Transaction as recorded:
{transaction}

Data previously extracted from the PDF:
{extracted}

Compare the recorded transaction against the PDF itself (not only the extracted
data). Check the document number, date, vendor, every line's bill number and
amount, and the total.

Return exactly one JSON object:
{{"matches": true or false, "discrepancies": ["one short sentence per problem"]}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_domain::SourceMetadata;
    use serde_json::json;

    fn document() -> RawDocument {
        RawDocument::new(
            b"%PDF".to_vec(),
            "CM-1001.pdf",
            SourceMetadata {
                message_id: "<m1@example.com>".to_string(),
                sender: "no-replies@example.com".to_string(),
                subject: "Credits processed by Example for 123".to_string(),
                date: None,
            },
        )
    }

    #[test]
    fn test_render_fills_placeholders() {
        let prompt = render_instructions(DEFAULT_EXTRACTION_PROMPT, &document());
        assert!(prompt.contains("Email subject: Credits processed by Example for 123"));
        assert!(prompt.contains("Sender: no-replies@example.com"));
        assert!(prompt.contains("Received: unknown"));
        assert!(prompt.contains("Attachment: CM-1001.pdf"));
        assert!(!prompt.contains("{subject}"));
    }

    #[test]
    fn test_render_leaves_json_braces() {
        let prompt = render_instructions(DEFAULT_EXTRACTION_PROMPT, &document());
        assert!(prompt.contains(r#"{"isCreditMemo": false, "lineItems": []}"#));
    }

    #[test]
    fn test_corrective_prompt_layout() {
        let prompt = corrective_prompt(
            "bill numbers are 8 digits",
            "Line 1: bill number \"1234567\" has 7 digits, expected 8",
            "ORIGINAL INSTRUCTIONS",
        );
        assert!(prompt.starts_with("IMPORTANT: A previous extraction"));
        assert!(prompt.contains("Rule: bill numbers are 8 digits"));
        assert!(prompt.contains("has 7 digits"));
        assert!(prompt.ends_with("ORIGINAL INSTRUCTIONS"));
    }

    #[test]
    fn test_reconcile_prompt_embeds_both_sides() {
        let prompt = reconcile_prompt(&json!({"tranId": "12345678"}), &json!({"totalAmount": "9.99"}));
        assert!(prompt.contains("\"tranId\": \"12345678\""));
        assert!(prompt.contains("\"totalAmount\": \"9.99\""));
        assert!(prompt.contains(r#"{"matches": true or false"#));
    }
}
