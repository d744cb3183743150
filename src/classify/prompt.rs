//! Classification prompt rendering.
//!
//! The rule wording and order steer the model, so the text is fixed. Subject
//! and sender are spliced in verbatim; nothing is escaped or re-interpreted.

/// Role description and prioritised classification rules.
const INSTRUCTIONS: &str = concat!(
    "You are an intelligent email-filtering assistant. Your task is to help me declutter ",
    "my Gmail inbox by identifying and filtering out spam, promotional, and non-essential emails.\n\n",
    "### Classification Rules (in order of priority)\n",
    "1. Promotional, marketing, or advertisement emails are NOT important.\n",
    "2. Social justice, political, or advocacy-related content is NOT important, ",
    "   even if it includes dates, events, or calls to action.\n",
    "3. Emails about credit reports, credit scores, or credit monitoring are NOT important.\n",
    "4. Newsletters or community announcements (e.g., libraries, local events) are NOT important ",
    "   unless they contain explicit requests that affect your personal or professional obligations.\n",
    "5. Only mark an email as IMPORTANT if it clearly relates to personal, work-related, or time-sensitive matters ",
    "   that require your direct action (e.g., meeting confirmations, invoices, urgent requests, deadlines).\n\n",
);

const EMAIL_HEADER: &str = "### Email Information\n";

/// Three-line reply format the extractor expects back.
const RESPONSE_FORMAT: &str = concat!(
    "### Response Format\n",
    "IMPORTANT: <Yes or No>\n",
    "REASON: <Brief explanation>\n",
    "CONFIDENCE: <High / Medium / Low>\n",
);

/// Render the classification prompt for one email.
pub fn build(subject: &str, sender: &str) -> String {
    let mut prompt = String::with_capacity(
        INSTRUCTIONS
            .len()
            .saturating_add(EMAIL_HEADER.len())
            .saturating_add(RESPONSE_FORMAT.len())
            .saturating_add(subject.len())
            .saturating_add(sender.len())
            .saturating_add(32),
    );
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str(EMAIL_HEADER);
    prompt.push_str("Subject: ");
    prompt.push_str(subject);
    prompt.push_str("\nSender: ");
    prompt.push_str(sender);
    prompt.push_str("\n\n");
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}
