//! Parsing of free-text model replies into [`Classification`] records.
//!
//! Models are asked for three labelled lines but routinely wrap labels in
//! markdown bold, add blank lines, or append commentary. The extractor
//! tolerates all of that and otherwise reports absence: a reply that does
//! not carry all three labels in order yields `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::Classification;

/// `IMPORTANT`, `REASON`, `CONFIDENCE` in that order, case-insensitive,
/// `.` spanning newlines so a reason may run over several lines.
static REPLY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)IMPORTANT\s*:\s*(?P<important>[^\n]+)\s*",
        r"\n+REASON\s*:\s*(?P<reason>.+?)\s*",
        r"\n+CONFIDENCE\s*:\s*(?P<confidence>[A-Za-z]+)",
    ))
    .ok()
});

/// Normalise line endings, drop markdown emphasis, trim.
fn normalize(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('*', "").trim().to_owned()
}

/// Extract the three classification fields from one raw reply.
///
/// Returns `None` when any label is missing or out of order. Captured values
/// are trimmed but otherwise returned exactly as the model wrote them.
pub fn extract(raw: &str) -> Option<Classification> {
    let pattern = REPLY_PATTERN.as_ref()?;
    let text = normalize(raw);
    let Some(caps) = pattern.captures(&text) else {
        debug!("no classification found in reply");
        return None;
    };

    let field = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim().to_owned())
            .unwrap_or_default()
    };

    Some(Classification {
        important: field("important"),
        reason: field("reason"),
        confidence: field("confidence"),
    })
}

/// Apply [`extract`] to every reply, preserving order and length.
pub fn extract_all<S: AsRef<str>>(replies: &[S]) -> Vec<Option<Classification>> {
    info!(replies = replies.len(), "extracting fields from replies");
    replies.iter().map(|r| extract(r.as_ref())).collect()
}
