//! Prompt construction and reply parsing for email importance triage.
//!
//! Both halves are pure functions with no shared mutable state; they can be
//! called from any number of tasks concurrently.

use serde::{Deserialize, Serialize};

pub mod extract;
pub mod prompt;

pub use extract::{extract, extract_all};

/// Structured verdict parsed from one model reply.
///
/// Values are kept exactly as the model wrote them (after trimming). The
/// expected domains are `Yes`/`No` for `important` and `High`/`Medium`/`Low`
/// for `confidence`, but nothing here enforces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Importance verdict.
    pub important: String,
    /// Model's rationale; may span several lines.
    pub reason: String,
    /// Self-reported confidence.
    pub confidence: String,
}
