//! Sieve: email importance triage against a local language model.
//!
//! Each email's subject and sender are rendered into a fixed prompt, sent to
//! a locally served model, and the free-text reply is parsed back into an
//! `IMPORTANT` / `REASON` / `CONFIDENCE` record. Replies that do not follow
//! the format come back as absent rather than as errors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod classify;
pub mod config;
pub mod logging;
pub mod providers;
pub mod table;
