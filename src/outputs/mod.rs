//! Outbound side of a run.
//!
//! # Submodules
//!
//! - [`message`]: Turns a batch of items (or an operator alert) into Telegram HTML
//! - [`telegram`]: The [`telegram::Notifier`] seam and its Bot API implementation

pub mod message;
pub mod telegram;
