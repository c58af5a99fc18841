//! Utility functions.
//!
//! Collection of helper functions used across the bot.

mod format;

pub use format::{html_escape, mention_html, unit_for};
