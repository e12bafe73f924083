// ABOUTME: Extractors module: next-link resolution and title/content node location.
// ABOUTME: Both work on the parsed page before any cleanup runs.

pub mod content;
pub mod links;

pub use content::{extract, title_text, Extracted};
pub use links::{find_next, resolve_next, NextLink};
