//! Structured logging setup and ndjson output lines.

mod format;

pub use format::{ScreeningLine, StructuredLogger};
