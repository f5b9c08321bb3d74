//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{calculate_checksum, is_text_file};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
pub use text::{normalize_text, strip_markup, terms};
