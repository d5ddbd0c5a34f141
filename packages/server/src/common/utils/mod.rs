pub mod html;

pub use html::{sanitize_html, try_sanitize_html, SanitizeError};
