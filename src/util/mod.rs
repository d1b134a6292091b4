//! Helpers shared by the library and the CLI.
//!
//! - **URL validation**: custom data-source URLs must point at the public internet
//! - **Text**: make server-supplied strings safe and narrow enough for a terminal

mod text;
mod url_validator;

pub use text::{display_line, display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_url, UrlValidationError};
