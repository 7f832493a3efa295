//! Edit server protocol types
//!
//! This crate defines the pieces of the edit protocol shared by the runtime
//! and the HTTP adapter: the fixed status message, the origin policy guarding
//! POST requests, and the error taxonomy for a single edit.

pub mod errors;
pub mod origin;

pub use errors::{ConfigError, EditError, OriginError};
pub use origin::OriginPolicy;

/// Body returned for every non-POST request.
pub const STATUS_MESSAGE: &str = "Server is up and running.  To use it, issue a POST request with the file to edit as the content body.\n";

/// Origin prefix sent by browser extensions.
pub const DEFAULT_ORIGIN_PREFIX: &str = "chrome-extension:";

/// Prefix of every scratch file created for an edit.
pub const SCRATCH_FILE_PREFIX: &str = "edit-server-";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        assert!(STATUS_MESSAGE.starts_with("Server is up and running."));
        assert!(STATUS_MESSAGE.ends_with('\n'));
    }
}
