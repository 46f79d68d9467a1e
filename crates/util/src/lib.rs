pub mod json;
pub mod paths;
pub mod redaction;

pub use json::{JsonParseError, parse_json_strict};
pub use paths::{expand_tilde, path_from_env};
pub use redaction::{redact_sensitive, redact_sensitive_with};
