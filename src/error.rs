//! Defines the decoding error taxonomy and the JSON-API error object.
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Fixed error code placed on wrapped (non-domain) document parse failures.
pub const PARSE_ERROR_CODE: &str = "parse-error";

/// Generic top-level message placed on wrapped document parse failures.
pub const PARSE_ERROR_TITLE: &str = "Failed to parse document";

/// JSON-API error codes emitted by this crate, one per [`Error`] kind.
pub mod codes {
    pub const TYPE_MISMATCH: &str = "type-mismatch";
    pub const INVALID_FORMAT: &str = "invalid-format";
    pub const RESOURCE_TYPE_MISMATCH: &str = "resource-type-mismatch";
    pub const EMPTY_DOCUMENT: &str = "empty-document";
    pub const DEPTH_LIMIT: &str = "depth-limit";
    pub const CONFIGURATION: &str = "configuration";
    pub const UNKNOWN_CODEC: &str = "unknown-codec";
    pub const INVALID_CODEC: &str = "invalid-codec";
    pub const ACCESS: &str = "access";
    pub const INTERNAL: &str = "internal";
}

/// Which codec table a registry operation addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Decoder,
    Encoder,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Decoder => f.write_str("decoder"),
            CodecKind::Encoder => f.write_str("encoder"),
        }
    }
}

/// Error raised while decoding a JSON-API document tree.
///
/// Variants raised mid-parse carry the JSON pointer that was active when the
/// failure occurred; the pointer survives stack unwinding so the document
/// boundary can report the exact source location.
#[derive(Debug)]
pub enum Error {
    /// Value present but of the wrong shape for the declared data type.
    TypeMismatch {
        expected: &'static str,
        actual: String,
        pointer: String,
    },
    /// String present but unparsable against the expected date/time format.
    Format {
        format: String,
        value: String,
        pointer: String,
    },
    /// Resource `type` member does not match the declared resource name.
    ResourceType {
        expected: String,
        actual: String,
        pointer: String,
    },
    /// Document content is absent and the document metadata forbids that.
    EmptyDocument { pointer: String },
    /// Recursion depth exceeded the configured limit.
    DepthLimit { limit: usize, pointer: String },
    /// Malformed metadata declaration: wrong setter target, duplicate
    /// per-group loader, bad discriminator, unusable data path.
    Config {
        msg: String,
        pointer: Option<String>,
    },
    /// Registry lookup for a codec name that was never registered.
    NotFound { kind: CodecKind, name: String },
    /// A codec factory failed to produce a usable instance.
    InvalidInstance {
        kind: CodecKind,
        name: String,
        detail: String,
    },
    /// Value accessor failure surfaced through the parser.
    Access {
        msg: String,
        pointer: Option<String>,
    },
    /// Free-form unexpected failure.
    Message {
        msg: String,
        pointer: Option<String>,
    },
}

impl Error {
    /// Construct a free-form `Message` error with no pointer attached.
    ///
    /// Called by:
    /// - Helpers reporting failures outside the parse walk.
    pub(crate) fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message {
            msg: s.into(),
            pointer: None,
        }
    }

    /// Construct a `Config` error (malformed metadata declaration).
    ///
    /// Config errors are programmer errors: they fail fast and are never
    /// retried or downgraded.
    pub(crate) fn config<S: Into<String>>(s: S) -> Self {
        Error::Config {
            msg: s.into(),
            pointer: None,
        }
    }

    /// Attach a pointer to this error if it does not carry one yet.
    ///
    /// Arguments:
    /// - `current`: pointer rendered at the failure site.
    ///
    /// Returns:
    /// - The same `Error` with an empty or missing pointer replaced.
    ///
    /// Called by:
    /// - The parser whenever an error crosses a scoped descent boundary.
    pub(crate) fn with_pointer(mut self, current: &str) -> Self {
        match &mut self {
            Error::TypeMismatch { pointer, .. }
            | Error::Format { pointer, .. }
            | Error::ResourceType { pointer, .. }
            | Error::EmptyDocument { pointer }
            | Error::DepthLimit { pointer, .. } => {
                if pointer.is_empty() {
                    *pointer = current.to_owned();
                }
            }
            Error::Config { pointer, .. }
            | Error::Access { pointer, .. }
            | Error::Message { pointer, .. } => {
                if pointer.is_none() {
                    *pointer = Some(current.to_owned());
                }
            }
            Error::NotFound { .. } | Error::InvalidInstance { .. } => {}
        }
        self
    }

    /// HTTP status code this error maps to in the JSON-API error object.
    pub fn status(&self) -> u16 {
        match self {
            Error::TypeMismatch { .. }
            | Error::Format { .. }
            | Error::EmptyDocument { .. }
            | Error::DepthLimit { .. } => 400,
            Error::ResourceType { .. } => 409,
            Error::Config { .. }
            | Error::NotFound { .. }
            | Error::InvalidInstance { .. }
            | Error::Access { .. }
            | Error::Message { .. } => 500,
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            Error::Format { .. } => codes::INVALID_FORMAT,
            Error::ResourceType { .. } => codes::RESOURCE_TYPE_MISMATCH,
            Error::EmptyDocument { .. } => codes::EMPTY_DOCUMENT,
            Error::DepthLimit { .. } => codes::DEPTH_LIMIT,
            Error::Config { .. } => codes::CONFIGURATION,
            Error::NotFound { .. } => codes::UNKNOWN_CODEC,
            Error::InvalidInstance { .. } => codes::INVALID_CODEC,
            Error::Access { .. } => codes::ACCESS,
            Error::Message { .. } => codes::INTERNAL,
        }
    }

    /// If the error captured a pointer, return it.
    pub fn pointer(&self) -> Option<&str> {
        match self {
            Error::TypeMismatch { pointer, .. }
            | Error::Format { pointer, .. }
            | Error::ResourceType { pointer, .. }
            | Error::EmptyDocument { pointer }
            | Error::DepthLimit { pointer, .. } => Some(pointer.as_str()),
            Error::Config { pointer, .. }
            | Error::Access { pointer, .. }
            | Error::Message { pointer, .. } => pointer.as_deref(),
            Error::NotFound { .. } | Error::InvalidInstance { .. } => None,
        }
    }

    /// True for errors that already have the JSON-API shape (own status,
    /// code, pointer) and pass through the document boundary unchanged.
    fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. }
                | Error::Format { .. }
                | Error::ResourceType { .. }
                | Error::EmptyDocument { .. }
                | Error::DepthLimit { .. }
        )
    }

    /// Core message without the trailing pointer suffix.
    ///
    /// Used for both `Display` and the `detail` member of [`ApiError`].
    fn detail_message(&self) -> String {
        match self {
            Error::TypeMismatch { expected, actual, .. } => {
                format!("value type mismatch: expected {expected}, found {actual}")
            }
            Error::Format { format, value, .. } => {
                format!("value `{value}` does not match format `{format}`")
            }
            Error::ResourceType { expected, actual, .. } => {
                format!("resource type mismatch: expected `{expected}`, found {actual}")
            }
            Error::EmptyDocument { .. } => "document carries no content".to_owned(),
            Error::DepthLimit { limit, .. } => {
                format!("document nesting exceeds the depth limit of {limit}")
            }
            Error::Config { msg, .. } => format!("invalid metadata: {msg}"),
            Error::NotFound { kind, name } => {
                format!("no {kind} registered under name `{name}`")
            }
            Error::InvalidInstance { kind, name, detail } => {
                format!("factory for {kind} `{name}` produced no usable instance: {detail}")
            }
            Error::Access { msg, .. } => format!("value access failed: {msg}"),
            Error::Message { msg, .. } => msg.clone(),
        }
    }

    /// Convert into the serializable JSON-API error object.
    ///
    /// Domain errors keep their own status, code and pointer. Everything else
    /// is wrapped into the generic envelope: fixed [`PARSE_ERROR_CODE`],
    /// generic title, original message as detail, `fallback` pointer when the
    /// error captured none. Every emitted object gets a fresh v4 uuid.
    pub fn into_api(self, fallback: &str) -> ApiError {
        let id = Uuid::new_v4().to_string();
        let status = self.status().to_string();
        let pointer = self
            .pointer()
            .filter(|p| !p.is_empty())
            .unwrap_or(fallback)
            .to_owned();
        let (title, code) = if self.is_domain() {
            (None, self.code().to_owned())
        } else {
            (Some(PARSE_ERROR_TITLE.to_owned()), PARSE_ERROR_CODE.to_owned())
        };
        ApiError {
            id,
            title,
            status,
            code,
            detail: Some(self.detail_message()),
            source: ErrorSource { pointer },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_with_pointer(f, &self.detail_message(), self.pointer())
    }
}

impl std::error::Error for Error {}

/// Print a message optionally suffixed with "at <pointer>".
fn fmt_with_pointer(f: &mut fmt::Formatter<'_>, msg: &str, pointer: Option<&str>) -> fmt::Result {
    match pointer {
        Some(p) if !p.is_empty() => write!(f, "{msg} at {p}"),
        _ => write!(f, "{msg}"),
    }
}

/// The `source` member of a JSON-API error object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorSource {
    /// Slash-delimited pointer to the offending document location.
    pub pointer: String,
}

/// A JSON-API error object, ready for direct serialization.
///
/// Shape: `{ "id", "title", "status", "code", "detail", "source": { "pointer" } }`.
/// `title` serializes as `null` for domain errors; wrapped errors carry the
/// generic [`PARSE_ERROR_TITLE`]. `status` is a string, per the JSON-API
/// error-object convention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub id: String,
    pub title: Option<String>,
    pub status: String,
    pub code: String,
    pub detail: Option<String>,
    pub source: ErrorSource,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {}] {} at {}",
            self.status,
            self.code,
            self.detail.as_deref().unwrap_or("error"),
            self.source.pointer
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_keeps_code_and_pointer() {
        let err = Error::TypeMismatch {
            expected: "string",
            actual: "array".to_owned(),
            pointer: "/data/attributes/name".to_owned(),
        };
        assert_eq!(err.status(), 400);
        let api = err.into_api("/");
        assert_eq!(api.status, "400");
        assert_eq!(api.code, codes::TYPE_MISMATCH);
        assert_eq!(api.title, None);
        assert_eq!(api.source.pointer, "/data/attributes/name");
    }

    #[test]
    fn wrapped_error_gets_envelope() {
        let err = Error::msg("boom");
        let api = err.into_api("/data");
        assert_eq!(api.status, "500");
        assert_eq!(api.code, PARSE_ERROR_CODE);
        assert_eq!(api.title.as_deref(), Some(PARSE_ERROR_TITLE));
        assert_eq!(api.detail.as_deref(), Some("boom"));
        assert_eq!(api.source.pointer, "/data");
    }

    #[test]
    fn api_error_ids_are_fresh() {
        let a = Error::msg("x").into_api("/");
        let b = Error::msg("x").into_api("/");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn with_pointer_does_not_clobber() {
        let err = Error::Format {
            format: "%Y".to_owned(),
            value: "nope".to_owned(),
            pointer: "/a/b".to_owned(),
        }
        .with_pointer("/other");
        assert_eq!(err.pointer(), Some("/a/b"));

        let err = Error::config("bad").with_pointer("/here");
        assert_eq!(err.pointer(), Some("/here"));
    }

    #[test]
    fn serializes_to_json_api_shape() {
        let api = Error::EmptyDocument {
            pointer: "/data".to_owned(),
        }
        .into_api("/");
        let json = serde_json::to_value(&api).unwrap();
        assert!(json.get("id").is_some());
        assert_eq!(json["title"], serde_json::Value::Null);
        assert_eq!(json["status"], "400");
        assert_eq!(json["code"], "empty-document");
        assert_eq!(json["source"]["pointer"], "/data");
    }
}
