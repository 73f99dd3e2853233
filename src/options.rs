use serde::{Deserialize, Serialize};

/// Parser configuration options.
///
/// Use this to configure the default timestamp format, the recursion depth
/// limit, and the active serialization groups.
///
/// Example: tighten the depth limit and activate an extra group.
///
/// ```rust
/// let options = jsonapi_hydrator::options! {
///     max_depth: 16,
///     groups: vec!["Admin".to_string(), "Default".to_string()],
/// };
/// assert_eq!(options.max_depth, 16);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Options {
    /// Format for `datetime` properties that do not declare their own,
    /// in `chrono` strftime syntax. Default: `%Y-%m-%dT%H:%M:%S%:z`
    /// (RFC 3339 timestamps with a numeric offset).
    pub datetime_format: String,
    /// Maximum nesting depth of the document tree. Descending past this
    /// limit stops parsing with a depth-limit error instead of exhausting
    /// the stack on adversarial input.
    pub max_depth: usize,
    /// Active serialization groups, in priority order. Consulted only when a
    /// property registers per-group loaders; the first listed group with a
    /// loader wins.
    pub groups: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            datetime_format: "%Y-%m-%dT%H:%M:%S%:z".to_owned(),
            max_depth: 128,
            groups: vec!["Default".to_owned()],
        }
    }
}
