//! Resolves dotted/bracketed path expressions against a generic JSON tree.
//!
//! The accessor is deliberately decoupled from the parser: it knows nothing
//! about metadata or pointers, only how to walk a [`serde_json::Value`].
//! Existence-check and fetch are distinct operations so that callers can
//! tell "absent" apart from "present but null": [`has`] answers the first
//! question, [`get`] performs the second and fails loudly when the caller
//! skipped the check.
//!
//! # Path syntax
//!
//! - Key segment: `.name` (leading dot omitted for the first segment)
//!   addresses an object member.
//! - Bracket segment: `[0]` or `[key]` addresses a sequence index, or an
//!   associative key on objects.
//!
//! `attributes.address.zip`, `data[0].id` and `[store-a]` are all valid.

use std::fmt;

use serde_json::Value;

use crate::error::Error;

/// Short name of a JSON node's shape, for diagnostics.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why a path expression failed to parse or resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessErrorKind {
    /// The expression itself is malformed.
    Syntax { detail: String },
    /// An intermediate node cannot be traversed with this segment kind.
    NotTraversable {
        segment: String,
        found: &'static str,
    },
    /// The addressed member does not exist.
    Missing { segment: String },
}

/// An error originating from path parsing or tree traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessError {
    /// Byte position in `path` where the problem starts.
    pub offset: usize,
    /// The full path expression that failed.
    pub path: String,
    /// The underlying failure.
    pub kind: AccessErrorKind,
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot resolve `{}` (offset {}): ", self.path, self.offset)?;
        match &self.kind {
            AccessErrorKind::Syntax { detail } => write!(f, "{detail}"),
            AccessErrorKind::NotTraversable { segment, found } => {
                write!(f, "segment `{segment}` cannot traverse a {found} node")
            }
            AccessErrorKind::Missing { segment } => {
                write!(f, "no member `{segment}` at this location")
            }
        }
    }
}

impl std::error::Error for AccessError {}

impl From<AccessError> for Error {
    fn from(err: AccessError) -> Self {
        match err.kind {
            // A malformed path expression is a bad metadata declaration.
            AccessErrorKind::Syntax { .. } => Error::config(err.to_string()),
            _ => Error::Access {
                msg: err.to_string(),
                pointer: None,
            },
        }
    }
}

/// One step of a parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Seg {
    /// Dot segment: object member by name.
    Key(String),
    /// Bracket segment: sequence index, or associative key on objects.
    Bracket(String),
}

impl Seg {
    fn text(&self) -> &str {
        match self {
            Seg::Key(s) | Seg::Bracket(s) => s,
        }
    }
}

/// A pre-parsed path expression.
///
/// Parsing once and resolving many times keeps syntax errors (programmer
/// errors) apart from traversal outcomes (data-dependent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    raw: String,
    segments: Vec<(Seg, usize)>,
}

impl PathExpr {
    /// Parse a path expression.
    ///
    /// Fails with a `Syntax` [`AccessError`] on empty paths, empty segments,
    /// empty or unterminated brackets.
    pub fn parse(path: &str) -> Result<Self, AccessError> {
        let syntax = |offset: usize, detail: &str| AccessError {
            offset,
            path: path.to_owned(),
            kind: AccessErrorKind::Syntax {
                detail: detail.to_owned(),
            },
        };

        if path.is_empty() {
            return Err(syntax(0, "empty path expression"));
        }

        let bytes = path.as_bytes();
        let mut segments = Vec::new();
        let mut i = 0usize;
        let mut expect_key = true; // a fresh expression may open with a bare key
        while i < bytes.len() {
            match bytes[i] {
                b'[' => {
                    let start = i;
                    let close = path[i + 1..]
                        .find(']')
                        .map(|off| i + 1 + off)
                        .ok_or_else(|| syntax(start, "unterminated `[`"))?;
                    if close == i + 1 {
                        return Err(syntax(start, "empty `[]` segment"));
                    }
                    let inner = &path[i + 1..close];
                    if inner.contains('[') {
                        return Err(syntax(start, "nested `[` inside brackets"));
                    }
                    segments.push((Seg::Bracket(inner.to_owned()), start));
                    i = close + 1;
                    expect_key = false;
                }
                b'.' => {
                    if expect_key {
                        return Err(syntax(i, "empty segment before `.`"));
                    }
                    i += 1;
                    expect_key = true;
                    if i == bytes.len() {
                        return Err(syntax(i - 1, "trailing `.`"));
                    }
                }
                _ => {
                    if !expect_key && !segments.is_empty() {
                        return Err(syntax(i, "expected `.` or `[` between segments"));
                    }
                    let start = i;
                    while i < bytes.len() && bytes[i] != b'.' && bytes[i] != b'[' {
                        if bytes[i] == b']' {
                            return Err(syntax(i, "`]` without matching `[`"));
                        }
                        i += 1;
                    }
                    segments.push((Seg::Key(path[start..i].to_owned()), start));
                    expect_key = false;
                }
            }
        }
        Ok(Self {
            raw: path.to_owned(),
            segments,
        })
    }

    /// The expression as originally written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    fn fail(&self, offset: usize, kind: AccessErrorKind) -> AccessError {
        AccessError {
            offset,
            path: self.raw.clone(),
            kind,
        }
    }

    /// Walk `tree` along this expression.
    fn resolve<'a>(&self, tree: &'a Value) -> Result<&'a Value, AccessError> {
        let mut current = tree;
        for (seg, offset) in &self.segments {
            current = match (seg, current) {
                (Seg::Key(name), Value::Object(map)) => map.get(name).ok_or_else(|| {
                    self.fail(
                        *offset,
                        AccessErrorKind::Missing {
                            segment: name.clone(),
                        },
                    )
                })?,
                (Seg::Bracket(key), Value::Object(map)) => map.get(key).ok_or_else(|| {
                    self.fail(
                        *offset,
                        AccessErrorKind::Missing {
                            segment: key.clone(),
                        },
                    )
                })?,
                (Seg::Bracket(key), Value::Array(items)) => {
                    let idx: usize = key.parse().map_err(|_| {
                        self.fail(
                            *offset,
                            AccessErrorKind::NotTraversable {
                                segment: key.clone(),
                                found: "array",
                            },
                        )
                    })?;
                    items.get(idx).ok_or_else(|| {
                        self.fail(
                            *offset,
                            AccessErrorKind::Missing {
                                segment: key.clone(),
                            },
                        )
                    })?
                }
                (seg, other) => {
                    return Err(self.fail(
                        *offset,
                        AccessErrorKind::NotTraversable {
                            segment: seg.text().to_owned(),
                            found: value_kind(other),
                        },
                    ));
                }
            };
        }
        Ok(current)
    }
}

/// True iff the expression resolves to a readable location in `tree`.
///
/// Present-but-null locations answer `true`; only genuinely unreachable
/// locations answer `false`.
pub fn has(tree: &Value, expr: &PathExpr) -> bool {
    expr.resolve(tree).is_ok()
}

/// Fetch the value at the expression's location.
///
/// Fails when the traversal hits a non-traversable intermediate node or a
/// missing member; callers that checked [`has`] first never see an error.
pub fn get<'a>(tree: &'a Value, expr: &PathExpr) -> Result<&'a Value, AccessError> {
    expr.resolve(tree)
}

/// Parse-and-check convenience over [`has`].
pub fn has_path(tree: &Value, path: &str) -> Result<bool, AccessError> {
    Ok(has(tree, &PathExpr::parse(path)?))
}

/// Parse-and-fetch convenience over [`get`].
pub fn get_path<'a>(tree: &'a Value, path: &str) -> Result<&'a Value, AccessError> {
    get(tree, &PathExpr::parse(path)?)
}
