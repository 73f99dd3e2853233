//! The recursive, metadata-driven document parser.
//!
//! [`DataParser`] walks an already-decoded [`serde_json::Value`] tree guided
//! by the descriptors a [`MetadataFactory`] hands out, and produces populated
//! domain objects as [`Decoded`] values. Every operation follows the same
//! discipline: push the data path onto the pointer stack, attempt the parse,
//! pop on the way out. Absence of a value is never an error; it is the
//! uniform null path. Failures carry a JSON pointer to the exact document
//! location that was active when they were raised.

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;

use crate::accessor::{self, value_kind, PathExpr};
use crate::decoded::{ArrayKey, Decoded};
use crate::error::{ApiError, Error};
use crate::factory::MetadataFactory;
use crate::metadata::{
    CustomParser, DataType, Discriminator, Metadata, ObjectMetadata, PropertyMetadata,
    ResourceMetadata, ScalarKind,
};
use crate::options::Options;
use crate::pointer::PointerStack;

/// Strings accepted as `true` when coercing to a boolean scalar.
/// Matching is ASCII case-insensitive; any other string coerces to `false`.
const TRUTHY_TOKENS: [&str; 5] = ["true", "yes", "y", "on", "enabled"];

fn is_truthy(text: &str) -> bool {
    TRUTHY_TOKENS.iter().any(|t| text.eq_ignore_ascii_case(t))
}

fn number_is_truthy(number: &serde_json::Number) -> bool {
    number.as_f64().is_some_and(|f| f != 0.0)
}

/// Read the location `path` addresses, relative to `tree`.
///
/// Returns: `Ok(None)` when the location is absent, `Ok(Some(..))` when it
/// is readable (possibly a null value); the empty path addresses `tree`
/// itself. Malformed path expressions surface as configuration errors.
fn locate<'a>(tree: &'a Value, path: &str) -> Result<Option<&'a Value>, Error> {
    if path.is_empty() {
        return Ok(Some(tree));
    }
    let expr = PathExpr::parse(path)?;
    if !accessor::has(tree, &expr) {
        return Ok(None);
    }
    Ok(Some(accessor::get(tree, &expr)?))
}

/// Result of the in-scope half of an object or resource parse: either a
/// finished value, or the concrete type a discriminator redirected to.
enum Outcome {
    Done(Decoded),
    Redirect(String),
}

/// Metadata-driven decoder for JSON-API document trees.
///
/// Holds the metadata factory, the configuration and the pointer stack used
/// for diagnostics. Parsing is synchronous and re-entrant by recursion only;
/// a parser instance must not be shared between threads.
pub struct DataParser {
    factory: Rc<dyn MetadataFactory>,
    options: Options,
    pointer: PointerStack,
}

impl DataParser {
    pub fn new(factory: Rc<dyn MetadataFactory>, options: Options) -> Self {
        Self {
            factory,
            options,
            pointer: PointerStack::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Push `segment`, run `body`, pop on every exit path.
    ///
    /// The pointer stack depth doubles as the recursion counter; descending
    /// past `Options::max_depth` stops the parse. Errors escaping `body`
    /// that carry no pointer yet get the pointer active inside the scope.
    fn scoped<T>(
        &mut self,
        segment: &str,
        body: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.pointer.push(segment);
        if self.pointer.depth() > self.options.max_depth {
            let err = Error::DepthLimit {
                limit: self.options.max_depth,
                pointer: self.pointer.current(),
            };
            self.pointer.pop();
            return Err(err);
        }
        let result = body(self).map_err(|e| e.with_pointer(&self.pointer.current()));
        self.pointer.pop();
        result
    }

    fn type_mismatch(&self, expected: &'static str, actual: &Value) -> Error {
        Error::TypeMismatch {
            expected,
            actual: value_kind(actual).to_owned(),
            pointer: self.pointer.current(),
        }
    }

    /// Decode a scalar at `path`, coercing compatible shapes.
    ///
    /// Pass-through for the exact target kind or null. Coercions: numeric
    /// strings parse into `Int`/`Float` (floats truncate toward zero when an
    /// integer is declared); numbers render into `String`; booleans come
    /// from the truthy token set for strings and from `!= 0` for numbers.
    /// Anything else is a type mismatch. Booleans never coerce outward.
    pub fn parse_scalar(
        &mut self,
        tree: &Value,
        path: &str,
        kind: ScalarKind,
    ) -> Result<Decoded, Error> {
        self.scoped(path, |p| {
            let Some(value) = locate(tree, path)? else {
                return Ok(Decoded::Null);
            };
            p.coerce_scalar(value, kind)
        })
    }

    fn coerce_scalar(&self, value: &Value, kind: ScalarKind) -> Result<Decoded, Error> {
        match (kind, value) {
            (_, Value::Null) => Ok(Decoded::Null),

            (ScalarKind::String, Value::String(s)) => Ok(Decoded::String(s.clone())),
            (ScalarKind::String, Value::Number(n)) => Ok(Decoded::String(n.to_string())),

            (ScalarKind::Bool, Value::Bool(b)) => Ok(Decoded::Bool(*b)),
            (ScalarKind::Bool, Value::String(s)) => Ok(Decoded::Bool(is_truthy(s))),
            (ScalarKind::Bool, Value::Number(n)) => Ok(Decoded::Bool(number_is_truthy(n))),

            (ScalarKind::Int, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Decoded::Int)
                .ok_or_else(|| self.type_mismatch(kind.name(), value)),
            (ScalarKind::Int, Value::String(s)) => {
                let text = s.trim();
                text.parse::<i64>()
                    .map(Decoded::Int)
                    .or_else(|_| text.parse::<f64>().map(|f| Decoded::Int(f as i64)))
                    .map_err(|_| self.type_mismatch(kind.name(), value))
            }

            (ScalarKind::Float, Value::Number(n)) => n
                .as_f64()
                .map(Decoded::Float)
                .ok_or_else(|| self.type_mismatch(kind.name(), value)),
            (ScalarKind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Decoded::Float)
                .map_err(|_| self.type_mismatch(kind.name(), value)),

            (_, other) => Err(self.type_mismatch(kind.name(), other)),
        }
    }

    /// Decode a timestamp at `path`.
    ///
    /// Arguments:
    /// * `format` - `chrono` strftime format; `None` falls back to
    ///   `Options::datetime_format`.
    ///
    /// Returns: `Decoded::Null` for absent or null locations; a type
    /// mismatch for non-strings; a format error for strings the format does
    /// not accept. Strings without an offset are assumed UTC; date-only
    /// strings become midnight UTC.
    pub fn parse_datetime(
        &mut self,
        tree: &Value,
        path: &str,
        format: Option<&str>,
    ) -> Result<Decoded, Error> {
        let format = format
            .map(str::to_owned)
            .unwrap_or_else(|| self.options.datetime_format.clone());
        self.scoped(path, |p| {
            let Some(value) = locate(tree, path)? else {
                return Ok(Decoded::Null);
            };
            match value {
                Value::Null => Ok(Decoded::Null),
                Value::String(s) => p.parse_timestamp(s, &format),
                other => Err(p.type_mismatch("datetime string", other)),
            }
        })
    }

    fn parse_timestamp(&self, text: &str, format: &str) -> Result<Decoded, Error> {
        use chrono::{DateTime, NaiveDate, NaiveDateTime};

        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(Decoded::DateTime(dt));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Decoded::DateTime(naive.and_utc().fixed_offset()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Decoded::DateTime(midnight.and_utc().fixed_offset()));
            }
        }
        Err(Error::Format {
            format: format.to_owned(),
            value: text.to_owned(),
            pointer: self.pointer.current(),
        })
    }

    /// Pass the subtree at `path` through without interpretation.
    pub fn parse_raw(&mut self, tree: &Value, path: &str) -> Result<Decoded, Error> {
        self.scoped(path, |_| {
            Ok(match locate(tree, path)? {
                None => Decoded::Null,
                Some(value) => Decoded::Raw(value.clone()),
            })
        })
    }

    /// Decode a sequence at `path`, one element at a time.
    ///
    /// Accepts JSON arrays and JSON objects (associative structures); keys
    /// are visited in their original order and preserved in the result.
    /// Elements are parsed at the synthesized sub-path `[<key>]` relative to
    /// the sequence.
    pub fn parse_array(
        &mut self,
        tree: &Value,
        path: &str,
        element: &DataType,
    ) -> Result<Decoded, Error> {
        self.scoped(path, |p| {
            let Some(value) = locate(tree, path)? else {
                return Ok(Decoded::Null);
            };
            match value {
                Value::Null => Ok(Decoded::Null),
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for index in 0..items.len() {
                        let decoded = p.parse_element(value, &format!("[{index}]"), element)?;
                        out.push((ArrayKey::Index(index), decoded));
                    }
                    Ok(Decoded::Array(out))
                }
                Value::Object(map) => {
                    let mut out = Vec::with_capacity(map.len());
                    for key in map.keys() {
                        let decoded = p.parse_element(value, &format!("[{key}]"), element)?;
                        out.push((ArrayKey::Key(key.clone()), decoded));
                    }
                    Ok(Decoded::Array(out))
                }
                other => Err(p.type_mismatch("array", other)),
            }
        })
    }

    fn parse_element(
        &mut self,
        sequence: &Value,
        sub_path: &str,
        element: &DataType,
    ) -> Result<Decoded, Error> {
        match element {
            DataType::Raw => self.parse_raw(sequence, sub_path),
            DataType::Scalar(kind) => self.parse_scalar(sequence, sub_path, *kind),
            DataType::DateTime(format) => {
                self.parse_datetime(sequence, sub_path, format.as_deref())
            }
            DataType::Array(inner) => self.parse_array(sequence, sub_path, inner),
            DataType::Object(type_name) => self.parse_target(sequence, sub_path, type_name),
            DataType::Custom(_) => Err(Error::config(
                "custom-parsed properties cannot be array elements",
            )),
        }
    }

    /// Dispatch a nested `Object` data type on the target's metadata kind.
    fn parse_target(&mut self, tree: &Value, path: &str, type_name: &str) -> Result<Decoded, Error> {
        let metadata = self.factory.metadata_for(type_name)?;
        match &*metadata {
            Metadata::Object(_) => self.parse_object(tree, path, type_name),
            Metadata::Resource(_) => self.parse_resource(tree, path, type_name),
            Metadata::Document(_) => Err(Error::config(format!(
                "`{type_name}` is document metadata and cannot be nested as a property"
            ))),
        }
    }

    /// Decode a plain object at `path`.
    ///
    /// Absent or null locations yield `Decoded::Null`. When the metadata
    /// declares a discriminator, the tag field is read first and the parse
    /// restarts once against the mapped concrete type at the same path; a
    /// second redirect is a configuration error.
    pub fn parse_object(&mut self, tree: &Value, path: &str, type_name: &str) -> Result<Decoded, Error> {
        self.parse_object_dispatching(tree, path, type_name, false)
    }

    fn parse_object_dispatching(
        &mut self,
        tree: &Value,
        path: &str,
        type_name: &str,
        redirected: bool,
    ) -> Result<Decoded, Error> {
        let outcome = self.scoped(path, |p| {
            let Some(value) = locate(tree, path)? else {
                return Ok(Outcome::Done(Decoded::Null));
            };
            if value.is_null() {
                return Ok(Outcome::Done(Decoded::Null));
            }
            let metadata = p.factory.metadata_for(type_name)?;
            let Metadata::Object(object) = &*metadata else {
                return Err(Error::config(format!(
                    "metadata for `{type_name}` is a {}, expected an object",
                    metadata.kind()
                )));
            };
            if let Some(target) = p.redirect_target(value, object.discriminator(), type_name)? {
                if redirected {
                    return Err(redirect_chain_error(type_name, &target));
                }
                return Ok(Outcome::Redirect(target));
            }
            p.populate_object(value, object).map(Outcome::Done)
        })?;
        match outcome {
            Outcome::Done(decoded) => Ok(decoded),
            Outcome::Redirect(target) => self.parse_object_dispatching(tree, path, &target, true),
        }
    }

    fn populate_object(&mut self, value: &Value, object: &ObjectMetadata) -> Result<Decoded, Error> {
        let mut instance = object.construct();
        for property in object.properties() {
            self.parse_property(value, instance.as_mut(), property)?;
        }
        Ok(Decoded::Object(instance))
    }

    /// Decode a JSON-API resource at `path`.
    ///
    /// Follows the same discriminator redirect rule as [`Self::parse_object`],
    /// then validates the subtree's `type` member against the declared
    /// resource name (a mismatch is a conflict) and decodes id, attributes
    /// and relationships in declaration order. Relationship data paths
    /// already carry their `.data` suffix from the metadata builder.
    pub fn parse_resource(&mut self, tree: &Value, path: &str, type_name: &str) -> Result<Decoded, Error> {
        self.parse_resource_dispatching(tree, path, type_name, false)
    }

    fn parse_resource_dispatching(
        &mut self,
        tree: &Value,
        path: &str,
        type_name: &str,
        redirected: bool,
    ) -> Result<Decoded, Error> {
        let outcome = self.scoped(path, |p| {
            let Some(value) = locate(tree, path)? else {
                return Ok(Outcome::Done(Decoded::Null));
            };
            if value.is_null() {
                return Ok(Outcome::Done(Decoded::Null));
            }
            let metadata = p.factory.metadata_for(type_name)?;
            let Metadata::Resource(resource) = &*metadata else {
                return Err(Error::config(format!(
                    "metadata for `{type_name}` is a {}, expected a resource",
                    metadata.kind()
                )));
            };
            if let Some(target) = p.redirect_target(value, resource.discriminator(), type_name)? {
                if redirected {
                    return Err(redirect_chain_error(type_name, &target));
                }
                return Ok(Outcome::Redirect(target));
            }
            p.populate_resource(value, resource).map(Outcome::Done)
        })?;
        match outcome {
            Outcome::Done(decoded) => Ok(decoded),
            Outcome::Redirect(target) => self.parse_resource_dispatching(tree, path, &target, true),
        }
    }

    fn populate_resource(
        &mut self,
        value: &Value,
        resource: &ResourceMetadata,
    ) -> Result<Decoded, Error> {
        self.check_resource_type(value, resource)?;
        let mut instance = resource.construct();
        if let Some(id) = resource.id() {
            self.parse_property(value, instance.as_mut(), id)?;
        }
        for attribute in resource.attributes() {
            self.parse_property(value, instance.as_mut(), attribute)?;
        }
        for relationship in resource.relationships() {
            self.parse_property(value, instance.as_mut(), relationship)?;
        }
        Ok(Decoded::Object(instance))
    }

    fn check_resource_type(&mut self, value: &Value, resource: &ResourceMetadata) -> Result<(), Error> {
        self.scoped("type", |p| match value.get("type") {
            Some(Value::String(actual)) if actual == resource.resource_name() => Ok(()),
            Some(Value::String(actual)) => Err(Error::ResourceType {
                expected: resource.resource_name().to_owned(),
                actual: format!("`{actual}`"),
                pointer: p.pointer.current(),
            }),
            Some(other) => Err(Error::ResourceType {
                expected: resource.resource_name().to_owned(),
                actual: format!("a {}", value_kind(other)),
                pointer: p.pointer.current(),
            }),
            None => Err(Error::ResourceType {
                expected: resource.resource_name().to_owned(),
                actual: "nothing".to_owned(),
                pointer: p.pointer.current(),
            }),
        })
    }

    /// Read the discriminator tag and resolve the redirect target, if any.
    ///
    /// Returns: `Ok(None)` when there is no discriminator or it maps back to
    /// `type_name` itself; the configured discriminator error for unmapped
    /// or absent tags.
    fn redirect_target(
        &mut self,
        value: &Value,
        discriminator: Option<&Discriminator>,
        type_name: &str,
    ) -> Result<Option<String>, Error> {
        let Some(disc) = discriminator else {
            return Ok(None);
        };
        let field = disc.field();
        let tag = self.parse_scalar(value, field.data_path().unwrap_or(""), ScalarKind::String)?;
        let target = match tag {
            Decoded::String(tag) => disc
                .resolve(&tag)
                .map(str::to_owned)
                .ok_or_else(|| disc.unmapped(&tag))?,
            _ => return Err(disc.unmapped("null")),
        };
        if target == type_name {
            return Ok(None);
        }
        Ok(Some(target))
    }

    /// Invoke a custom decoding callback for the value at `path`.
    ///
    /// Arguments:
    /// * `target` - the object being populated; the callback may inspect it.
    ///
    /// Returns: `Decoded::Null` for absent locations; otherwise whatever the
    /// callback produces. Explicit nulls are handed to the callback.
    pub fn parse_callback(
        &mut self,
        tree: &Value,
        path: &str,
        target: &mut dyn Any,
        parser: &CustomParser,
    ) -> Result<Decoded, Error> {
        self.scoped(path, |_| match locate(tree, path)? {
            None => Ok(Decoded::Null),
            Some(value) => parser(target, value),
        })
    }

    /// Decode one declared property of `target` from the enclosing subtree.
    ///
    /// An absent data path skips the property entirely; the target keeps its
    /// default-constructed field value and the setter is not invoked. An
    /// explicit null is decoded and assigned. When one of the active groups
    /// has a loader registered on the property, that loader replaces the
    /// declared data-type dispatch.
    pub fn parse_property(
        &mut self,
        tree: &Value,
        target: &mut dyn Any,
        property: &PropertyMetadata,
    ) -> Result<(), Error> {
        let path = property.data_path().unwrap_or("");
        if !path.is_empty() {
            let expr = PathExpr::parse(path)?;
            if !accessor::has(tree, &expr) {
                return Ok(());
            }
        }
        let decoded = if let Some(loader) = property.loader_for(&self.options.groups) {
            self.parse_callback(tree, path, target, loader)?
        } else {
            match property.data_type() {
                DataType::Raw => self.parse_raw(tree, path)?,
                DataType::Scalar(kind) => self.parse_scalar(tree, path, *kind)?,
                DataType::DateTime(format) => {
                    self.parse_datetime(tree, path, format.as_deref())?
                }
                DataType::Array(element) => self.parse_array(tree, path, element)?,
                DataType::Object(type_name) => self.parse_target(tree, path, type_name)?,
                DataType::Custom(parser) => self.parse_callback(tree, path, target, parser)?,
            }
        };
        (property.setter())(target, decoded)
    }

    /// Decode a whole document into a fresh instance of the document type.
    ///
    /// Resets the pointer stack, so a parser can be reused across documents.
    /// Errors come back as ready-to-serialize [`ApiError`] objects: domain
    /// errors keep their own status, code and pointer; anything else gets
    /// the generic parse-error envelope.
    pub fn parse_document(&mut self, tree: &Value, doc_type: &str) -> Result<Box<dyn Any>, ApiError> {
        self.pointer.clear();
        self.decode_document(tree, doc_type)
            .map_err(|e| e.into_api(&self.pointer.current()))
    }

    /// Typed convenience over [`Self::parse_document`].
    pub fn parse_document_as<T: 'static>(
        &mut self,
        tree: &Value,
        doc_type: &str,
    ) -> Result<Box<T>, ApiError> {
        let instance = self.parse_document(tree, doc_type)?;
        instance.downcast::<T>().map_err(|_| {
            Error::config(format!(
                "document type `{doc_type}` does not decode into a {}",
                std::any::type_name::<T>()
            ))
            .into_api(&self.pointer.current())
        })
    }

    fn decode_document(&mut self, tree: &Value, doc_type: &str) -> Result<Box<dyn Any>, Error> {
        let metadata = self.factory.metadata_for(doc_type)?;
        let Metadata::Document(document) = &*metadata else {
            return Err(Error::config(format!(
                "metadata for `{doc_type}` is a {}, expected a document",
                metadata.kind()
            )));
        };
        let content = document.content();
        let content_path = content.data_path().unwrap_or("");
        let present = content_path.is_empty() || locate(tree, content_path)?.is_some();
        if !present && !document.allow_empty() {
            self.pointer.push(content_path);
            let err = Error::EmptyDocument {
                pointer: self.pointer.current(),
            };
            self.pointer.pop();
            return Err(err);
        }
        let mut instance = document.construct();
        self.parse_property(tree, instance.as_mut(), content)?;
        if let Some(meta) = document.meta() {
            self.parse_property(tree, instance.as_mut(), meta)?;
        }
        Ok(instance)
    }
}

fn redirect_chain_error(type_name: &str, target: &str) -> Error {
    Error::config(format!(
        "discriminator on `{type_name}` redirects to `{target}` after an earlier \
         redirect; at most one hop is allowed"
    ))
}
