//! Immutable descriptors that tell the parser how to decode each type.
//!
//! Metadata is built once (builder calls at startup, or a registration
//! table), handed out as `Rc<Metadata>` by a [`crate::factory::MetadataFactory`],
//! and never mutated afterwards. Field assignment goes through [`Setter`]
//! closures resolved at build time, so the parser itself needs no reflection
//! and no string-based field access.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;

use crate::decoded::Decoded;
use crate::error::Error;

/// Assigns one decoded value to a field of the target object.
pub type Setter = Rc<dyn Fn(&mut dyn Any, Decoded) -> Result<(), Error>>;

/// Produces a fresh, default-initialized instance of the owning type.
pub type Constructor = Rc<dyn Fn() -> Box<dyn Any>>;

/// A user-supplied decoding callback for `custom`-typed properties.
///
/// Receives the object being populated and the raw subtree; its result flows
/// through the property's setter like any other decoded value.
pub type CustomParser = Rc<dyn Fn(&mut dyn Any, &Value) -> Result<Decoded, Error>>;

/// Wrap a typed assignment closure into a [`Setter`].
///
/// The downcast is resolved here, once per registration; a target of the
/// wrong type at call time means the metadata was registered against the
/// wrong constructor and surfaces as a configuration error.
pub fn setter<T: 'static>(
    assign: impl Fn(&mut T, Decoded) -> Result<(), Error> + 'static,
) -> Setter {
    Rc::new(move |target: &mut dyn Any, value: Decoded| {
        let target = target.downcast_mut::<T>().ok_or_else(|| {
            Error::config(format!(
                "setter target is not a {}",
                std::any::type_name::<T>()
            ))
        })?;
        assign(target, value)
    })
}

/// A [`Constructor`] for any default-constructible type.
pub fn constructor<T: Default + 'static>() -> Constructor {
    Rc::new(|| Box::new(T::default()))
}

/// Wrap a typed callback into a [`CustomParser`].
pub fn callback<T: 'static>(
    parse: impl Fn(&mut T, &Value) -> Result<Decoded, Error> + 'static,
) -> CustomParser {
    Rc::new(move |target: &mut dyn Any, value: &Value| {
        let target = target.downcast_mut::<T>().ok_or_else(|| {
            Error::config(format!(
                "callback target is not a {}",
                std::any::type_name::<T>()
            ))
        })?;
        parse(target, value)
    })
}

/// Primitive kinds a `scalar` property can declare.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScalarKind {
    String,
    Bool,
    Int,
    Float,
}

impl ScalarKind {
    /// Diagnostic name, matching the vocabulary of [`Decoded::kind`].
    pub(crate) fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Bool => "boolean",
            ScalarKind::Int => "integer",
            ScalarKind::Float => "float",
        }
    }
}

/// Declared shape of one property's value.
#[derive(Clone)]
pub enum DataType {
    /// Pass the subtree through unconverted.
    Raw,
    Scalar(ScalarKind),
    /// Timestamp with an optional format override; `None` falls back to
    /// `Options::datetime_format`.
    DateTime(Option<String>),
    /// Sequence (or associative structure) of the given element type.
    Array(Box<DataType>),
    /// Nested object or resource, named by its registered type name.
    Object(String),
    /// User callback, invoked with the raw subtree.
    Custom(CustomParser),
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Raw => f.write_str("Raw"),
            DataType::Scalar(kind) => f.debug_tuple("Scalar").field(kind).finish(),
            DataType::DateTime(format) => f.debug_tuple("DateTime").field(format).finish(),
            DataType::Array(element) => f.debug_tuple("Array").field(element).finish(),
            DataType::Object(name) => f.debug_tuple("Object").field(name).finish(),
            DataType::Custom(_) => f.write_str("Custom(<callback>)"),
        }
    }
}

/// One declared field mapping.
///
/// Built with [`PropertyMetadata::new`] plus the `with_*` steps; the data
/// path defaults to the property name.
#[derive(Clone)]
pub struct PropertyMetadata {
    name: String,
    owner: String,
    data_type: DataType,
    data_path: Option<String>,
    setter: Setter,
    groups: Vec<String>,
    loaders: Vec<(String, CustomParser)>,
}

impl PropertyMetadata {
    /// Declare a property of `owner` named `name`.
    ///
    /// Arguments:
    /// * `owner` - registered type name of the declaring type, for diagnostics.
    /// * `name` - field identifier on the owning type; doubles as the default
    ///   data path.
    /// * `data_type` - declared value shape.
    /// * `setter` - assignment capability, see [`setter`].
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
        setter: Setter,
    ) -> Self {
        let name = name.into();
        Self {
            data_path: Some(name.clone()),
            name,
            owner: owner.into(),
            data_type,
            setter,
            groups: Vec::new(),
            loaders: Vec::new(),
        }
    }

    /// Read the value from `path` instead of the property name.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Read the enclosing subtree itself instead of a member of it.
    pub fn with_whole_subtree(mut self) -> Self {
        self.data_path = None;
        self
    }

    /// Serialization groups this property belongs to.
    ///
    /// Informational for decoding; groups only select [per-group
    /// loaders](Self::with_loader).
    pub fn with_groups(
        mut self,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Override decoding with `parser` whenever `group` is active.
    ///
    /// Returns: a configuration error when `group` already has a loader on
    /// this property.
    pub fn with_loader(
        mut self,
        group: impl Into<String>,
        parser: CustomParser,
    ) -> Result<Self, Error> {
        let group = group.into();
        if self.loaders.iter().any(|(g, _)| *g == group) {
            return Err(Error::config(format!(
                "duplicate loader for group `{group}` on {}.{}",
                self.owner, self.name
            )));
        }
        self.loaders.push((group, parser));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Where to read the value from, relative to the enclosing subtree.
    /// `None` means the subtree itself.
    pub fn data_path(&self) -> Option<&str> {
        self.data_path.as_deref()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub(crate) fn setter(&self) -> &Setter {
        &self.setter
    }

    /// The loader for the first of `active` groups that has one registered.
    pub(crate) fn loader_for(&self, active: &[String]) -> Option<&CustomParser> {
        active
            .iter()
            .find_map(|group| self.loaders.iter().find(|(g, _)| g == group))
            .map(|(_, parser)| parser)
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("data_type", &self.data_type)
            .field("data_path", &self.data_path)
            .field("groups", &self.groups)
            .field(
                "loaders",
                &self.loaders.iter().map(|(g, _)| g.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Selects the concrete type among a family of related types.
pub struct Discriminator {
    field: PropertyMetadata,
    map: AHashMap<String, String>,
    error_message: String,
}

impl Discriminator {
    /// Declare a discriminator rule.
    ///
    /// Arguments:
    /// * `field` - the property carrying the tag; must be declared
    ///   `Scalar(String)`.
    /// * `map` - tag value to registered type name.
    /// * `error_message` - message for unmapped or absent tags; the literal
    ///   `{value}` is substituted with the offending tag.
    pub fn new(
        field: PropertyMetadata,
        map: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        error_message: impl Into<String>,
    ) -> Result<Self, Error> {
        if !matches!(field.data_type(), DataType::Scalar(ScalarKind::String)) {
            return Err(Error::config(format!(
                "discriminator field {}.{} must be a string scalar, found {:?}",
                field.owner(),
                field.name(),
                field.data_type()
            )));
        }
        Ok(Self {
            field,
            map: map
                .into_iter()
                .map(|(value, target)| (value.into(), target.into()))
                .collect(),
            error_message: error_message.into(),
        })
    }

    pub fn field(&self) -> &PropertyMetadata {
        &self.field
    }

    /// The concrete type name mapped to `value`, if any.
    pub fn resolve(&self, value: &str) -> Option<&str> {
        self.map.get(value).map(String::as_str)
    }

    /// Mapped target type names, for build-time validation.
    pub(crate) fn targets(&self) -> impl Iterator<Item = &str> {
        self.map.values().map(String::as_str)
    }

    /// The configured error for an unmapped (or absent) tag value.
    pub(crate) fn unmapped(&self, value: &str) -> Error {
        Error::config(self.error_message.replace("{value}", value))
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discriminator")
            .field("field", &self.field.name())
            .field("map", &self.map)
            .finish()
    }
}

/// Replace a same-named entry in place, or append. Declaration order of the
/// surviving entries is preserved.
fn upsert(properties: &mut Vec<PropertyMetadata>, property: PropertyMetadata) {
    match properties.iter_mut().find(|p| p.name() == property.name()) {
        Some(slot) => *slot = property,
        None => properties.push(property),
    }
}

/// Descriptor of a plain (non-resource) object.
pub struct ObjectMetadata {
    type_name: String,
    constructor: Constructor,
    properties: Vec<PropertyMetadata>,
    discriminator: Option<Discriminator>,
}

impl ObjectMetadata {
    pub fn new(type_name: impl Into<String>, constructor: Constructor) -> Self {
        Self {
            type_name: type_name.into(),
            constructor,
            properties: Vec::new(),
            discriminator: None,
        }
    }

    /// Add a property; a property with the same name is replaced in place.
    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        upsert(&mut self.properties, property);
        self
    }

    pub fn with_discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    pub(crate) fn construct(&self) -> Box<dyn Any> {
        (self.constructor)()
    }
}

impl fmt::Debug for ObjectMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMetadata")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .field("discriminator", &self.discriminator)
            .finish()
    }
}

/// Descriptor of a JSON-API resource.
///
/// The builder composes data paths at declaration time: attributes read from
/// `attributes.<path>`, relationships from `relationships.<path>.data`. The
/// parser never re-applies these prefixes.
pub struct ResourceMetadata {
    type_name: String,
    resource_name: String,
    constructor: Constructor,
    id: Option<PropertyMetadata>,
    attributes: Vec<PropertyMetadata>,
    relationships: Vec<PropertyMetadata>,
    discriminator: Option<Discriminator>,
}

impl ResourceMetadata {
    /// Declare a resource.
    ///
    /// Arguments:
    /// * `type_name` - registered type name (factory key).
    /// * `resource_name` - the JSON-API `type` value this resource answers to.
    pub fn new(
        type_name: impl Into<String>,
        resource_name: impl Into<String>,
        constructor: Constructor,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            resource_name: resource_name.into(),
            constructor,
            id: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
            discriminator: None,
        }
    }

    /// The resource's id field; reads from `id` unless the property declares
    /// another path.
    pub fn with_id(mut self, property: PropertyMetadata) -> Self {
        self.id = Some(property);
        self
    }

    /// Add an attribute; its data path becomes `attributes.<path-or-name>`.
    pub fn with_attribute(mut self, mut property: PropertyMetadata) -> Self {
        let inner = property
            .data_path
            .take()
            .unwrap_or_else(|| property.name.clone());
        property.data_path = Some(format!("attributes.{inner}"));
        upsert(&mut self.attributes, property);
        self
    }

    /// Add a relationship; its data path becomes
    /// `relationships.<path-or-name>.data`.
    pub fn with_relationship(mut self, mut property: PropertyMetadata) -> Self {
        let inner = property
            .data_path
            .take()
            .unwrap_or_else(|| property.name.clone());
        property.data_path = Some(format!("relationships.{inner}.data"));
        upsert(&mut self.relationships, property);
        self
    }

    pub fn with_discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The JSON-API `type` value this resource answers to.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn id(&self) -> Option<&PropertyMetadata> {
        self.id.as_ref()
    }

    pub fn attributes(&self) -> &[PropertyMetadata] {
        &self.attributes
    }

    pub fn relationships(&self) -> &[PropertyMetadata] {
        &self.relationships
    }

    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    pub(crate) fn construct(&self) -> Box<dyn Any> {
        (self.constructor)()
    }
}

impl fmt::Debug for ResourceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMetadata")
            .field("type_name", &self.type_name)
            .field("resource_name", &self.resource_name)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("relationships", &self.relationships)
            .field("discriminator", &self.discriminator)
            .finish()
    }
}

/// Descriptor of a whole document.
pub struct DocumentMetadata {
    type_name: String,
    constructor: Constructor,
    content: PropertyMetadata,
    meta: Option<PropertyMetadata>,
    allow_empty: bool,
}

impl DocumentMetadata {
    /// Declare a document whose payload is described by `content`
    /// (conventionally reading from the `data` member).
    pub fn new(
        type_name: impl Into<String>,
        constructor: Constructor,
        content: PropertyMetadata,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            constructor,
            content,
            meta: None,
            allow_empty: false,
        }
    }

    pub fn with_meta(mut self, property: PropertyMetadata) -> Self {
        self.meta = Some(property);
        self
    }

    /// Accept documents whose content location is absent. Off by default.
    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn content(&self) -> &PropertyMetadata {
        &self.content
    }

    pub fn meta(&self) -> Option<&PropertyMetadata> {
        self.meta.as_ref()
    }

    pub fn allow_empty(&self) -> bool {
        self.allow_empty
    }

    pub(crate) fn construct(&self) -> Box<dyn Any> {
        (self.constructor)()
    }
}

impl fmt::Debug for DocumentMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentMetadata")
            .field("type_name", &self.type_name)
            .field("content", &self.content)
            .field("meta", &self.meta)
            .field("allow_empty", &self.allow_empty)
            .finish()
    }
}

/// What the metadata factory hands out.
#[derive(Debug)]
pub enum Metadata {
    Object(ObjectMetadata),
    Resource(ResourceMetadata),
    Document(DocumentMetadata),
}

impl Metadata {
    pub fn type_name(&self) -> &str {
        match self {
            Metadata::Object(m) => m.type_name(),
            Metadata::Resource(m) => m.type_name(),
            Metadata::Document(m) => m.type_name(),
        }
    }

    /// Diagnostic name of the metadata kind.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Metadata::Object(_) => "object",
            Metadata::Resource(_) => "resource",
            Metadata::Document(_) => "document",
        }
    }

    pub(crate) fn discriminator(&self) -> Option<&Discriminator> {
        match self {
            Metadata::Object(m) => m.discriminator(),
            Metadata::Resource(m) => m.discriminator(),
            Metadata::Document(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Pet {
        name: String,
    }

    fn name_property() -> PropertyMetadata {
        PropertyMetadata::new(
            "Pet",
            "name",
            DataType::Scalar(ScalarKind::String),
            setter(|pet: &mut Pet, value| {
                pet.name = value.into_string()?.unwrap_or_default();
                Ok(())
            }),
        )
    }

    #[test]
    fn data_path_defaults_to_the_property_name() {
        assert_eq!(name_property().data_path(), Some("name"));
        assert_eq!(name_property().with_path("nick").data_path(), Some("nick"));
        assert_eq!(name_property().with_whole_subtree().data_path(), None);
    }

    #[test]
    fn attribute_paths_are_prefixed() {
        let zip = PropertyMetadata::new(
            "Pet",
            "zip",
            DataType::Scalar(ScalarKind::String),
            setter(|_: &mut Pet, _| Ok(())),
        );
        let resource = ResourceMetadata::new("Pet", "pets", constructor::<Pet>())
            .with_attribute(name_property())
            .with_attribute(zip.with_path("address.zip"));
        assert_eq!(resource.attributes()[0].data_path(), Some("attributes.name"));
        assert_eq!(
            resource.attributes()[1].data_path(),
            Some("attributes.address.zip")
        );
    }

    #[test]
    fn relationship_paths_get_the_data_suffix() {
        let resource = ResourceMetadata::new("Pet", "pets", constructor::<Pet>())
            .with_relationship(name_property().with_path("store"));
        assert_eq!(
            resource.relationships()[0].data_path(),
            Some("relationships.store.data")
        );
    }

    #[test]
    fn same_named_property_is_replaced_in_place() {
        let object = ObjectMetadata::new("Pet", constructor::<Pet>())
            .with_property(name_property())
            .with_property(name_property().with_path("other"))
            .with_property(
                PropertyMetadata::new(
                    "Pet",
                    "age",
                    DataType::Scalar(ScalarKind::Int),
                    setter(|_: &mut Pet, _| Ok(())),
                ),
            );
        assert_eq!(object.properties().len(), 2);
        assert_eq!(object.properties()[0].data_path(), Some("other"));
        assert_eq!(object.properties()[1].name(), "age");
    }

    #[test]
    fn duplicate_loader_group_is_rejected() {
        let load = callback(|_: &mut Pet, _| Ok(Decoded::Null));
        let err = name_property()
            .with_loader("Admin", load.clone())
            .unwrap()
            .with_loader("Admin", load)
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Admin"));
    }

    #[test]
    fn loader_selection_follows_active_group_order() {
        let admin = callback(|_: &mut Pet, _| Ok(Decoded::Int(1)));
        let default = callback(|_: &mut Pet, _| Ok(Decoded::Int(2)));
        let property = name_property()
            .with_loader("Admin", admin)
            .unwrap()
            .with_loader("Default", default)
            .unwrap();

        let active = vec!["Default".to_owned(), "Admin".to_owned()];
        let picked = property.loader_for(&active).unwrap();
        let mut pet = Pet::default();
        let value = picked(&mut pet, &serde_json::Value::Null).unwrap();
        assert!(matches!(value, Decoded::Int(2)));

        assert!(property.loader_for(&["Other".to_owned()]).is_none());
    }

    #[test]
    fn discriminator_requires_a_string_scalar_field() {
        let not_a_string = PropertyMetadata::new(
            "Animal",
            "kind",
            DataType::Scalar(ScalarKind::Int),
            setter(|_: &mut Pet, _| Ok(())),
        );
        let err = Discriminator::new(not_a_string, [("cat", "Cat")], "bad {value}").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn discriminator_substitutes_the_offending_value() {
        let disc = Discriminator::new(
            name_property(),
            [("cat", "Cat"), ("dog", "Dog")],
            "unknown animal `{value}`",
        )
        .unwrap();
        assert_eq!(disc.resolve("dog"), Some("Dog"));
        assert_eq!(disc.resolve("fox"), None);
        let err = disc.unmapped("fox");
        assert!(err.to_string().contains("unknown animal `fox`"));
    }

    #[test]
    fn setter_rejects_a_foreign_target() {
        let property = name_property();
        let mut not_a_pet = 42u32;
        let err = (property.setter())(&mut not_a_pet, Decoded::String("Rex".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
