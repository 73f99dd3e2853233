//! Resolution of registered type names to their metadata descriptors.
//!
//! The parser only sees the [`MetadataFactory`] trait; [`MetadataRegistry`]
//! is the stock implementation, a registration table filled at startup and
//! checked once with [`MetadataRegistry::validate`] before parsing begins.
//! Descriptors are stored as `Rc<Metadata>`, so every lookup hands out the
//! same cached instance.

use std::rc::Rc;

use ahash::AHashMap;

use crate::error::Error;
use crate::metadata::{DataType, Metadata, PropertyMetadata};

/// Synchronous, memoized metadata lookup.
pub trait MetadataFactory {
    /// Returns: the descriptor registered under `type_name`, or a
    /// configuration error for unknown names. Must be deterministic; the
    /// factory owns and caches its descriptors.
    fn metadata_for(&self, type_name: &str) -> Result<Rc<Metadata>, Error>;
}

/// The stock [`MetadataFactory`]: an eagerly filled registration table.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: AHashMap<String, Rc<Metadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its own type name.
    ///
    /// Returns: a configuration error when the name is already taken.
    pub fn register(&mut self, metadata: Metadata) -> Result<(), Error> {
        let name = metadata.type_name().to_owned();
        if self.entries.contains_key(&name) {
            return Err(Error::config(format!(
                "metadata for type `{name}` is already registered"
            )));
        }
        self.entries.insert(name, Rc::new(metadata));
        Ok(())
    }

    /// Cross-check the whole table after registration.
    ///
    /// Rejects properties referencing unregistered object types, dangling
    /// discriminator targets, targets of the wrong metadata kind, and
    /// discriminator chains longer than one redirection hop.
    pub fn validate(&self) -> Result<(), Error> {
        for metadata in self.entries.values() {
            for property in properties_of(metadata) {
                self.check_data_type(property.owner(), property.name(), property.data_type())?;
            }
            let Some(disc) = metadata.discriminator() else {
                continue;
            };
            for target in disc.targets() {
                let concrete = self.entries.get(target).ok_or_else(|| {
                    Error::config(format!(
                        "discriminator on `{}` maps to unregistered type `{target}`",
                        metadata.type_name()
                    ))
                })?;
                if concrete.kind() != metadata.kind() {
                    return Err(Error::config(format!(
                        "discriminator on `{}` maps to `{target}`, a {} (expected a {})",
                        metadata.type_name(),
                        concrete.kind(),
                        metadata.kind()
                    )));
                }
                if target != metadata.type_name()
                    && concrete
                        .discriminator()
                        .is_some_and(|next| next.targets().any(|t| t != target))
                {
                    return Err(Error::config(format!(
                        "discriminator chain starting at `{}`: `{target}` redirects \
                         further, at most one hop is allowed",
                        metadata.type_name()
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_data_type(&self, owner: &str, name: &str, data_type: &DataType) -> Result<(), Error> {
        match data_type {
            DataType::Object(target) if !self.entries.contains_key(target) => {
                Err(Error::config(format!(
                    "property {owner}.{name} references unregistered type `{target}`"
                )))
            }
            DataType::Array(element) => self.check_data_type(owner, name, element),
            _ => Ok(()),
        }
    }
}

impl MetadataFactory for MetadataRegistry {
    fn metadata_for(&self, type_name: &str) -> Result<Rc<Metadata>, Error> {
        self.entries.get(type_name).cloned().ok_or_else(|| {
            Error::config(format!("no metadata registered for type `{type_name}`"))
        })
    }
}

/// Every property a descriptor declares, regardless of its kind.
fn properties_of(metadata: &Metadata) -> Box<dyn Iterator<Item = &PropertyMetadata> + '_> {
    match metadata {
        Metadata::Object(m) => Box::new(m.properties().iter()),
        Metadata::Resource(m) => Box::new(
            m.id()
                .into_iter()
                .chain(m.attributes())
                .chain(m.relationships()),
        ),
        Metadata::Document(m) => Box::new([m.content()].into_iter().chain(m.meta())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        constructor, setter, Discriminator, ObjectMetadata, ScalarKind,
    };

    #[derive(Default)]
    struct Animal;

    fn discard() -> crate::metadata::Setter {
        setter(|_: &mut Animal, _| Ok(()))
    }

    fn kind_field(owner: &str) -> PropertyMetadata {
        PropertyMetadata::new(owner, "kind", DataType::Scalar(ScalarKind::String), discard())
    }

    fn object(name: &str) -> ObjectMetadata {
        ObjectMetadata::new(name, constructor::<Animal>())
    }

    fn registry(entries: impl IntoIterator<Item = Metadata>) -> MetadataRegistry {
        let mut registry = MetadataRegistry::new();
        for metadata in entries {
            registry.register(metadata).unwrap();
        }
        registry
    }

    #[test]
    fn lookup_returns_the_same_cached_instance() {
        let registry = registry([Metadata::Object(object("Animal"))]);
        let first = registry.metadata_for("Animal").unwrap();
        let second = registry.metadata_for("Animal").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let registry = MetadataRegistry::new();
        let err = registry.metadata_for("Ghost").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = registry([Metadata::Object(object("Animal"))]);
        let err = registry
            .register(Metadata::Object(object("Animal")))
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn validate_accepts_a_single_hop() {
        let base = object("Animal").with_discriminator(
            Discriminator::new(
                kind_field("Animal"),
                [("cat", "Cat"), ("dog", "Dog")],
                "unknown `{value}`",
            )
            .unwrap(),
        );
        let registry = registry([
            Metadata::Object(base),
            Metadata::Object(object("Cat")),
            Metadata::Object(object("Dog")),
        ]);
        registry.validate().unwrap();
    }

    #[test]
    fn validate_rejects_dangling_targets() {
        let base = object("Animal").with_discriminator(
            Discriminator::new(kind_field("Animal"), [("cat", "Cat")], "unknown `{value}`")
                .unwrap(),
        );
        let registry = registry([Metadata::Object(base)]);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("Cat"));
    }

    #[test]
    fn validate_rejects_chains_but_allows_self_maps() {
        // Cat redirects onward to Tiger: two hops from Animal.
        let base = object("Animal").with_discriminator(
            Discriminator::new(kind_field("Animal"), [("cat", "Cat")], "unknown `{value}`")
                .unwrap(),
        );
        let cat = object("Cat").with_discriminator(
            Discriminator::new(kind_field("Cat"), [("cat", "Tiger")], "unknown `{value}`")
                .unwrap(),
        );
        let registry = registry([
            Metadata::Object(base),
            Metadata::Object(cat),
            Metadata::Object(object("Tiger")),
        ]);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("one hop"));

        // A target whose own discriminator maps back to itself is fine.
        let base = object("Animal").with_discriminator(
            Discriminator::new(kind_field("Animal"), [("cat", "Cat")], "unknown `{value}`")
                .unwrap(),
        );
        let cat = object("Cat").with_discriminator(
            Discriminator::new(kind_field("Cat"), [("cat", "Cat")], "unknown `{value}`")
                .unwrap(),
        );
        self::registry([Metadata::Object(base), Metadata::Object(cat)])
            .validate()
            .unwrap();
    }

    #[test]
    fn validate_rejects_unregistered_property_targets() {
        let holder = object("Holder").with_property(PropertyMetadata::new(
            "Holder",
            "pet",
            DataType::Array(Box::new(DataType::Object("Pet".into()))),
            discard(),
        ));
        let registry = registry([Metadata::Object(holder)]);
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("Holder.pet"));
        assert!(err.to_string().contains("Pet"));
    }
}
