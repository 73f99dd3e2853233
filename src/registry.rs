//! Named decoder/encoder lookup with lazy, memoized instantiation.
//!
//! Registration happens up front through `&mut self`; resolution is `&self`
//! and caches the instance produced by the first successful factory call.
//! The single-threaded model keeps memoization a plain `RefCell`; callers
//! sharing a registry across threads must synchronize externally.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;

use crate::error::{ApiError, CodecKind, Error};

/// Decoding capability: turns a document tree into a domain object.
pub trait Decoder {
    fn decode(&self, tree: &Value) -> Result<Box<dyn Any>, ApiError>;
}

/// Encoding capability: turns a domain object back into a document tree.
pub trait Encoder {
    fn encode(&self, object: &dyn Any) -> Result<Value, ApiError>;
}

type DecoderFactory = Box<dyn Fn() -> Result<Rc<dyn Decoder>, Error>>;
type EncoderFactory = Box<dyn Fn() -> Result<Rc<dyn Encoder>, Error>>;

struct DecoderEntry {
    factory: DecoderFactory,
    instance: RefCell<Option<Rc<dyn Decoder>>>,
}

struct EncoderEntry {
    factory: EncoderFactory,
    instance: RefCell<Option<Rc<dyn Encoder>>>,
}

/// Registry of named codec factories, memoized per name.
#[derive(Default)]
pub struct CodecRegistry {
    decoders: AHashMap<String, DecoderEntry>,
    encoders: AHashMap<String, EncoderEntry>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder factory under `name`.
    ///
    /// The factory runs at most once, on first resolution. Registering a
    /// name twice is a configuration error.
    pub fn register_decoder(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Result<Rc<dyn Decoder>, Error> + 'static,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.decoders.contains_key(&name) {
            return Err(duplicate(CodecKind::Decoder, &name));
        }
        self.decoders.insert(
            name,
            DecoderEntry {
                factory: Box::new(factory),
                instance: RefCell::new(None),
            },
        );
        Ok(())
    }

    /// Register an encoder factory under `name`.
    pub fn register_encoder(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Result<Rc<dyn Encoder>, Error> + 'static,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.encoders.contains_key(&name) {
            return Err(duplicate(CodecKind::Encoder, &name));
        }
        self.encoders.insert(
            name,
            EncoderEntry {
                factory: Box::new(factory),
                instance: RefCell::new(None),
            },
        );
        Ok(())
    }

    /// Resolve the decoder registered under `name`.
    ///
    /// Returns: the memoized instance; `NotFound` for unregistered names;
    /// `InvalidInstance` when the factory fails.
    pub fn decoder(&self, name: &str) -> Result<Rc<dyn Decoder>, Error> {
        let entry = self.decoders.get(name).ok_or_else(|| Error::NotFound {
            kind: CodecKind::Decoder,
            name: name.to_owned(),
        })?;
        {
            let cached = entry.instance.borrow();
            if let Some(instance) = cached.as_ref() {
                return Ok(Rc::clone(instance));
            }
        }
        let instance = (entry.factory)().map_err(|e| Error::InvalidInstance {
            kind: CodecKind::Decoder,
            name: name.to_owned(),
            detail: e.to_string(),
        })?;
        *entry.instance.borrow_mut() = Some(Rc::clone(&instance));
        Ok(instance)
    }

    /// Resolve the encoder registered under `name`.
    pub fn encoder(&self, name: &str) -> Result<Rc<dyn Encoder>, Error> {
        let entry = self.encoders.get(name).ok_or_else(|| Error::NotFound {
            kind: CodecKind::Encoder,
            name: name.to_owned(),
        })?;
        {
            let cached = entry.instance.borrow();
            if let Some(instance) = cached.as_ref() {
                return Ok(Rc::clone(instance));
            }
        }
        let instance = (entry.factory)().map_err(|e| Error::InvalidInstance {
            kind: CodecKind::Encoder,
            name: name.to_owned(),
            detail: e.to_string(),
        })?;
        *entry.instance.borrow_mut() = Some(Rc::clone(&instance));
        Ok(instance)
    }
}

fn duplicate(kind: CodecKind, name: &str) -> Error {
    Error::config(format!("{kind} `{name}` is already registered"))
}
