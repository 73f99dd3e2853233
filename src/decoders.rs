//! Stock codecs: the parser-backed document decoder and raw passthroughs.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{ApiError, Error};
use crate::factory::MetadataFactory;
use crate::options::Options;
use crate::parser::DataParser;
use crate::registry::{Decoder, Encoder};

/// Decodes whole documents of one registered document type through a
/// [`DataParser`].
///
/// The decoder owns its parser (pointer stack included); `decode` takes
/// `&self` by contract, so the parser sits behind a `RefCell`.
pub struct DocumentDecoder {
    parser: RefCell<DataParser>,
    doc_type: String,
}

impl DocumentDecoder {
    pub fn new(
        factory: Rc<dyn MetadataFactory>,
        doc_type: impl Into<String>,
        options: Options,
    ) -> Self {
        Self {
            parser: RefCell::new(DataParser::new(factory, options)),
            doc_type: doc_type.into(),
        }
    }
}

impl Decoder for DocumentDecoder {
    fn decode(&self, tree: &Value) -> Result<Box<dyn Any>, ApiError> {
        self.parser.borrow_mut().parse_document(tree, &self.doc_type)
    }
}

/// Hands the tree back unchanged, boxed as a [`serde_json::Value`].
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn decode(&self, tree: &Value) -> Result<Box<dyn Any>, ApiError> {
        Ok(Box::new(tree.clone()))
    }
}

/// Counterpart of [`RawDecoder`]: expects the object to be a
/// [`serde_json::Value`] and hands it back unchanged.
pub struct RawEncoder;

impl Encoder for RawEncoder {
    fn encode(&self, object: &dyn Any) -> Result<Value, ApiError> {
        object
            .downcast_ref::<Value>()
            .cloned()
            .ok_or_else(|| Error::msg("raw encoder expects a serde_json::Value").into_api("/"))
    }
}
