//! Codec factories and the content-type keyed registries that select them.
//!
//! A registry is itself a factory: it normalises the requested content type
//! (see [`ContentType`]) and delegates to the factory registered for it. Each
//! registry kind has one process-wide default that exists from the first
//! access; codecs registered into it at startup become visible to every
//! holder, including adapters built earlier. Lookups never lock. Adapters
//! bind to the defaults only when no registry is injected explicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::serialization::{ParseNode, SerializationWriter};
use crate::{ContentType, SerializationError};

// ---------------------------------------------------------------------------
// Factory contracts
// ---------------------------------------------------------------------------

/// Creates parse nodes for one content type.
pub trait ParseNodeFactory: Send + Sync {
    /// The content type this factory parses.
    fn valid_content_type(&self) -> Result<&str, SerializationError>;

    /// Parses `content` and returns a cursor on its root.
    fn get_root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError>;
}

/// Creates serialization writers for one content type.
pub trait SerializationWriterFactory: Send + Sync {
    /// The content type this factory writes.
    fn valid_content_type(&self) -> Result<&str, SerializationError>;

    /// Returns a fresh, empty writer.
    fn get_serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError>;
}

/// Checks that `content_type` normalises to `expected`.
///
/// Codec factories call this before producing a node or writer.
pub fn ensure_content_type(content_type: &str, expected: &str) -> Result<(), SerializationError> {
    let requested = ContentType::parse(content_type);
    if requested.as_str() == expected {
        Ok(())
    } else {
        Err(SerializationError::UnsupportedMediaType {
            content_type: requested.as_str().to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Parse node factory registry
// ---------------------------------------------------------------------------

type FactoryMap<F> = HashMap<ContentType, Arc<F>>;

static DEFAULT_PARSE_NODE_FACTORY: OnceLock<Arc<ParseNodeFactoryRegistry>> = OnceLock::new();
static PARSE_NODE_DEFAULT_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Dispatches [`ParseNodeFactory`] calls by content type.
///
/// Registration takes `&self`: the table is swapped atomically, so holders of
/// a shared registry see factories registered after they obtained it.
pub struct ParseNodeFactoryRegistry {
    factories: ArcSwap<FactoryMap<dyn ParseNodeFactory>>,
}

impl Default for ParseNodeFactoryRegistry {
    fn default() -> Self {
        Self {
            factories: ArcSwap::from_pointee(HashMap::new()),
        }
    }
}

impl Clone for ParseNodeFactoryRegistry {
    /// Copies the current table; later registrations are not shared.
    fn clone(&self) -> Self {
        Self {
            factories: ArcSwap::new(self.factories.load_full()),
        }
    }
}

impl ParseNodeFactoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under its own [`ParseNodeFactory::valid_content_type`].
    pub fn register(
        &self,
        factory: Arc<dyn ParseNodeFactory>,
    ) -> Result<&Self, SerializationError> {
        let content_type = ContentType::parse(factory.valid_content_type()?);
        Ok(self.register_for(content_type, factory))
    }

    /// Registers `factory` under an explicit content type. Replaces any
    /// factory previously registered for the same (normalised) type.
    ///
    /// Registering for the empty content type makes responses without a
    /// `Content-Type` header decodable.
    pub fn register_for(
        &self,
        content_type: impl Into<ContentType>,
        factory: Arc<dyn ParseNodeFactory>,
    ) -> &Self {
        let content_type = content_type.into();
        debug!(content_type = %content_type, "Registered parse node factory");
        self.factories.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(content_type.clone(), Arc::clone(&factory));
            next
        });
        self
    }

    /// Returns the factory registered for `content_type`, after normalisation.
    pub fn get(&self, content_type: &str) -> Option<Arc<dyn ParseNodeFactory>> {
        self.factories
            .load()
            .get(&ContentType::parse(content_type))
            .cloned()
    }

    /// Registered content types, sorted.
    pub fn content_types(&self) -> Vec<String> {
        sorted_keys(self.factories.load().keys())
    }

    /// The process-wide default registry.
    ///
    /// Always the same instance: an adapter bound to it before any codec is
    /// registered still sees codecs registered later.
    pub fn default_instance() -> Arc<Self> {
        Arc::clone(DEFAULT_PARSE_NODE_FACTORY.get_or_init(Default::default))
    }

    /// Copies every factory of `registry` into the process-wide default.
    ///
    /// Succeeds once per process; later calls fail with
    /// [`SerializationError::DefaultAlreadyInstalled`]. Individual factories
    /// can still be added through [`default_instance`](Self::default_instance).
    pub fn install_default(registry: Self) -> Result<Arc<Self>, SerializationError> {
        if PARSE_NODE_DEFAULT_INSTALLED.swap(true, Ordering::AcqRel) {
            return Err(SerializationError::DefaultAlreadyInstalled {
                kind: "parse node factory",
            });
        }
        let default = Self::default_instance();
        for (content_type, factory) in registry.factories.load().iter() {
            default.register_for(content_type.clone(), Arc::clone(factory));
        }
        Ok(default)
    }
}

impl ParseNodeFactory for ParseNodeFactoryRegistry {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Err(SerializationError::MultipleContentTypes)
    }

    fn get_root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError> {
        let normalized = ContentType::parse(content_type);
        match self.get(normalized.as_str()) {
            Some(factory) => factory.get_root_parse_node(normalized.as_str(), content),
            None => Err(SerializationError::UnsupportedMediaType {
                content_type: normalized.as_str().to_owned(),
            }),
        }
    }
}

impl std::fmt::Debug for ParseNodeFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseNodeFactoryRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

fn sorted_keys<'a>(content_types: impl Iterator<Item = &'a ContentType>) -> Vec<String> {
    let mut types: Vec<String> = content_types
        .map(|content_type| content_type.as_str().to_owned())
        .collect();
    types.sort_unstable();
    types
}

// ---------------------------------------------------------------------------
// Serialization writer factory registry
// ---------------------------------------------------------------------------

static DEFAULT_SERIALIZATION_WRITER_FACTORY: OnceLock<Arc<SerializationWriterFactoryRegistry>> =
    OnceLock::new();
static SERIALIZATION_WRITER_DEFAULT_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Dispatches [`SerializationWriterFactory`] calls by content type.
pub struct SerializationWriterFactoryRegistry {
    factories: ArcSwap<FactoryMap<dyn SerializationWriterFactory>>,
}

impl Default for SerializationWriterFactoryRegistry {
    fn default() -> Self {
        Self {
            factories: ArcSwap::from_pointee(HashMap::new()),
        }
    }
}

impl Clone for SerializationWriterFactoryRegistry {
    fn clone(&self) -> Self {
        Self {
            factories: ArcSwap::new(self.factories.load_full()),
        }
    }
}

impl SerializationWriterFactoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under its own
    /// [`SerializationWriterFactory::valid_content_type`].
    pub fn register(
        &self,
        factory: Arc<dyn SerializationWriterFactory>,
    ) -> Result<&Self, SerializationError> {
        let content_type = ContentType::parse(factory.valid_content_type()?);
        Ok(self.register_for(content_type, factory))
    }

    /// Registers `factory` under an explicit content type, replacing any
    /// previous registration.
    pub fn register_for(
        &self,
        content_type: impl Into<ContentType>,
        factory: Arc<dyn SerializationWriterFactory>,
    ) -> &Self {
        let content_type = content_type.into();
        debug!(content_type = %content_type, "Registered serialization writer factory");
        self.factories.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(content_type.clone(), Arc::clone(&factory));
            next
        });
        self
    }

    /// Returns the factory registered for `content_type`, after normalisation.
    pub fn get(&self, content_type: &str) -> Option<Arc<dyn SerializationWriterFactory>> {
        self.factories
            .load()
            .get(&ContentType::parse(content_type))
            .cloned()
    }

    /// Registered content types, sorted.
    pub fn content_types(&self) -> Vec<String> {
        sorted_keys(self.factories.load().keys())
    }

    /// The process-wide default registry; always the same instance.
    pub fn default_instance() -> Arc<Self> {
        Arc::clone(DEFAULT_SERIALIZATION_WRITER_FACTORY.get_or_init(Default::default))
    }

    /// Copies every factory of `registry` into the process-wide default
    /// (once per process).
    pub fn install_default(registry: Self) -> Result<Arc<Self>, SerializationError> {
        if SERIALIZATION_WRITER_DEFAULT_INSTALLED.swap(true, Ordering::AcqRel) {
            return Err(SerializationError::DefaultAlreadyInstalled {
                kind: "serialization writer factory",
            });
        }
        let default = Self::default_instance();
        for (content_type, factory) in registry.factories.load().iter() {
            default.register_for(content_type.clone(), Arc::clone(factory));
        }
        Ok(default)
    }
}

impl SerializationWriterFactory for SerializationWriterFactoryRegistry {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Err(SerializationError::MultipleContentTypes)
    }

    fn get_serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError> {
        let normalized = ContentType::parse(content_type);
        match self.get(normalized.as_str()) {
            Some(factory) => factory.get_serialization_writer(normalized.as_str()),
            None => Err(SerializationError::UnsupportedMediaType {
                content_type: normalized.as_str().to_owned(),
            }),
        }
    }
}

impl std::fmt::Debug for SerializationWriterFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationWriterFactoryRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}
