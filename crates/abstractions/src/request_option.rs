//! Request-scoped options for transport middleware.
//!
//! A [`RequestOption`] is an opaque value that travels with one request. The
//! adapter attaches the request's [`RequestOptions`] to the transport request
//! so middleware further down the stack (retry, redirect, tracing, ...) can
//! look up the option it understands by its concrete type.

use std::any::Any;
use std::sync::Arc;

use crate::RequestOptionKey;

/// An option attached to one request.
pub trait RequestOption: Any + Send + Sync + std::fmt::Debug {
    /// Identity of the option kind; one option per key per request.
    fn key(&self) -> RequestOptionKey;

    /// Upcast used to recover the concrete option type.
    fn as_any(&self) -> &dyn Any;
}

/// Ordered, key-unique collection of request options.
///
/// Cheap to clone: options are shared behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    entries: Vec<Arc<dyn RequestOption>>,
}

impl RequestOptions {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `option`, replacing in place any option with the same key.
    pub fn add(&mut self, option: Arc<dyn RequestOption>) {
        let key = option.key();
        match self.entries.iter_mut().find(|o| o.key() == key) {
            Some(slot) => *slot = option,
            None => self.entries.push(option),
        }
    }

    /// Removes the option stored under `key`.
    pub fn remove(&mut self, key: RequestOptionKey) -> Option<Arc<dyn RequestOption>> {
        let index = self.entries.iter().position(|o| o.key() == key)?;
        Some(self.entries.remove(index))
    }

    /// Returns the option stored under `key`.
    pub fn get_by_key(&self, key: RequestOptionKey) -> Option<&Arc<dyn RequestOption>> {
        self.entries.iter().find(|o| o.key() == key)
    }

    /// Returns the first option of concrete type `T`.
    pub fn get<T: RequestOption>(&self) -> Option<&T> {
        self.entries
            .iter()
            .find_map(|o| o.as_any().downcast_ref::<T>())
    }

    /// Iterates options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RequestOption>> {
        self.entries.iter()
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
