//! The request adapter port.
//!
//! A [`RequestAdapter`] turns a [`RequestInformation`] into a response value.
//! Every call runs the same pipeline:
//!
//! 1. authenticate the descriptor,
//! 2. materialise a transport request (base URL, URI, headers, body, options),
//! 3. send it,
//! 4. decode the body into the requested shape, or hand the raw response to a
//!    caller-supplied [`ResponseHandler`].
//!
//! The concrete HTTP implementation lives in the `http-client` crate; this
//! module only fixes the contract generated request builders program against.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    BoxError, Parsable, ParseNodeFactory, PrimitiveValue, RequestError, RequestInformation,
    SerializationWriterFactory,
};

/// Takes over result production from the adapter.
///
/// The returned value must be the type the call would have produced (`T` for
/// [`RequestAdapter::send_with`], `Vec<T>` for collections, [`PrimitiveValue`]
/// or `Vec<PrimitiveValue>` for primitives), either bare or wrapped in
/// `Option`. Anything else fails the call with
/// [`RequestError::UnexpectedHandlerResult`]. Errors are returned to the caller
/// unchanged as [`RequestError::ResponseHandler`].
#[async_trait]
pub trait ResponseHandler<R: Send + 'static>: Send + Sync {
    /// Consumes the native response and produces the call's result. The body
    /// has not been read when this runs.
    async fn handle_response(&self, response: R) -> Result<Box<dyn Any + Send>, BoxError>;
}

/// Recovers a typed value from a response handler's result.
pub fn downcast_handler_result<V: 'static>(
    result: Box<dyn Any + Send>,
) -> Result<Option<V>, RequestError> {
    match result.downcast::<Option<V>>() {
        Ok(value) => Ok(*value),
        Err(result) => result
            .downcast::<V>()
            .map(|value| Some(*value))
            .map_err(|_| RequestError::UnexpectedHandlerResult {
                expected: std::any::type_name::<V>(),
            }),
    }
}

/// Executes request descriptors and decodes their responses.
///
/// Implementations are shared across concurrent calls.
#[async_trait]
pub trait RequestAdapter: Send + Sync {
    /// The transport's raw response type, as passed to response handlers.
    type NativeResponse: Send + 'static;

    /// Sends `request` and decodes the body as one object built by `ctor`.
    ///
    /// Returns `Ok(None)` when the payload is `null`.
    async fn send_with<T, F>(
        &self,
        request: RequestInformation,
        ctor: F,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<Option<T>, RequestError>
    where
        T: Parsable + Send + 'static,
        F: FnOnce() -> T + Send;

    /// Sends `request` and decodes the body as a collection of objects, one
    /// `ctor` call per element. `null` elements are skipped.
    async fn send_collection_with<T, F>(
        &self,
        request: RequestInformation,
        ctor: F,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<Option<Vec<T>>, RequestError>
    where
        T: Parsable + Send + 'static,
        F: Fn() -> T + Send + Sync;

    /// Sends `request` and decodes the body as the scalar named by
    /// `type_name` (see [`crate::PrimitiveType::from_name`]).
    async fn send_primitive(
        &self,
        request: RequestInformation,
        type_name: &str,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<Option<PrimitiveValue>, RequestError>;

    /// Sends `request` and decodes the body as a collection of scalars.
    async fn send_primitive_collection(
        &self,
        request: RequestInformation,
        type_name: &str,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<Option<Vec<PrimitiveValue>>, RequestError>;

    /// Sends `request` and discards the body.
    async fn send_no_content(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<(), RequestError>;

    /// Factory used to serialise request bodies.
    fn serialization_writer_factory(&self) -> Arc<dyn SerializationWriterFactory>;

    /// Factory used to decode response bodies.
    fn parse_node_factory(&self) -> Arc<dyn ParseNodeFactory>;

    /// Sets the base URL substituted for `{+baseurl}` in every template.
    fn set_base_url(&self, base_url: &str);

    /// The current base URL.
    fn base_url(&self) -> String;

    /// Extension point for change-tracking models; adapters may ignore it.
    fn enable_backing_store(&self);

    /// [`send_with`](Self::send_with) using `T::default` as the constructor.
    async fn send<T>(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<Option<T>, RequestError>
    where
        T: Parsable + Default + Send + 'static,
    {
        self.send_with(request, T::default, handler).await
    }

    /// [`send_collection_with`](Self::send_collection_with) using `T::default`.
    async fn send_collection<T>(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<Self::NativeResponse>>,
    ) -> Result<Option<Vec<T>>, RequestError>
    where
        T: Parsable + Default + Send + 'static,
    {
        self.send_collection_with(request, T::default, handler).await
    }
}
