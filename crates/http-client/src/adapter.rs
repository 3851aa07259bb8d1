//! [`RequestAdapter`] over an [`HttpClient`].

use std::sync::Arc;

use abstractions::{
    downcast_handler_result, normalize_content_type, AuthenticationProvider, Parsable, ParseNode,
    ParseNodeFactory, ParseNodeFactoryRegistry, PrimitiveType, PrimitiveValue, RequestAdapter,
    RequestError, RequestInformation, ResponseHandler, ResponseShape, SerializationWriterFactory,
    SerializationWriterFactoryRegistry, BASE_URL_PARAMETER,
};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::{debug, instrument, warn};

use crate::client::{HttpClient, HttpClientOptions, ReqwestHttpClient};

/// Executes request descriptors over HTTP and decodes responses with the
/// configured parse node factory.
///
/// One adapter is meant to be shared (behind `Arc`) by every request builder
/// of a client. The base URL is normally set once at startup; changing it
/// later is atomic but affects every call that starts afterwards.
pub struct HttpRequestAdapter {
    authentication_provider: Arc<dyn AuthenticationProvider>,
    parse_node_factory: Arc<dyn ParseNodeFactory>,
    serialization_writer_factory: Arc<dyn SerializationWriterFactory>,
    http_client: Arc<dyn HttpClient>,
    base_url: ArcSwap<String>,
}

impl std::fmt::Debug for HttpRequestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequestAdapter")
            .field("base_url", &self.base_url())
            .finish_non_exhaustive()
    }
}

impl HttpRequestAdapter {
    /// Starts a builder with the mandatory authentication provider.
    pub fn builder(
        authentication_provider: Arc<dyn AuthenticationProvider>,
    ) -> HttpRequestAdapterBuilder {
        HttpRequestAdapterBuilder::new().authentication_provider(authentication_provider)
    }

    /// Adds the `baseurl` parameter and turns the descriptor into a transport
    /// request.
    ///
    /// Headers are applied in order with later values replacing earlier ones;
    /// the descriptor's request options are attached as an
    /// [`abstractions::RequestOptions`] extension.
    pub fn get_request_from_request_information(
        &self,
        request: &mut RequestInformation,
    ) -> Result<http::Request<Bytes>, RequestError> {
        request.add_path_parameter(BASE_URL_PARAMETER, self.base_url());
        let uri = request.uri()?;

        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(uri.as_str());
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers().iter() {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(invalid_request)?;
                let value = HeaderValue::from_str(value).map_err(invalid_request)?;
                headers.insert(name, value);
            }
        }
        builder
            .extension(request.request_options().clone())
            .body(Bytes::from(request.content.clone()))
            .map_err(invalid_request)
    }

    async fn get_http_response(
        &self,
        mut request: RequestInformation,
    ) -> Result<reqwest::Response, RequestError> {
        // Set before authenticating so host-aware providers see the final URI.
        request.add_path_parameter(BASE_URL_PARAMETER, self.base_url());
        self.authentication_provider
            .authenticate_request(&mut request)
            .await
            .map_err(RequestError::Authentication)?;
        debug!("request authenticated");

        let native = self.get_request_from_request_information(&mut request)?;
        debug!(uri = %native.uri(), "sending request");
        let response = self
            .http_client
            .execute(native)
            .await
            .map_err(RequestError::Transport)?;
        debug!(status = response.status().as_u16(), "response received");
        Ok(response)
    }

    /// Reads the whole body and returns a cursor on it.
    async fn get_root_parse_node(
        &self,
        response: reqwest::Response,
    ) -> Result<Box<dyn ParseNode>, RequestError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_content_type)
            .unwrap_or_default();
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::Transport(Box::new(e)))?;
        if body.is_empty() {
            return Err(RequestError::EmptyResponse);
        }
        debug!(content_type = %content_type, length = body.len(), "decoding response");
        Ok(self
            .parse_node_factory
            .get_root_parse_node(&content_type, &body)?)
    }

    async fn handle<V: 'static>(
        handler: &dyn ResponseHandler<reqwest::Response>,
        response: reqwest::Response,
    ) -> Result<Option<V>, RequestError> {
        let result = handler
            .handle_response(response)
            .await
            .map_err(RequestError::ResponseHandler)?;
        downcast_handler_result::<V>(result).inspect_err(|_| {
            warn!(
                expected = std::any::type_name::<V>(),
                "response handler returned an unexpected type"
            )
        })
    }
}

fn invalid_request(err: impl std::fmt::Display) -> RequestError {
    RequestError::InvalidRequest {
        message: err.to_string(),
    }
}

#[async_trait]
impl RequestAdapter for HttpRequestAdapter {
    type NativeResponse = reqwest::Response;

    #[instrument(skip_all, fields(method = %request.method, shape = %ResponseShape::Object))]
    async fn send_with<T, F>(
        &self,
        request: RequestInformation,
        ctor: F,
        handler: Option<&dyn ResponseHandler<reqwest::Response>>,
    ) -> Result<Option<T>, RequestError>
    where
        T: Parsable + Send + 'static,
        F: FnOnce() -> T + Send,
    {
        let response = self.get_http_response(request).await?;
        if let Some(handler) = handler {
            return Self::handle::<T>(handler, response).await;
        }
        let root = self.get_root_parse_node(response).await?;
        Ok(root.get_object_value_with(ctor)?)
    }

    #[instrument(skip_all, fields(method = %request.method, shape = %ResponseShape::Collection))]
    async fn send_collection_with<T, F>(
        &self,
        request: RequestInformation,
        ctor: F,
        handler: Option<&dyn ResponseHandler<reqwest::Response>>,
    ) -> Result<Option<Vec<T>>, RequestError>
    where
        T: Parsable + Send + 'static,
        F: Fn() -> T + Send + Sync,
    {
        let response = self.get_http_response(request).await?;
        if let Some(handler) = handler {
            return Self::handle::<Vec<T>>(handler, response).await;
        }
        let root = self.get_root_parse_node(response).await?;
        Ok(root.get_collection_of_object_values_with(ctor)?)
    }

    #[instrument(
        skip_all,
        fields(method = %request.method, shape = %ResponseShape::Primitive, type_name = %type_name)
    )]
    async fn send_primitive(
        &self,
        request: RequestInformation,
        type_name: &str,
        handler: Option<&dyn ResponseHandler<reqwest::Response>>,
    ) -> Result<Option<PrimitiveValue>, RequestError> {
        let response = self.get_http_response(request).await?;
        if let Some(handler) = handler {
            return Self::handle::<PrimitiveValue>(handler, response).await;
        }
        let ty: PrimitiveType = type_name.parse()?;
        let root = self.get_root_parse_node(response).await?;
        Ok(root.get_primitive_value(ty)?)
    }

    #[instrument(
        skip_all,
        fields(
            method = %request.method,
            shape = %ResponseShape::PrimitiveCollection,
            type_name = %type_name
        )
    )]
    async fn send_primitive_collection(
        &self,
        request: RequestInformation,
        type_name: &str,
        handler: Option<&dyn ResponseHandler<reqwest::Response>>,
    ) -> Result<Option<Vec<PrimitiveValue>>, RequestError> {
        let response = self.get_http_response(request).await?;
        if let Some(handler) = handler {
            return Self::handle::<Vec<PrimitiveValue>>(handler, response).await;
        }
        let _: PrimitiveType = type_name.parse()?;
        let root = self.get_root_parse_node(response).await?;
        Ok(root.get_collection_of_primitive_values(type_name)?)
    }

    #[instrument(skip_all, fields(method = %request.method, shape = %ResponseShape::NoContent))]
    async fn send_no_content(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<reqwest::Response>>,
    ) -> Result<(), RequestError> {
        let response = self.get_http_response(request).await?;
        match handler {
            Some(handler) => {
                handler
                    .handle_response(response)
                    .await
                    .map_err(RequestError::ResponseHandler)?;
            }
            None => {
                response
                    .bytes()
                    .await
                    .map_err(|e| RequestError::Transport(Box::new(e)))?;
            }
        }
        Ok(())
    }

    fn serialization_writer_factory(&self) -> Arc<dyn SerializationWriterFactory> {
        Arc::clone(&self.serialization_writer_factory)
    }

    fn parse_node_factory(&self) -> Arc<dyn ParseNodeFactory> {
        Arc::clone(&self.parse_node_factory)
    }

    fn set_base_url(&self, base_url: &str) {
        self.base_url
            .store(Arc::new(base_url.trim_end_matches('/').to_owned()));
    }

    fn base_url(&self) -> String {
        self.base_url.load().as_ref().clone()
    }

    fn enable_backing_store(&self) {
        debug!("backing store requested; this adapter does not track changes");
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`HttpRequestAdapter`].
///
/// Factories default to the process-wide registries
/// ([`ParseNodeFactoryRegistry::default_instance`],
/// [`SerializationWriterFactoryRegistry::default_instance`]); the transport
/// defaults to [`ReqwestHttpClient`] with [`HttpClientOptions::default`].
#[derive(Default)]
pub struct HttpRequestAdapterBuilder {
    authentication_provider: Option<Arc<dyn AuthenticationProvider>>,
    parse_node_factory: Option<Arc<dyn ParseNodeFactory>>,
    serialization_writer_factory: Option<Arc<dyn SerializationWriterFactory>>,
    http_client: Option<Arc<dyn HttpClient>>,
    base_url: Option<String>,
}

impl HttpRequestAdapterBuilder {
    /// Creates a builder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Required. Authenticates every request before it is sent.
    pub fn authentication_provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.authentication_provider = Some(provider);
        self
    }

    /// Decodes response bodies. Defaults to the process-wide
    /// [`ParseNodeFactoryRegistry`].
    pub fn parse_node_factory(mut self, factory: Arc<dyn ParseNodeFactory>) -> Self {
        self.parse_node_factory = Some(factory);
        self
    }

    /// Exposed to request builders for encoding bodies. Defaults to the
    /// process-wide [`SerializationWriterFactoryRegistry`].
    pub fn serialization_writer_factory(
        mut self,
        factory: Arc<dyn SerializationWriterFactory>,
    ) -> Self {
        self.serialization_writer_factory = Some(factory);
        self
    }

    /// Transport used to execute requests. Defaults to a
    /// [`ReqwestHttpClient`] built from default options.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Value substituted for `{+baseurl}` in every URL template. A trailing
    /// `/` is trimmed.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Fails with [`RequestError::Construction`] when no authentication
    /// provider was supplied or the default transport cannot be built.
    pub fn build(self) -> Result<HttpRequestAdapter, RequestError> {
        let authentication_provider =
            self.authentication_provider
                .ok_or_else(|| RequestError::Construction {
                    message: "an authentication provider is required".to_owned(),
                })?;
        let parse_node_factory = self
            .parse_node_factory
            .unwrap_or_else(|| {
                ParseNodeFactoryRegistry::default_instance() as Arc<dyn ParseNodeFactory>
            });
        let serialization_writer_factory = self
            .serialization_writer_factory
            .unwrap_or_else(|| {
                SerializationWriterFactoryRegistry::default_instance()
                    as Arc<dyn SerializationWriterFactory>
            });
        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(client) => client,
            None => Arc::new(ReqwestHttpClient::from_options(
                &HttpClientOptions::default(),
            )?),
        };

        let adapter = HttpRequestAdapter {
            authentication_provider,
            parse_node_factory,
            serialization_writer_factory,
            http_client,
            base_url: ArcSwap::from_pointee(String::new()),
        };
        if let Some(base_url) = self.base_url {
            adapter.set_base_url(&base_url);
        }
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abstractions::{
        AnonymousAuthenticationProvider, HttpMethod, RequestOption, RequestOptionKey,
        RequestOptions,
    };
    use std::any::Any;

    #[derive(Debug, PartialEq)]
    struct RetryOption {
        max_retries: u32,
    }

    impl RequestOption for RetryOption {
        fn key(&self) -> RequestOptionKey {
            RequestOptionKey::new("RetryOption")
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn adapter() -> HttpRequestAdapter {
        HttpRequestAdapter::builder(Arc::new(AnonymousAuthenticationProvider))
            .base_url("https://api.example.com/")
            .build()
            .unwrap()
    }

    #[test]
    fn build_without_authentication_provider_fails() {
        let result = HttpRequestAdapterBuilder::new().build();
        assert!(matches!(result, Err(RequestError::Construction { .. })));
    }

    #[test]
    fn missing_factories_bind_to_the_default_registries() {
        let adapter = adapter();
        assert!(adapter.parse_node_factory().valid_content_type().is_err());
        assert!(adapter.serialization_writer_factory().valid_content_type().is_err());
    }

    #[test]
    fn base_url_is_trimmed_and_replaceable() {
        let adapter = adapter();
        assert_eq!(adapter.base_url(), "https://api.example.com");

        adapter.set_base_url("https://staging.example.com/v2");
        assert_eq!(adapter.base_url(), "https://staging.example.com/v2");
    }

    #[test]
    fn materialised_request_carries_method_uri_headers_body_and_options() {
        let adapter = adapter();
        let mut info = RequestInformation::new(HttpMethod::Post, "{+baseurl}/users/{id}");
        info.add_path_parameter("id", 7);
        info.headers_mut().insert("Accept", "text/plain");
        info.headers_mut().insert("accept", "application/json");
        info.set_stream_content(vec![1u8, 2]);
        info.add_request_options([
            Arc::new(RetryOption { max_retries: 3 }) as Arc<dyn RequestOption>
        ]);

        let request = adapter.get_request_from_request_information(&mut info).unwrap();

        assert_eq!(request.method(), http::Method::POST);
        assert_eq!(request.uri(), "https://api.example.com/users/7");
        assert_eq!(request.headers()["accept"], "application/json");
        assert_eq!(request.headers()["content-type"], "application/octet-stream");
        assert_eq!(request.body().as_ref(), &[1u8, 2]);
        let options = request.extensions().get::<RequestOptions>().unwrap();
        assert_eq!(options.get::<RetryOption>(), Some(&RetryOption { max_retries: 3 }));
    }

    #[test]
    fn repeated_materialisation_never_duplicates_the_base_url() {
        let adapter = adapter();
        let mut info = RequestInformation::new(HttpMethod::Get, "{+baseurl}/users/{id}");
        info.add_path_parameter("id", "x");

        let first = adapter.get_request_from_request_information(&mut info).unwrap();
        let second = adapter.get_request_from_request_information(&mut info).unwrap();

        assert_eq!(first.uri(), "https://api.example.com/users/x");
        assert_eq!(second.uri(), first.uri());
    }

    #[test]
    fn invalid_header_value_is_an_invalid_request() {
        let adapter = adapter();
        let mut info = RequestInformation::new(HttpMethod::Get, "{+baseurl}/");
        info.headers_mut().insert("x-bad", "line\nbreak");

        assert!(matches!(
            adapter.get_request_from_request_information(&mut info),
            Err(RequestError::InvalidRequest { .. })
        ));
    }
}
