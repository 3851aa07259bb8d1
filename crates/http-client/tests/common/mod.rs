//! Fakes shared by the adapter integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::{Arc, Mutex};

use abstractions::{
    AdditionalData, AuthenticationProvider, BoxError, Parsable, ParseNode, ParseNodeFactoryRegistry,
    RequestInformation, RequestOptions, ResponseHandler, SerializationError, SerializationWriter,
    SerializationWriterFactoryRegistry,
};
use async_trait::async_trait;
use bytes::Bytes;
use http_client::{HttpClient, HttpRequestAdapter};
use serialization_json::{JsonParseNodeFactory, JsonSerializationWriterFactory};
use serialization_text::{TextParseNodeFactory, TextSerializationWriterFactory};

// ---------------------------------------------------------------------------
// Transport fakes
// ---------------------------------------------------------------------------

/// What the fake transport saw.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub options: Option<RequestOptions>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Returns one canned response for every request and records each request.
pub struct FakeHttpClient {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeHttpClient {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            status,
            content_type: content_type.map(str::to_owned),
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn json(body: &str) -> Arc<Self> {
        Self::new(200, Some("application/json; charset=utf-8"), body)
    }

    pub fn text(body: &str) -> Arc<Self> {
        Self::new(200, Some("text/plain"), body)
    }

    pub fn empty() -> Arc<Self> {
        Self::new(204, None, Vec::new())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn execute(&self, request: http::Request<Bytes>) -> Result<reqwest::Response, BoxError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            headers: request
                .headers()
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_str().unwrap_or_default().to_owned()))
                .collect(),
            body: request.body().to_vec(),
            options: request.extensions().get::<RequestOptions>().cloned(),
        });

        let mut response = http::Response::builder().status(self.status);
        if let Some(content_type) = &self.content_type {
            response = response.header("content-type", content_type.as_str());
        }
        Ok(reqwest::Response::from(response.body(self.body.clone())?))
    }
}

/// Transport that always fails with a fixed message.
pub struct FailingHttpClient {
    pub message: &'static str,
}

#[async_trait]
impl HttpClient for FailingHttpClient {
    async fn execute(&self, _request: http::Request<Bytes>) -> Result<reqwest::Response, BoxError> {
        Err(self.message.into())
    }
}

// ---------------------------------------------------------------------------
// Authentication fakes
// ---------------------------------------------------------------------------

pub struct RejectingAuthenticationProvider;

#[async_trait]
impl AuthenticationProvider for RejectingAuthenticationProvider {
    async fn authenticate_request(
        &self,
        _request: &mut RequestInformation,
    ) -> Result<(), BoxError> {
        Err("credentials expired".into())
    }
}

/// Records the URI each request had when it was authenticated.
#[derive(Default)]
pub struct RecordingAuthenticationProvider {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl AuthenticationProvider for RecordingAuthenticationProvider {
    async fn authenticate_request(
        &self,
        request: &mut RequestInformation,
    ) -> Result<(), BoxError> {
        let uri = request.uri()?;
        self.seen.lock().unwrap().push(uri.to_string());
        request.headers_mut().insert("x-authenticated", "yes");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response handlers
// ---------------------------------------------------------------------------

/// Returns whatever its closure builds from the response status.
pub struct StatusHandler<F>(pub F);

#[async_trait]
impl<F> ResponseHandler<reqwest::Response> for StatusHandler<F>
where
    F: Fn(u16) -> Box<dyn Any + Send> + Send + Sync,
{
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        Ok((self.0)(response.status().as_u16()))
    }
}

pub struct FailingHandler;

#[async_trait]
impl ResponseHandler<reqwest::Response> for FailingHandler {
    async fn handle_response(
        &self,
        _response: reqwest::Response,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        Err("handler refused the response".into())
    }
}

pub fn handler(
    h: &dyn ResponseHandler<reqwest::Response>,
) -> Option<&dyn ResponseHandler<reqwest::Response>> {
    Some(h)
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn parse_registry() -> Arc<ParseNodeFactoryRegistry> {
    let registry = ParseNodeFactoryRegistry::new();
    registry
        .register(Arc::new(JsonParseNodeFactory::new()))
        .unwrap()
        .register(Arc::new(TextParseNodeFactory::new()))
        .unwrap();
    Arc::new(registry)
}

pub fn writer_registry() -> Arc<SerializationWriterFactoryRegistry> {
    let registry = SerializationWriterFactoryRegistry::new();
    registry
        .register(Arc::new(JsonSerializationWriterFactory::new()))
        .unwrap()
        .register(Arc::new(TextSerializationWriterFactory::new()))
        .unwrap();
    Arc::new(registry)
}

pub fn adapter_with(
    auth: Arc<dyn AuthenticationProvider>,
    client: Arc<dyn HttpClient>,
) -> HttpRequestAdapter {
    HttpRequestAdapter::builder(auth)
        .parse_node_factory(parse_registry())
        .serialization_writer_factory(writer_registry())
        .http_client(client)
        .base_url("https://api.example.com")
        .build()
        .unwrap()
}

pub fn adapter(client: Arc<dyn HttpClient>) -> HttpRequestAdapter {
    adapter_with(Arc::new(abstractions::AnonymousAuthenticationProvider), client)
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub additional_data: AdditionalData,
}

impl Parsable for User {
    fn deserialize_field(
        &mut self,
        name: &str,
        node: &dyn ParseNode,
    ) -> Result<bool, SerializationError> {
        match name {
            "id" => self.id = node.get_i64_value()?,
            "name" => self.name = node.get_string_value()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn additional_data_mut(&mut self) -> Option<&mut AdditionalData> {
        Some(&mut self.additional_data)
    }

    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<(), SerializationError> {
        writer.write_i64_value(Some("id"), self.id)?;
        writer.write_string_value(Some("name"), self.name.as_deref())?;
        writer.write_additional_data(&self.additional_data)
    }
}
