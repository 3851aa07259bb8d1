//! `apicall` entry point.
//!
//! This binary is the composition root for the runtime. Responsibilities:
//!
//! 1. **Wire observability**: configure `tracing-subscriber` with an
//!    `EnvFilter` (default `info`) and either a human-readable or a JSON layer.
//!    Every span and event emitted by the adapter and codecs flows through it.
//! 2. **Install codecs**: register the JSON and text parse node and
//!    serialization writer factories as the process-wide defaults.
//! 3. **Construct infrastructure**: pick an authentication provider from the
//!    command line, build the reqwest transport from optional client settings,
//!    and assemble the [`HttpRequestAdapter`].
//! 4. **Send one request**: fill a [`RequestInformation`] from the arguments,
//!    decode the response in the requested shape, and print it as JSON.

mod args;
mod document;

use std::sync::Arc;

use abstractions::{
    AllowedHostsValidator, AnonymousAuthenticationProvider, AuthenticationProvider,
    BaseBearerTokenAuthenticationProvider, ParseNodeFactoryRegistry, RequestAdapter,
    RequestInformation, SerializationWriterFactoryRegistry, StaticAccessTokenProvider,
};
use anyhow::{Context, Result};
use clap::Parser;
use http_client::{HttpClientOptions, HttpRequestAdapter, ReqwestHttpClient};
use serialization_json::{JsonParseNodeFactory, JsonSerializationWriterFactory, JSON_CONTENT_TYPE};
use serialization_text::{TextParseNodeFactory, TextSerializationWriterFactory};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Shape};
use crate::document::{Decoded, Document};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    install_codecs()?;
    let adapter = build_adapter(&cli)?;
    let request = build_request(&cli, &adapter)?;

    info!(method = %cli.method, path = %cli.path, "Sending request");
    let decoded = send(&adapter, request, cli.shape).await?;

    match decoded {
        Some(value) => println!("{}", value.to_json()?),
        None => info!("Response had no content"),
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_codecs() -> Result<()> {
    let parsers = ParseNodeFactoryRegistry::new();
    parsers
        .register(Arc::new(JsonParseNodeFactory::new()))?
        .register(Arc::new(TextParseNodeFactory::new()))?;
    ParseNodeFactoryRegistry::install_default(parsers)?;

    let writers = SerializationWriterFactoryRegistry::new();
    writers
        .register(Arc::new(JsonSerializationWriterFactory::new()))?
        .register(Arc::new(TextSerializationWriterFactory::new()))?;
    SerializationWriterFactoryRegistry::install_default(writers)?;

    debug!("Installed default codec registries");
    Ok(())
}

fn build_adapter(cli: &Cli) -> Result<HttpRequestAdapter> {
    let options = match &cli.client_config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading client config {}", path.display()))?;
            serde_json::from_str::<HttpClientOptions>(&raw)
                .with_context(|| format!("parsing client config {}", path.display()))?
        }
        None => HttpClientOptions::default(),
    };
    let client = ReqwestHttpClient::from_options(&options)?;

    let auth: Arc<dyn AuthenticationProvider> = match &cli.bearer_token {
        Some(token) => {
            let hosts = if cli.allowed_hosts.is_empty() {
                let base = url::Url::parse(&cli.base_url)
                    .with_context(|| format!("invalid base URL '{}'", cli.base_url))?;
                base.host_str().map(str::to_owned).into_iter().collect()
            } else {
                cli.allowed_hosts.clone()
            };
            let validator = AllowedHostsValidator::new(hosts);
            let provider = StaticAccessTokenProvider::new(token.clone(), validator);
            Arc::new(BaseBearerTokenAuthenticationProvider::new(provider))
        }
        None => Arc::new(AnonymousAuthenticationProvider),
    };

    let adapter = HttpRequestAdapter::builder(auth)
        .http_client(Arc::new(client))
        .base_url(cli.base_url.as_str())
        .build()?;
    Ok(adapter)
}

fn build_request(cli: &Cli, adapter: &HttpRequestAdapter) -> Result<RequestInformation> {
    let mut request = RequestInformation::new(cli.method, format!("{{+baseurl}}{}", cli.path));
    for (name, value) in &cli.params {
        request.add_path_parameter(name, value);
    }
    for (name, value) in &cli.query {
        request.add_query_parameter(name, value);
    }
    for (name, value) in &cli.headers {
        request.headers_mut().insert(name, value.as_str());
    }
    if let Some(body) = &cli.body {
        let document = Document::from_json(body).context("request body is not a JSON object")?;
        request.set_content_from_parsable(
            adapter.serialization_writer_factory().as_ref(),
            JSON_CONTENT_TYPE,
            &document,
        )?;
    }
    Ok(request)
}

async fn send(
    adapter: &HttpRequestAdapter,
    request: RequestInformation,
    shape: Shape,
) -> Result<Option<Decoded>> {
    let decoded = match shape {
        Shape::Object => adapter
            .send::<Document>(request, None)
            .await?
            .map(Decoded::Object),
        Shape::Collection => adapter
            .send_collection::<Document>(request, None)
            .await?
            .map(Decoded::Collection),
        Shape::Primitive(ty) => adapter
            .send_primitive(request, ty.name(), None)
            .await?
            .map(Decoded::Primitive),
        Shape::Primitives(ty) => adapter
            .send_primitive_collection(request, ty.name(), None)
            .await?
            .map(Decoded::Primitives),
        Shape::None => {
            adapter.send_no_content(request, None).await?;
            None
        }
    };
    Ok(decoded)
}
