//! HTTP request adapter for generated API clients.
//!
//! Implements [`abstractions::RequestAdapter`] on top of `reqwest`. A call
//! authenticates the descriptor, materialises an `http::Request`, executes it
//! through an [`HttpClient`], and decodes the body with the parse node factory
//! registered for the response's content type.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport lives here. Generated code sees only
//! the `abstractions` traits; the composition root picks this crate and wires
//! codecs and authentication into it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`adapter`] | `HttpRequestAdapter`, `HttpRequestAdapterBuilder` |
//! | [`client`] | `HttpClient` transport seam, `ReqwestHttpClient`, `HttpClientOptions` |

pub mod adapter;
pub mod client;

pub use adapter::{HttpRequestAdapter, HttpRequestAdapterBuilder};
pub use client::{HttpClient, HttpClientOptions, ReqwestHttpClient};
