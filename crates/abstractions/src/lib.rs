//! Runtime abstractions for generated API clients.
//!
//! Generated request builders and models depend on this crate only. It defines
//! the serialization contracts models implement, the request descriptor
//! builders fill in, and the adapter port that executes requests. Codecs and
//! the HTTP adapter are separate crates that implement these ports.
//!
//! ## Architectural Layer
//!
//! **Port definitions + pure logic.** This crate has no I/O dependencies. URL
//! template expansion, content-type normalisation, and codec dispatch are
//! implemented here; sockets, bodies, and wire formats are not.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`serialization`] | `Parsable`, `ParseNode`, `SerializationWriter`, codec factories and registries |
//! | [`request_information`] | `RequestInformation`, `HttpMethod`, URL template expansion |
//! | [`headers`] | `RequestHeaders` |
//! | [`request_option`] | `RequestOption`, `RequestOptions` |
//! | [`authentication`] | `AuthenticationProvider` and bearer-token helpers |
//! | [`request_adapter`] | `RequestAdapter`, `ResponseHandler` |
//! | [`values`] | `UntypedValue`, `AdditionalData`, primitive type dispatch |
//! | [`identifiers`] | `ContentType`, `RequestOptionKey` |
//! | [`errors`] | `SerializationError`, `RequestError` |

pub mod authentication;
pub mod errors;
pub mod headers;
pub mod identifiers;
pub mod request_adapter;
pub mod request_information;
pub mod request_option;
pub mod serialization;
pub mod values;

// Re-export everything at the crate root for ergonomic usage by codecs,
// adapters, and generated code.
pub use authentication::{
    AccessTokenProvider, AllowedHostsValidator, AnonymousAuthenticationProvider,
    AuthenticationProvider, BaseBearerTokenAuthenticationProvider, InsecureTokenTargetError,
    StaticAccessTokenProvider, AUTHORIZATION_HEADER,
};
pub use errors::{BoxError, RequestError, SerializationError};
pub use headers::RequestHeaders;
pub use identifiers::{normalize_content_type, ContentType, RequestOptionKey};
pub use request_adapter::{downcast_handler_result, RequestAdapter, ResponseHandler};
pub use request_information::{
    HttpMethod, RequestInformation, BASE_URL_PARAMETER, BINARY_CONTENT_TYPE,
};
pub use request_option::{RequestOption, RequestOptions};
pub use serialization::{
    ensure_content_type, read_primitive, validate_key, NodeKind, Parsable, ParseNode,
    ParseNodeFactory, ParseNodeFactoryRegistry, SerializationWriter, SerializationWriterFactory,
    SerializationWriterFactoryRegistry,
};
pub use values::{AdditionalData, PrimitiveType, PrimitiveValue, ResponseShape, UntypedValue};
