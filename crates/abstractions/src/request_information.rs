//! The request descriptor.
//!
//! [`RequestInformation`] is everything a generated request builder knows about
//! one call before it is handed to a [`crate::RequestAdapter`]: the method, a
//! URL template with its parameters, headers, an already-serialised body, and
//! request options for the transport middleware.
//!
//! URL templates use the subset of RFC 6570 that generated clients emit:
//!
//! | Expression | Expansion |
//! |------------|-----------|
//! | `{name}` | percent-encoded value |
//! | `{+name}` | value with reserved characters kept (base URLs) |
//! | `{?a,b}` | `?a=..&b=..` for the parameters that are set |
//! | `{&a,b}` | `&a=..&b=..` for the parameters that are set |
//!
//! Unset simple variables expand to nothing. Query parameters that are set
//! but not named by the template are appended after expansion.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::{
    Parsable, RequestError, RequestHeaders, RequestOption, RequestOptionKey, RequestOptions,
    SerializationWriterFactory,
};

/// Path parameter holding the adapter's base URL.
pub const BASE_URL_PARAMETER: &str = "baseurl";

/// Media type set by [`RequestInformation::set_stream_content`].
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// RFC 3986 unreserved characters pass through; everything else is encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Reserved expansion additionally keeps gen-delims, sub-delims and `%`.
const RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'%');

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// HTTP methods a generated client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    /// `GET`, the default.
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// `CONNECT`
    Connect,
    /// `PUT`
    Put,
    /// `TRACE`
    Trace,
    /// `HEAD`
    Head,
}

impl HttpMethod {
    /// Upper-case method token.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Put => "PUT",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            "CONNECT" => HttpMethod::Connect,
            "PUT" => HttpMethod::Put,
            "TRACE" => HttpMethod::Trace,
            "HEAD" => HttpMethod::Head,
            _ => {
                return Err(RequestError::InvalidRequest {
                    message: format!("unknown HTTP method '{s}'"),
                })
            }
        };
        Ok(method)
    }
}

// ---------------------------------------------------------------------------
// RequestInformation
// ---------------------------------------------------------------------------

/// Descriptor of one not-yet-sent HTTP request.
#[derive(Debug, Clone, Default)]
pub struct RequestInformation {
    /// HTTP method.
    pub method: HttpMethod,
    /// RFC 6570 URL template, e.g. `{+baseurl}/users/{id}{?top}`.
    pub url_template: String,
    /// Values for the template's path variables. Keys are unique.
    pub path_parameters: BTreeMap<String, String>,
    /// Query parameters. Keys are unique.
    pub query_parameters: BTreeMap<String, String>,
    /// Serialised request body; empty means no body.
    pub content: Vec<u8>,
    headers: RequestHeaders,
    options: RequestOptions,
    raw_uri: Option<Url>,
}

impl RequestInformation {
    /// Creates a descriptor for `method` against `url_template`.
    pub fn new(method: HttpMethod, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            ..Self::default()
        }
    }

    /// Sets a path parameter, replacing any previous value.
    pub fn add_path_parameter(&mut self, name: impl Into<String>, value: impl ToString) {
        self.path_parameters.insert(name.into(), value.to_string());
    }

    /// Sets a query parameter, replacing any previous value.
    pub fn add_query_parameter(&mut self, name: impl Into<String>, value: impl ToString) {
        self.query_parameters.insert(name.into(), value.to_string());
    }

    /// Request headers.
    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut RequestHeaders {
        &mut self.headers
    }

    /// Uses `uri` verbatim instead of expanding the template.
    ///
    /// Path and query parameters are ignored while a raw URI is set.
    pub fn set_uri(&mut self, uri: Url) {
        self.raw_uri = Some(uri);
    }

    /// Resolves the final request URI.
    ///
    /// Fails with [`RequestError::InvalidRequest`] when the template is
    /// malformed or does not expand to an absolute URL (typically because the
    /// `baseurl` parameter is unset).
    pub fn uri(&self) -> Result<Url, RequestError> {
        if let Some(raw) = &self.raw_uri {
            return Ok(raw.clone());
        }

        let mut consumed = BTreeSet::new();
        let mut expanded = expand_template(
            &self.url_template,
            &self.path_parameters,
            &self.query_parameters,
            &mut consumed,
        )?;

        let mut separator = if expanded.contains('?') { '&' } else { '?' };
        for (name, value) in &self.query_parameters {
            if consumed.contains(name.as_str()) {
                continue;
            }
            expanded.push(separator);
            expanded.push_str(&encode(name, UNRESERVED));
            expanded.push('=');
            expanded.push_str(&encode(value, UNRESERVED));
            separator = '&';
        }

        Url::parse(&expanded).map_err(|e| RequestError::InvalidRequest {
            message: format!("'{expanded}' is not a valid absolute URL: {e}"),
        })
    }

    /// Sets a binary body and `Content-Type: application/octet-stream`.
    pub fn set_stream_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
        self.headers.insert(CONTENT_TYPE_HEADER, BINARY_CONTENT_TYPE);
    }

    /// Serialises `value` with a writer for `content_type` and uses the
    /// result as the body.
    pub fn set_content_from_parsable(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        value: &dyn Parsable,
    ) -> Result<(), RequestError> {
        self.set_serialized_content(factory, content_type, |writer| {
            writer.write_object_value(None, Some(value))
        })
    }

    /// Serialises `values` as a collection with a writer for `content_type`
    /// and uses the result as the body.
    pub fn set_content_from_parsable_collection(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        values: &[&dyn Parsable],
    ) -> Result<(), RequestError> {
        self.set_serialized_content(factory, content_type, |writer| {
            writer.write_collection_of_object_values(None, Some(values))
        })
    }

    fn set_serialized_content<F>(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        write: F,
    ) -> Result<(), RequestError>
    where
        F: FnOnce(&mut dyn crate::SerializationWriter) -> Result<(), crate::SerializationError>,
    {
        let serialize = || {
            let mut writer = factory.get_serialization_writer(content_type)?;
            write(writer.as_mut())?;
            writer.close()?;
            writer.get_serialized_content()
        };
        let content = serialize().map_err(|e| RequestError::InvalidRequest {
            message: format!("could not serialize the request body: {e}"),
        })?;

        self.content = content;
        self.headers.insert(CONTENT_TYPE_HEADER, content_type);
        Ok(())
    }

    /// Adds options, replacing any existing option with the same key.
    pub fn add_request_options<I>(&mut self, options: I)
    where
        I: IntoIterator<Item = Arc<dyn RequestOption>>,
    {
        for option in options {
            self.options.add(option);
        }
    }

    /// Removes the options stored under `keys`.
    pub fn remove_request_options<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = RequestOptionKey>,
    {
        for key in keys {
            self.options.remove(key);
        }
    }

    /// The request's options.
    pub fn request_options(&self) -> &RequestOptions {
        &self.options
    }
}

// ---------------------------------------------------------------------------
// Template expansion
// ---------------------------------------------------------------------------

fn encode(value: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(value, set).to_string()
}

fn expand_template<'a>(
    template: &'a str,
    path: &BTreeMap<String, String>,
    query: &BTreeMap<String, String>,
    consumed: &mut BTreeSet<&'a str>,
) -> Result<String, RequestError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| RequestError::InvalidRequest {
            message: format!("unterminated expression in URL template '{template}'"),
        })?;
        let expression = &after[..close];
        rest = &after[close + 1..];

        match expression.chars().next() {
            Some('+') => {
                for name in expression[1..].split(',') {
                    if let Some(value) = path.get(name) {
                        out.push_str(&encode(value, RESERVED));
                    }
                }
            }
            Some(op @ ('?' | '&')) => {
                let mut first = op == '?';
                for name in expression[1..].split(',') {
                    consumed.insert(name);
                    let Some(value) = query.get(name) else {
                        continue;
                    };
                    out.push(if first { '?' } else { '&' });
                    first = false;
                    out.push_str(&encode(name, UNRESERVED));
                    out.push('=');
                    out.push_str(&encode(value, UNRESERVED));
                }
            }
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                let values: Vec<String> = expression
                    .split(',')
                    .filter_map(|name| path.get(name))
                    .map(|value| encode(value, UNRESERVED))
                    .collect();
                out.push_str(&values.join(","));
            }
            _ => {
                return Err(RequestError::InvalidRequest {
                    message: format!(
                        "unsupported expression '{{{expression}}}' in URL template '{template}'"
                    ),
                })
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_request() -> RequestInformation {
        let mut request = RequestInformation::new(HttpMethod::Get, "{+baseurl}/users/{id}");
        request.add_path_parameter(BASE_URL_PARAMETER, "https://api.example.com/v1");
        request
    }

    #[test]
    fn base_url_and_path_parameter_are_expanded() {
        let mut request = users_request();
        request.add_path_parameter("id", 42);

        let uri = request.uri().unwrap();

        assert_eq!(uri.as_str(), "https://api.example.com/v1/users/42");
    }

    #[test]
    fn re_setting_the_base_url_never_duplicates_it() {
        let mut request = users_request();
        request.add_path_parameter("id", "a");
        request.add_path_parameter(BASE_URL_PARAMETER, "https://api.example.com/v1");

        assert_eq!(
            request.uri().unwrap().as_str(),
            "https://api.example.com/v1/users/a"
        );
    }

    #[test]
    fn simple_expansion_encodes_reserved_characters() {
        let mut request = users_request();
        request.add_path_parameter("id", "a/b c");

        assert_eq!(
            request.uri().unwrap().as_str(),
            "https://api.example.com/v1/users/a%2Fb%20c"
        );
    }

    #[test]
    fn query_expression_only_emits_set_parameters() {
        let mut request =
            RequestInformation::new(HttpMethod::Get, "{+baseurl}/users{?top,skip,filter}");
        request.add_path_parameter(BASE_URL_PARAMETER, "https://api.example.com");
        request.add_query_parameter("skip", 10);
        request.add_query_parameter("filter", "name eq 'x'");

        assert_eq!(
            request.uri().unwrap().as_str(),
            "https://api.example.com/users?skip=10&filter=name%20eq%20%27x%27"
        );
    }

    #[test]
    fn query_parameters_outside_the_template_are_appended() {
        let mut request = users_request();
        request.add_path_parameter("id", 1);
        request.add_query_parameter("expand", "manager");

        assert_eq!(
            request.uri().unwrap().as_str(),
            "https://api.example.com/v1/users/1?expand=manager"
        );
    }

    #[test]
    fn missing_base_url_is_an_invalid_request() {
        let request = RequestInformation::new(HttpMethod::Get, "{+baseurl}/users");

        assert!(matches!(
            request.uri(),
            Err(RequestError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn unterminated_expression_is_an_invalid_request() {
        let request = RequestInformation::new(HttpMethod::Get, "https://x/{id");

        assert!(matches!(
            request.uri(),
            Err(RequestError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn raw_uri_bypasses_the_template() {
        let mut request = users_request();
        request.set_uri(Url::parse("https://other.example.com/next?page=2").unwrap());

        assert_eq!(
            request.uri().unwrap().as_str(),
            "https://other.example.com/next?page=2"
        );
    }

    #[test]
    fn stream_content_sets_the_binary_content_type() {
        let mut request = users_request();
        request.set_stream_content(vec![1u8, 2, 3]);

        assert_eq!(request.content, vec![1u8, 2, 3]);
        assert_eq!(
            request.headers().get("content-type"),
            Some(BINARY_CONTENT_TYPE)
        );
    }

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }
}
