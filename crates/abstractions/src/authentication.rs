//! Request authentication.
//!
//! An [`AuthenticationProvider`] mutates a [`RequestInformation`] before it is
//! materialised, typically by adding an `Authorization` header. The adapter
//! awaits it once per call and performs no I/O when it fails.
//!
//! Bearer-token schemes split the work in two: [`AccessTokenProvider`] obtains
//! a token for a URI and [`BaseBearerTokenAuthenticationProvider`] decides
//! whether and how to attach it.

use std::collections::BTreeSet;

use async_trait::async_trait;
use url::Url;

use crate::{BoxError, RequestInformation};

/// Name of the header bearer providers write.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Authenticates a request before it is sent.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Adds credentials to `request`. Errors abort the call before any I/O.
    async fn authenticate_request(&self, request: &mut RequestInformation)
        -> Result<(), BoxError>;
}

/// Provider for APIs that need no authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticationProvider;

#[async_trait]
impl AuthenticationProvider for AnonymousAuthenticationProvider {
    async fn authenticate_request(
        &self,
        _request: &mut RequestInformation,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Allowed hosts
// ---------------------------------------------------------------------------

/// Restricts which hosts receive credentials.
///
/// Hosts are compared lowercase. An empty validator allows every host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedHostsValidator {
    hosts: BTreeSet<String>,
}

impl AllowedHostsValidator {
    /// Creates a validator for `hosts` (bare host names, no scheme).
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut validator = Self::default();
        validator.set_allowed_hosts(hosts);
        validator
    }

    /// Replaces the allowed host list.
    pub fn set_allowed_hosts<I, S>(&mut self, hosts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
    }

    /// The allowed hosts, sorted.
    pub fn allowed_hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Returns `true` if credentials may be sent to `uri`'s host.
    pub fn is_url_host_valid(&self, uri: &Url) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        uri.host_str()
            .map(|host| self.hosts.contains(&host.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Bearer tokens
// ---------------------------------------------------------------------------

/// Obtains access tokens for a target URI.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a token for `uri`; an empty string means "no token".
    async fn get_authorization_token(&self, uri: &Url) -> Result<String, BoxError>;

    /// Hosts this provider is willing to issue tokens for.
    fn allowed_hosts_validator(&self) -> &AllowedHostsValidator;
}

/// Attaches `Authorization: Bearer <token>` using an [`AccessTokenProvider`].
///
/// A request that already carries an `Authorization` header is left alone,
/// as is a request whose host the token provider does not allow.
#[derive(Debug, Clone)]
pub struct BaseBearerTokenAuthenticationProvider<P> {
    token_provider: P,
}

impl<P: AccessTokenProvider> BaseBearerTokenAuthenticationProvider<P> {
    /// Wraps `token_provider`, which is asked for a token on every request.
    pub fn new(token_provider: P) -> Self {
        Self { token_provider }
    }

    /// The wrapped token provider.
    pub fn access_token_provider(&self) -> &P {
        &self.token_provider
    }
}

#[async_trait]
impl<P: AccessTokenProvider> AuthenticationProvider for BaseBearerTokenAuthenticationProvider<P> {
    async fn authenticate_request(
        &self,
        request: &mut RequestInformation,
    ) -> Result<(), BoxError> {
        if request.headers().contains(AUTHORIZATION_HEADER) {
            return Ok(());
        }

        let uri = request.uri()?;
        if !self
            .token_provider
            .allowed_hosts_validator()
            .is_url_host_valid(&uri)
        {
            tracing::debug!(host = ?uri.host_str(), "host not allowed; skipping bearer token");
            return Ok(());
        }

        let token = self.token_provider.get_authorization_token(&uri).await?;
        if token.is_empty() {
            return Ok(());
        }
        request
            .headers_mut()
            .insert(AUTHORIZATION_HEADER, format!("Bearer {token}"));
        Ok(())
    }
}

/// Error returned by [`StaticAccessTokenProvider`] for plain-HTTP targets.
#[derive(Debug, thiserror::Error)]
#[error("Refusing to send a bearer token over plain HTTP to '{host}'")]
pub struct InsecureTokenTargetError {
    /// Host of the rejected URI.
    pub host: String,
}

/// Hands out one fixed token.
///
/// Tokens are only issued for `https` URIs, or for loopback hosts during
/// local development.
#[derive(Clone)]
pub struct StaticAccessTokenProvider {
    token: String,
    validator: AllowedHostsValidator,
}

impl StaticAccessTokenProvider {
    /// Issues `token` for hosts that `validator` allows.
    pub fn new(token: impl Into<String>, validator: AllowedHostsValidator) -> Self {
        Self {
            token: token.into(),
            validator,
        }
    }
}

impl std::fmt::Debug for StaticAccessTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAccessTokenProvider")
            .field("token", &"<redacted>")
            .field("validator", &self.validator)
            .finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessTokenProvider {
    async fn get_authorization_token(&self, uri: &Url) -> Result<String, BoxError> {
        let host = uri.host_str().unwrap_or_default();
        let loopback = matches!(host, "localhost" | "127.0.0.1" | "[::1]");
        if uri.scheme() != "https" && !loopback {
            return Err(Box::new(InsecureTokenTargetError {
                host: host.to_owned(),
            }));
        }
        Ok(self.token.clone())
    }

    fn allowed_hosts_validator(&self) -> &AllowedHostsValidator {
        &self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_information::BASE_URL_PARAMETER;
    use crate::HttpMethod;

    fn request_to(base: &str) -> RequestInformation {
        let mut request = RequestInformation::new(HttpMethod::Get, "{+baseurl}/me");
        request.add_path_parameter(BASE_URL_PARAMETER, base);
        request
    }

    fn bearer(
        token: &str,
        hosts: &[&str],
    ) -> BaseBearerTokenAuthenticationProvider<StaticAccessTokenProvider> {
        BaseBearerTokenAuthenticationProvider::new(StaticAccessTokenProvider::new(
            token,
            AllowedHostsValidator::new(hosts.iter().copied()),
        ))
    }

    #[test]
    fn validator_is_case_insensitive_and_empty_allows_all() {
        let uri = Url::parse("https://Graph.Example.com/v1").unwrap();

        assert!(AllowedHostsValidator::default().is_url_host_valid(&uri));
        assert!(AllowedHostsValidator::new(["GRAPH.example.com"]).is_url_host_valid(&uri));
        assert!(!AllowedHostsValidator::new(["other.example.com"]).is_url_host_valid(&uri));
    }

    #[tokio::test]
    async fn bearer_token_is_added_for_allowed_hosts() {
        let mut request = request_to("https://api.example.com");

        bearer("abc", &["api.example.com"])
            .authenticate_request(&mut request)
            .await
            .unwrap();

        assert_eq!(request.headers().get("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn existing_authorization_header_is_kept() {
        let mut request = request_to("https://api.example.com");
        request.headers_mut().insert("Authorization", "Basic xyz");

        bearer("abc", &[]).authenticate_request(&mut request).await.unwrap();

        assert_eq!(request.headers().get("authorization"), Some("Basic xyz"));
    }

    #[tokio::test]
    async fn disallowed_host_and_empty_token_are_skipped() {
        let mut request = request_to("https://api.example.com");
        bearer("abc", &["elsewhere.example.com"])
            .authenticate_request(&mut request)
            .await
            .unwrap();
        assert!(!request.headers().contains("authorization"));

        bearer("", &[]).authenticate_request(&mut request).await.unwrap();
        assert!(!request.headers().contains("authorization"));
    }

    #[tokio::test]
    async fn plain_http_targets_are_rejected_except_loopback() {
        let mut remote = request_to("http://api.example.com");
        assert!(bearer("abc", &[]).authenticate_request(&mut remote).await.is_err());

        let mut local = request_to("http://localhost:8080");
        bearer("abc", &[]).authenticate_request(&mut local).await.unwrap();
        assert!(local.headers().contains("authorization"));
    }

    #[tokio::test]
    async fn anonymous_provider_leaves_the_request_untouched() {
        let mut request = request_to("https://api.example.com");
        AnonymousAuthenticationProvider
            .authenticate_request(&mut request)
            .await
            .unwrap();
        assert!(request.headers().is_empty());
    }
}
