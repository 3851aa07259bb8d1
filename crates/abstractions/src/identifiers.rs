//! Newtype identifiers.
//!
//! Strings that play a distinct role in the runtime (media types, request
//! option keys) are wrapped in their own types so that, for example, a raw
//! `Content-Type` header value is never used as a registry key without first
//! being normalised.

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// A normalised media type: lowercased, trimmed, and stripped of any
/// `;`-delimited parameters (`charset=utf-8`, `boundary=...`).
///
/// Codec registries are keyed by this type, so `Application/JSON; charset=utf-8`
/// and `application/json` always resolve to the same factory. The empty
/// content type is valid and is what a missing `Content-Type` header maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContentType(String);

impl ContentType {
    /// Normalises a raw content-type string.
    pub fn parse(raw: &str) -> Self {
        let primary = raw.split(';').next().unwrap_or_default();
        Self(primary.trim().to_ascii_lowercase())
    }

    /// Returns the normalised media type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty content type.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentType {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Normalises a raw content-type string; shorthand for
/// `ContentType::parse(raw).as_str().to_owned()`.
pub fn normalize_content_type(raw: &str) -> String {
    ContentType::parse(raw).0
}

// ---------------------------------------------------------------------------
// Request option keys
// ---------------------------------------------------------------------------

/// Identifies a kind of request option.
///
/// A request carries at most one option per key; adding a second option with
/// the same key replaces the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestOptionKey(&'static str);

impl RequestOptionKey {
    /// Creates a key from a static name (conventionally the option type's name).
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the key as a string slice.
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for RequestOptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_are_stripped_and_case_is_folded() {
        for raw in [
            "application/json",
            "Application/JSON",
            "application/json; charset=utf-8",
            "application/json;charset=UTF-8;q=0.9",
            "  application/json ; odata.metadata=minimal",
        ] {
            assert_eq!(ContentType::parse(raw).as_str(), "application/json", "{raw}");
        }
    }

    #[test]
    fn missing_header_maps_to_the_empty_content_type() {
        assert!(ContentType::parse("").is_empty());
        assert!(ContentType::parse("; charset=utf-8").is_empty());
    }

    #[test]
    fn normalize_content_type_matches_parse() {
        assert_eq!(normalize_content_type("Text/Plain; charset=ascii"), "text/plain");
    }
}
