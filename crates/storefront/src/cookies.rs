//! Cookie lookup for the CSRF token.
//!
//! Every mutating request carries an `X-CSRFToken` header whose value comes
//! from the `csrftoken` cookie. This is the one place that reads it.

use secrecy::{ExposeSecret, SecretString};

/// Name of the cookie holding the CSRF token.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Reads named values out of a raw `Cookie` header string.
#[derive(Clone, Default)]
pub struct CookieReader {
    raw: Option<SecretString>,
}

impl std::fmt::Debug for CookieReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieReader")
            .field("raw", &self.raw.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CookieReader {
    /// Create a reader over a semicolon-delimited cookie string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(SecretString::from(raw.into())),
        }
    }

    /// A reader with no cookies at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self { raw: None }
    }

    /// Create a reader from an optional secret cookie header.
    #[must_use]
    pub fn from_secret(raw: Option<SecretString>) -> Self {
        Self { raw }
    }

    /// Value of the first cookie named exactly `name`, percent-decoded.
    ///
    /// Returns `None` if the cookie is absent or the store is empty. A value
    /// that is not valid percent-encoding is returned as-is.
    #[must_use]
    pub fn read(&self, name: &str) -> Option<String> {
        let raw = self.raw.as_ref()?.expose_secret();
        if raw.is_empty() {
            return None;
        }

        raw.split(';')
            .map(str::trim)
            .find_map(|segment| segment.strip_prefix(name)?.strip_prefix('='))
            .map(|value| {
                urlencoding::decode(value)
                    .map_or_else(|_| value.to_owned(), std::borrow::Cow::into_owned)
            })
    }

    /// The CSRF token, if the cookie is set.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        self.read(CSRF_COOKIE)
    }

    /// The raw header value, for forwarding on requests.
    #[must_use]
    pub fn header_value(&self) -> Option<&str> {
        self.raw
            .as_ref()
            .map(|raw| raw.expose_secret())
            .filter(|raw| !raw.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_exact_name() {
        let cookies = CookieReader::new("sessionid=abc; csrftoken=tok123; theme=dark");
        assert_eq!(cookies.read("csrftoken").as_deref(), Some("tok123"));
        assert_eq!(cookies.csrf_token().as_deref(), Some("tok123"));
        assert_eq!(cookies.read("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_prefix_of_another_name_does_not_match() {
        let cookies = CookieReader::new("csrftoken_old=stale; csrftoken=fresh");
        assert_eq!(cookies.csrf_token().as_deref(), Some("fresh"));
        assert_eq!(CookieReader::new("xcsrftoken=nope").csrf_token(), None);
    }

    #[test]
    fn test_first_match_wins() {
        let cookies = CookieReader::new("csrftoken=first;csrftoken=second");
        assert_eq!(cookies.csrf_token().as_deref(), Some("first"));
    }

    #[test]
    fn test_value_is_percent_decoded() {
        let cookies = CookieReader::new("greeting=hello%20world%21");
        assert_eq!(cookies.read("greeting").as_deref(), Some("hello world!"));
    }

    #[test]
    fn test_undecodable_value_is_kept_raw() {
        let cookies = CookieReader::new("bad=%FF%FE");
        assert_eq!(cookies.read("bad").as_deref(), Some("%FF%FE"));
    }

    #[test]
    fn test_absent_and_empty() {
        assert_eq!(CookieReader::empty().csrf_token(), None);
        assert_eq!(CookieReader::new("").csrf_token(), None);
        assert_eq!(CookieReader::new("sessionid=abc").csrf_token(), None);
        assert_eq!(CookieReader::new("").header_value(), None);
    }

    #[test]
    fn test_debug_redacts_values() {
        let debug_output = format!("{:?}", CookieReader::new("sessionid=super_secret"));
        assert!(!debug_output.contains("super_secret"));
    }
}
