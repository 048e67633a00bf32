//! Caller identification by cookie.
//!
//! Each browser gets a random id the first time it talks to the gateway. The
//! id only selects a conversation; it is not an authentication token.

use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

/// Name of the caller cookie.
pub const CALLER_COOKIE: &str = "converse_session";

/// A resolved caller id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    /// The id was minted for this request and must be sent back.
    pub fresh: bool,
}

impl Caller {
    /// Read the caller cookie, minting a new id if it is absent or malformed.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookie_value(headers, CALLER_COOKIE).and_then(|v| Uuid::parse_str(v).ok()) {
            Some(id) => Self { id, fresh: false },
            None => Self {
                id: Uuid::new_v4(),
                fresh: true,
            },
        }
    }

    /// `Set-Cookie` value for a freshly minted id.
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.fresh {
            return None;
        }
        HeaderValue::from_str(&format!(
            "{CALLER_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.id
        ))
        .ok()
    }

    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_existing_cookie_is_reused() {
        let id = Uuid::new_v4();
        let headers = headers_with_cookie(&format!("theme=dark; {CALLER_COOKIE}={id}; x=1"));
        let caller = Caller::from_headers(&headers);
        assert_eq!(caller.id, id);
        assert!(!caller.fresh);
        assert!(caller.set_cookie().is_none());
    }

    #[test]
    fn test_missing_cookie_mints_id() {
        let caller = Caller::from_headers(&HeaderMap::new());
        assert!(caller.fresh);
        let cookie = caller.set_cookie().unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("{CALLER_COOKIE}={}", caller.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_malformed_cookie_mints_id() {
        let headers = headers_with_cookie(&format!("{CALLER_COOKIE}=not-a-uuid"));
        assert!(Caller::from_headers(&headers).fresh);
    }
}
