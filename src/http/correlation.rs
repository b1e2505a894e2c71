//! Client correlation cookie.
//!
//! Each client carries a `user_uuid` cookie. The proxy keeps no session
//! state: it reuses a valid token and mints a UUID v4 when there is none.

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::Cookie;
use uuid::Uuid;

/// Name of the correlation cookie.
pub const COOKIE_NAME: &str = "user_uuid";

/// The token resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub token: Uuid,
    /// True when the token was minted for this request and must be set on the response.
    pub is_new: bool,
}

impl Correlation {
    /// `Set-Cookie` value for a newly minted token.
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        if !self.is_new {
            return None;
        }
        let cookie = Cookie::build((COOKIE_NAME, self.token.to_string()))
            .path("/")
            .build();
        HeaderValue::from_str(&cookie.to_string()).ok()
    }
}

/// Reads or mints correlation tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationAssigner;

impl CorrelationAssigner {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the token for a request's headers.
    pub fn assign(&self, headers: &HeaderMap) -> Correlation {
        match Self::existing(headers) {
            Some(token) => Correlation {
                token,
                is_new: false,
            },
            None => Correlation {
                token: Uuid::new_v4(),
                is_new: true,
            },
        }
    }

    fn existing(headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value).filter_map(Result::ok))
            .find(|cookie| cookie.name() == COOKIE_NAME)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    }
}
