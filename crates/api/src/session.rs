//! Session identification via the `shop_session` cookie.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use common::SessionId;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "shop_session";

/// The session a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    /// True when the request carried no usable cookie.
    pub is_new: bool,
}

impl Session {
    /// Reads the session from the request's `Cookie` headers.
    ///
    /// A missing or malformed cookie starts a new session.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let existing = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| value.trim().parse::<SessionId>().ok());

        match existing {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: SessionId::new(),
                is_new: true,
            },
        }
    }

    /// Adds a `Set-Cookie` header to the response for a new session.
    pub fn attach(&self, response: &mut Response) {
        if !self.is_new {
            return;
        }
        let cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.id
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
                metrics::counter!("sessions_created_total").increment(1);
            }
            Err(e) => tracing::warn!(error = %e, "could not encode session cookie"),
        }
    }
}
