//! Request header construction.
//!
//! [`baseline`] produces the headers every channel sends; the adaptors then
//! add exactly one authentication scheme on top.

use chanrelay_types::{RelayError, RelayInfo, traits::Result};
use http::{
    HeaderMap, HeaderName, HeaderValue,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};

pub const API_KEY: HeaderName = HeaderName::from_static("api-key");
pub const OPENAI_ORGANIZATION: HeaderName = HeaderName::from_static("openai-organization");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Headers shared by all channels: JSON body, SSE or JSON accept, request id.
///
/// # Errors
///
/// Returns [`RelayError::InvalidInput`] if the request id is not a valid
/// header value.
pub fn baseline(info: &RelayInfo) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let accept = if info.is_stream {
        "text/event-stream"
    } else {
        "application/json"
    };
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    if let Some(id) = &info.request_id {
        let value = HeaderValue::from_str(id)
            .map_err(|_| RelayError::InvalidInput(format!("invalid request id: {id:?}")))?;
        headers.insert(X_REQUEST_ID, value);
    }
    Ok(headers)
}

/// Insert a secret header, marked sensitive so it is never logged.
///
/// # Errors
///
/// Returns [`RelayError::InvalidCredential`] if `value` contains bytes not
/// allowed in a header.
pub fn set_secret(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let mut value = HeaderValue::from_str(value).map_err(|_| {
        RelayError::InvalidCredential(format!("credential for `{name}` is not a valid header value"))
    })?;
    value.set_sensitive(true);
    headers.insert(name, value);
    Ok(())
}

/// Insert `Authorization: Bearer <token>`.
///
/// # Errors
///
/// See [`set_secret`].
pub fn set_bearer(headers: &mut HeaderMap, token: &str) -> Result<()> {
    set_secret(headers, AUTHORIZATION, &format!("Bearer {token}"))
}
