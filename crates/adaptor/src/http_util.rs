//! Default [`Transport`] backed by `rquest`.

use async_trait::async_trait;
use chanrelay_types::{
    RelayError, Transport, UpstreamRequest, UpstreamResponse,
    traits::{ByteStream, Result},
};
use futures_util::StreamExt as _;
use rquest::Client;

/// Sends upstream requests with a shared `rquest` client.
///
/// Non-2xx statuses are returned as-is; the decoder turns them into
/// [`RelayError::Upstream`].
#[derive(Clone)]
pub struct RquestTransport {
    http: Client,
}

impl RquestTransport {
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Returns a reference to the inner HTTP client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Converts an `rquest::Response` body into a `ByteStream`.
    #[must_use]
    pub fn byte_stream(resp: rquest::Response) -> ByteStream {
        Box::pin(resp.bytes_stream().map(|r| r.map_err(RelayError::from)))
    }
}

#[async_trait]
impl Transport for RquestTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let UpstreamRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let resp = self
            .http
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(UpstreamResponse {
            status: resp.status().as_u16(),
            headers: resp.headers().clone(),
            body: Self::byte_stream(resp),
        })
    }
}
