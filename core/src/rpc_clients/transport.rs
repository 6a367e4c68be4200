use alloy::{
    rpc::json_rpc::{RequestPacket, ResponsePacket},
    transports::{
        TransportError, TransportErrorKind, TransportFut, TransportResult, http::reqwest,
    },
};
use std::task;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace};

/// JSON-RPC over HTTP on top of a shared reqwest client.
///
/// Every endpoint of a pool gets its own transport, but they all share the
/// connection pool and request timeout of the client they were built from.
#[derive(Clone, Debug)]
pub struct PooledHttpTransport {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl PooledHttpTransport {
    pub fn new(client: reqwest::Client, url: reqwest::Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    async fn do_request(self, req: RequestPacket) -> TransportResult<ResponsePacket> {
        let resp = self
            .client
            .post(self.url)
            .json(&req)
            .send()
            .await
            .map_err(TransportErrorKind::custom)?;

        let status = resp.status();
        debug!(?status, "received response from server");

        let body = resp.bytes().await.map_err(TransportErrorKind::custom)?;
        debug!(bytes = body.len(), "retrieved response body");
        trace!(body = ?String::from_utf8_lossy(&body), "response body");

        if !status.is_success() {
            return Err(TransportErrorKind::http_error(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        serde_json::from_slice(&body)
            .map_err(|err| TransportError::deser_err(err, String::from_utf8_lossy(&body)))
    }
}

impl Service<RequestPacket> for PooledHttpTransport {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    #[inline]
    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Self::Error>> {
        // reqwest always returns ready
        task::Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let this = self.clone();
        let span = debug_span!("PooledHttpTransport", url = %this.url);
        Box::pin(this.do_request(req).instrument(span))
    }
}

/// Hands out transports that share one reqwest client.
#[derive(Clone, Debug)]
pub struct SharedClientTransportBuilder {
    shared_client: reqwest::Client,
}

impl SharedClientTransportBuilder {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            shared_client: client,
        }
    }

    pub fn transport(&self, url: reqwest::Url) -> PooledHttpTransport {
        PooledHttpTransport::new(self.shared_client.clone(), url)
    }
}
