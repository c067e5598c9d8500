//! JSON-over-HTTP sink.
//!
//! Each batch is one `POST` over a fresh HTTP/1.1 connection:
//!
//! ```text
//! {"namespace": "...", "metric_data": [{"name": ..., "value": ..., ...}]}
//! ```

use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;
use tracing::debug;

use tally_core::DataPoint;

use super::{BoxFuture, MetricSink};
use crate::error::{SinkError, SinkResult};

#[derive(Serialize)]
struct PutMetricData<'a> {
    namespace: &'a str,
    metric_data: &'a [DataPoint],
}

#[derive(Debug, Clone)]
pub struct HttpSink {
    /// `host:port` of the backend.
    endpoint: String,
    path: String,
    timeout: Duration,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            path: path.into(),
            timeout,
        }
    }

    async fn post(&self, body: Vec<u8>) -> SinkResult<()> {
        let stream = tokio::net::TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| SinkError::Connect {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        // Drive the connection in the background.
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%endpoint, error = %e, "metrics connection closed with error");
            }
        });

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(self.path.as_str())
            .header(http::header::HOST, self.endpoint.as_str())
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::USER_AGENT, "tally/0.1")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| SinkError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SinkError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

impl MetricSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn submit<'a>(
        &'a self,
        namespace: &'a str,
        batch: &'a [DataPoint],
    ) -> BoxFuture<'a, SinkResult<()>> {
        Box::pin(async move {
            let body = serde_json::to_vec(&PutMetricData {
                namespace,
                metric_data: batch,
            })?;
            match tokio::time::timeout(self.timeout, self.post(body)).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(self.timeout)),
            }
        })
    }
}
