//! JSON-over-HTTP `PeerTransport`.

use async_trait::async_trait;
use ledger_core::constants::{PATH_BLOCK_RECEIVE, PATH_NODES_NEW, PATH_NODES_REGISTER};
use ledger_core::{Block, ChainSnapshot, PeerTransport, TransportError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequest {
    pub node: String,
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Every outbound call is bounded by `timeout`.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        peer: &str,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, TransportError> {
        self.client
            .post(format!("http://{peer}{path}"))
            .json(body)
            .send()
            .await
            .map_err(classify)
    }
}

fn refused_in_chain(err: &(dyn StdError + 'static)) -> bool {
    let mut cause = Some(err);
    while let Some(e) = cause {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        cause = e.source();
    }
    false
}

pub fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if refused_in_chain(&err)
        || (err.is_connect() && format!("{err:?}").to_lowercase().contains("connection refused"))
    {
        TransportError::ConnectionRefused
    } else if let Some(status) = err.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn announce_node(&self, peer: &str, node: &str) -> Result<(), TransportError> {
        let body = NodeRequest {
            node: node.to_string(),
        };
        self.post(peer, PATH_NODES_NEW, &body).await?;
        Ok(())
    }

    async fn announce_block(&self, peer: &str, block: &Block) -> Result<(), TransportError> {
        self.post(peer, PATH_BLOCK_RECEIVE, block).await?;
        Ok(())
    }

    async fn register_with(&self, seed: &str, node: &str) -> Result<ChainSnapshot, TransportError> {
        let body = NodeRequest {
            node: node.to_string(),
        };
        self.post(seed, PATH_NODES_REGISTER, &body)
            .await?
            .error_for_status()
            .map_err(classify)?
            .json::<ChainSnapshot>()
            .await
            .map_err(|e| TransportError::Other(format!("bad snapshot: {e}")))
    }
}
