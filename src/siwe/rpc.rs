use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::concepts::ContractReader;

/// Public World Chain RPC endpoint.
pub const WORLD_CHAIN_RPC_URL: &str = "https://worldchain-mainnet.g.alchemy.com/public";

/// A [`ContractReader`] that performs `eth_call` over HTTP JSON-RPC.
#[derive(Debug)]
pub struct JsonRpcContractReader {
    pub rpc_url: Url,
    pub client: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, thiserror::Error)]
pub enum JsonRpcReaderError {
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("JSON-RPC response has neither result nor error")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct CallRequest {
    to: Address,
    data: Bytes,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Bytes>,
    error: Option<JsonRpcErrorObject>,
}

impl JsonRpcContractReader {
    pub fn new(rpc_url: Url) -> Self {
        JsonRpcContractReader {
            rpc_url,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// A reader for the public World Chain endpoint.
    pub fn world_chain() -> Result<Self, JsonRpcReaderError> {
        Ok(Self::new(Url::parse(WORLD_CHAIN_RPC_URL)?))
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl ContractReader for JsonRpcContractReader {
    type Error = JsonRpcReaderError;

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, Self::Error> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "eth_call",
            params: (CallRequest { to, data }, "latest"),
        };

        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await?
            .json::<JsonRpcResponse>()
            .await?;

        match response {
            JsonRpcResponse {
                error: Some(error), ..
            } => Err(JsonRpcReaderError::Rpc {
                code: error.code,
                message: error.message,
            }),
            JsonRpcResponse {
                result: Some(result),
                ..
            } => Ok(result),
            _ => Err(JsonRpcReaderError::EmptyResponse),
        }
    }
}
