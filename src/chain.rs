use reqwest::Client;
use rocket::serde::json::{json, Value};

/// Client for the external chain's JSON-RPC endpoint.
///
/// Votes are signed and submitted by the voter's own wallet; the backend
/// never holds keys or submits transactions. All we do here is check that
/// a reported transaction hash actually exists on chain before recording
/// it as a receipt. Existence only: contents are not validated.
pub struct ChainClient {
    http: Client,
    rpc_url: String,
}

impl ChainClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            http: Client::new(),
            rpc_url,
        }
    }

    /// Look up a transaction by hash. Returns false if the node has never
    /// seen it (`eth_getTransactionByHash` returns a null result).
    pub async fn transaction_exists(&self, hash: &str) -> Result<bool, reqwest::Error> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getTransactionByHash",
            "params": [hash],
        });
        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        Ok(!response["result"].is_null())
    }
}
