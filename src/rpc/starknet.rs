use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize, Serializer};

use crate::model::Felt;

use super::{RemoteQueryClient, RpcError, selector};

// ── Block selection ──────────────────────────────────────────────────

/// Block the calls are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Latest,
    Pending,
    Number(u64),
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct ByNumber {
            block_number: u64,
        }
        match self {
            BlockId::Latest => serializer.serialize_str("latest"),
            BlockId::Pending => serializer.serialize_str("pending"),
            BlockId::Number(n) => ByNumber { block_number: *n }.serialize(serializer),
        }
    }
}

impl FromStr for BlockId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(BlockId::Latest),
            "pending" => Ok(BlockId::Pending),
            other => other
                .parse::<u64>()
                .map(BlockId::Number)
                .map_err(|_| format!("Invalid block '{s}'. Use 'latest', 'pending' or a block number.")),
        }
    }
}

// ── JSON-RPC wire types ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FunctionCall<'a> {
    contract_address: Felt,
    entry_point_selector: Felt,
    calldata: &'a [Felt],
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    id: u64,
    params: (FunctionCall<'a>, BlockId),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Vec<String>>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

// ── Client ───────────────────────────────────────────────────────────

/// `starknet_call` against one contract over HTTP JSON-RPC.
pub struct StarknetRpc {
    http: reqwest::Client,
    url: String,
    contract: Felt,
    block: BlockId,
    next_id: AtomicU64,
}

impl StarknetRpc {
    pub fn new(url: &str, contract: Felt, block: BlockId, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("amm-snapshot/0.1")
            .build()?;
        Ok(StarknetRpc {
            http,
            url: url.to_string(),
            contract,
            block,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn contract(&self) -> Felt {
        self.contract
    }
}

#[async_trait]
impl RemoteQueryClient for StarknetRpc {
    async fn call(&self, entrypoint: &str, args: &[Felt]) -> Result<Vec<Felt>, RpcError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            method: "starknet_call",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            params: (
                FunctionCall {
                    contract_address: self.contract,
                    entry_point_selector: selector(entrypoint),
                    calldata: args,
                },
                self.block,
            ),
        };

        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        decode_response(resp.json::<RpcResponse>().await?)
    }
}

fn decode_response(resp: RpcResponse) -> Result<Vec<Felt>, RpcError> {
    if let Some(err) = resp.error {
        let message = match err.data {
            Some(data) => format!("{} ({data})", err.message),
            None => err.message,
        };
        return Err(RpcError::Contract {
            code: err.code,
            message,
        });
    }
    let raw = resp.result.ok_or(RpcError::MissingResult)?;
    raw.iter()
        .map(|s| s.parse::<Felt>().map_err(|e| RpcError::Decode(e.to_string())))
        .collect()
}
