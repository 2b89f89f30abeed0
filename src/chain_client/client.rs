use base64::prelude::*;
use reqwest::{Client as HttpClient, ClientBuilder, header::HeaderMap};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::Config,
    types::{BlockHeight, StorageProof},
};

use super::{
    error::{
        Error, RPC_DUPLICATE_TRANSACTION, RPC_MALFORMED_TRANSACTION, RPC_REJECTED_TRANSACTION,
    },
    types::{BlockSummary, ChainInfo, Request, Response, RpcErrorDetail},
};

/// JSON-RPC client for the consensus daemon, covering the chain queries and
/// the transaction-pool submission endpoint.
#[derive(Clone, Debug)]
pub struct Client {
    client: HttpClient,
    url: String,
}

const JSONRPC: &str = "2.0";

impl Client {
    pub fn new(url: String, user: String, password: String) -> Result<Self, Error> {
        let client = ClientBuilder::new()
            .default_headers({
                let mut headers = HeaderMap::new();
                let auth_str = BASE64_STANDARD.encode(format!("{}:{}", user, password));
                headers.insert("Authorization", format!("Basic {}", auth_str).parse()?);
                headers.insert("Content-Type", "application/json".parse()?);
                headers.insert("Accept", "application/json".parse()?);
                headers
            })
            .build()?;

        Ok(Client { client, url })
    }

    pub fn new_from_config(config: &Config) -> Result<Self, Error> {
        Client::new(
            config.chain_rpc_url.clone(),
            config.chain_rpc_user.clone(),
            config.chain_rpc_password.clone(),
        )
    }

    fn handle_response<T>(response: Response) -> Result<T, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        match (response.result, response.error) {
            (Some(result), None) => Ok(serde_json::from_value(result)?),
            (None, Some(error)) => {
                let detail: RpcErrorDetail = serde_json::from_value(error)?;
                Err(match detail.code {
                    RPC_DUPLICATE_TRANSACTION => Error::Duplicate,
                    RPC_MALFORMED_TRANSACTION => Error::Malformed(detail.message),
                    RPC_REJECTED_TRANSACTION => Error::Rejected(detail.message),
                    _ => Error::ChainRpc {
                        code: detail.code,
                        message: detail.message,
                    },
                })
            }
            (None, None) => Err(Error::Unexpected(
                "No result or error in RPC response".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::Unexpected(
                "Both result and error present in RPC response".to_string(),
            )),
        }
    }

    pub async fn call<T>(&self, method: &str, params: Vec<Value>) -> Result<T, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = Request {
            jsonrpc: JSONRPC.to_owned(),
            id: "0".to_string(),
            method: method.to_string(),
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json::<Response>()
            .await?;

        Self::handle_response(response)
    }

    pub async fn get_chain_info(&self) -> Result<ChainInfo, Error> {
        self.call("getchaininfo", vec![]).await
    }

    pub async fn get_block(&self, height: BlockHeight) -> Result<BlockSummary, Error> {
        self.call("getblock", vec![height.into()]).await
    }

    pub async fn submit_storage_proof(&self, proof: &StorageProof) -> Result<(), Error> {
        let _: Value = self
            .call("submitstorageproof", vec![serde_json::to_value(proof)?])
            .await?;
        Ok(())
    }
}

/// The narrow consensus + transaction-pool surface the engine consumes;
/// tests substitute mocks.
pub trait ChainRpc: Send + Sync + Clone + 'static {
    fn get_chain_info(&self) -> impl Future<Output = Result<ChainInfo, Error>> + Send;
    fn get_block(
        &self,
        height: BlockHeight,
    ) -> impl Future<Output = Result<BlockSummary, Error>> + Send;
    fn submit_storage_proof(
        &self,
        proof: &StorageProof,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

impl ChainRpc for Client {
    async fn get_chain_info(&self) -> Result<ChainInfo, Error> {
        self.get_chain_info().await
    }

    async fn get_block(&self, height: BlockHeight) -> Result<BlockSummary, Error> {
        self.get_block(height).await
    }

    async fn submit_storage_proof(&self, proof: &StorageProof) -> Result<(), Error> {
        self.submit_storage_proof(proof).await
    }
}
