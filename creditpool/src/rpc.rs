//{{ Liquid }}
//Copyright (C) {{ 2015,2016,2017,2018 }}  {{ Blockstream }}

//This program is free software: you can redistribute it and/or modify
//it under the terms of the GNU Affero General Public License as published by
//the Free Software Foundation, either version 3 of the License, or
//(at your option) any later version.

//This program is distributed in the hope that it will be useful,
//but WITHOUT ANY WARRANTY; without even the implied warranty of
//MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//GNU Affero General Public License for more details.

//You should have received a copy of the GNU Affero General Public License
//along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # RPC
//! Support for interacting with the dashd RPC interface
//!

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bitcoin::hashes::sha256d;
use bitcoin::hex::FromHex;
use bitcoin::{Amount, BlockHash, Txid};
use serde_json::value::RawValue;

use common::{BlockHeight, LlmqType};

use crate::bls::BlsPublicKey;
use crate::oracle::RecoveredSig;
use crate::quorum::{Quorum, QuorumHash};
use crate::transaction::Block;

const RPC_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Error code of dashd for an unknown block, transaction or key.
pub const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;

/// Header information returned by `getblockheader`.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BlockHeaderInfo {
    /// The block hash.
    pub hash: BlockHash,
    /// The block height.
    pub height: BlockHeight,
    /// Confirmations; -1 when the block is not on the best chain.
    pub confirmations: i64,
    /// The parent, absent for the genesis block.
    #[serde(default, rename = "previousblockhash")]
    pub prev_blockhash: Option<BlockHash>,
}

/// Response to `quorum selectquorum`.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SelectQuorumResponse {
    /// The quorum responsible for the request id.
    #[serde(rename = "quorumHash")]
    pub quorum_hash: QuorumHash,
}

/// Trait representing something we can do general JSONRPC queries on; abstracts
/// over `jsonrpc::client::Client` so it can be mocked out during testing.
pub trait Rpc {
    /// Convenience method to do a JSONRPC query and deserialize the result
    fn jsonrpc_query<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        args: &[jsonrpc::serde_json::Value],
    ) -> Result<T, jsonrpc::Error>;

    /// If there is any other error returns the Error, otherwise returns false.
    fn is_warming_up(&self, endpoint_name: &str) -> Result<bool, jsonrpc::Error>;

    /// Get the number of blocks in the best chain.
    fn block_count(&self) -> Result<BlockHeight, jsonrpc::Error> {
        self.jsonrpc_query("getblockcount", &[])
    }
}

/// Dash Core-specific RPC methods.
pub trait DashRpc: Rpc {
    /// Do a JSONRPC query for a hex string and decode it.
    fn jsonrpc_query_bytes(
        &self,
        query: &'static str,
        args: &[jsonrpc::serde_json::Value],
    ) -> Result<Vec<u8>, jsonrpc::Error> {
        let hex = self.jsonrpc_query::<String>(query, args)?;
        Vec::<u8>::from_hex(&hex[..]).map_err(|e| jsonrpc::Error::Json(
            serde::de::Error::custom(format!("[bug] bad hex from jsonrpc: {}", e))
        ))
    }

    /// The last block hash in the chain.
    fn tip(&self) -> Result<BlockHash, jsonrpc::Error> {
        self.jsonrpc_query("getbestblockhash", &[])
    }

    /// Get the block hash at the given height.
    fn block_at(&self, height: BlockHeight) -> Result<BlockHash, jsonrpc::Error> {
        self.jsonrpc_query("getblockhash", &[height.into()])
    }

    /// Header information of a block, if the node knows it.
    fn block_header_info(&self, hash: BlockHash) -> Result<Option<BlockHeaderInfo>, jsonrpc::Error> {
        match self.jsonrpc_query::<BlockHeaderInfo>("getblockheader", &[hash.to_string().into()]) {
            Ok(resp) => Ok(Some(resp)),
            Err(jsonrpc::Error::Rpc(ref e)) if e.code == RPC_INVALID_ADDRESS_OR_KEY => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a full block.
    fn block(&self, hash: BlockHash, height: BlockHeight) -> Result<Block, jsonrpc::Error> {
        let data = self.jsonrpc_query_bytes("getblock", &[hash.to_string().into(), 0.into()])?;
        Block::from_raw(hash, height, &data).map_err(|e| jsonrpc::Error::Json(
            serde::de::Error::custom(format!("[bug] bad block from jsonrpc: {}", e))
        ))
    }

    /// The credit pool balance the node committed to in the coinbase of a block.
    fn block_pool_balance(&self, hash: BlockHash) -> Result<Option<Amount>, jsonrpc::Error> {
        #[derive(Deserialize)]
        struct CbTx {
            #[serde(default, rename = "creditPoolBalance", with = "bitcoin::amount::serde::as_btc::opt")]
            credit_pool_balance: Option<Amount>,
        }
        #[derive(Deserialize)]
        struct Response {
            #[serde(default, rename = "cbTx")]
            cbtx: Option<CbTx>,
        }
        let res = self.jsonrpc_query::<Response>("getblock", &[hash.to_string().into(), 1.into()])?;
        Ok(res.cbtx.and_then(|cb| cb.credit_pool_balance))
    }

    /// Hashes of the most recent quorums of a type.
    fn quorum_list(&self, llmq_type: LlmqType, count: usize) -> Result<Vec<QuorumHash>, jsonrpc::Error> {
        let name = match llmq_type.name() {
            Some(name) => name,
            None => return Ok(vec![]),
        };
        let mut res = self.jsonrpc_query::<HashMap<String, Vec<QuorumHash>>>(
            "quorum", &["list".into(), count.into()],
        )?;
        Ok(res.remove(name).unwrap_or_default())
    }

    /// Details of a quorum.
    fn quorum_info(&self, llmq_type: LlmqType, quorum_hash: QuorumHash) -> Result<Quorum, jsonrpc::Error> {
        #[derive(Deserialize)]
        struct Response {
            height: BlockHeight,
            #[serde(rename = "quorumHash")]
            quorum_hash: QuorumHash,
            #[serde(rename = "quorumPublicKey")]
            public_key: BlsPublicKey,
        }
        let res = self.jsonrpc_query::<Response>(
            "quorum", &["info".into(), llmq_type.0.into(), quorum_hash.to_string().into()],
        )?;
        Ok(Quorum {
            llmq_type: llmq_type,
            quorum_hash: res.quorum_hash,
            height: res.height,
            public_key: res.public_key,
        })
    }

    /// The quorum responsible for signing a request id.
    fn quorum_select(
        &self,
        llmq_type: LlmqType,
        request_id: sha256d::Hash,
    ) -> Result<SelectQuorumResponse, jsonrpc::Error> {
        self.jsonrpc_query("quorum", &[
            "selectquorum".into(), llmq_type.0.into(), request_id.to_string().into(),
        ])
    }

    /// Ask this masternode to contribute a signature share.
    fn quorum_sign(
        &self,
        llmq_type: LlmqType,
        request_id: sha256d::Hash,
        msg_hash: Txid,
        quorum_hash: QuorumHash,
    ) -> Result<bool, jsonrpc::Error> {
        self.jsonrpc_query("quorum", &[
            "sign".into(), llmq_type.0.into(), request_id.to_string().into(),
            msg_hash.to_string().into(), quorum_hash.to_string().into(),
        ])
    }

    /// Whether a recovered signature exists for the request.
    fn quorum_has_recsig(
        &self,
        llmq_type: LlmqType,
        request_id: sha256d::Hash,
        msg_hash: Txid,
    ) -> Result<bool, jsonrpc::Error> {
        self.jsonrpc_query("quorum", &[
            "hasrecsig".into(), llmq_type.0.into(), request_id.to_string().into(),
            msg_hash.to_string().into(),
        ])
    }

    /// The recovered signature of a request.
    fn quorum_recsig(
        &self,
        llmq_type: LlmqType,
        request_id: sha256d::Hash,
        msg_hash: Txid,
    ) -> Result<RecoveredSig, jsonrpc::Error> {
        self.jsonrpc_query("quorum", &[
            "getrecsig".into(), llmq_type.0.into(), request_id.to_string().into(),
            msg_hash.to_string().into(),
        ])
    }
}

/// If there is any other error returns the Error, otherwise returns false.
fn is_warming_up(client: &jsonrpc::client::Client, endpoint_name: &str) -> Result<bool, jsonrpc::Error> {
    const RPC_IN_WARMUP: i32 = -28;
    let request = client.build_request("getblockchaininfo", &[]);
    match client.send_request(request) {
        Ok(response) => {
            match response.error {
                Some(e) => {
                    if e.code == RPC_IN_WARMUP {
                        slog!(WarmingUp, daemon: endpoint_name);
                        Ok(true)
                    } else {
                        let e = jsonrpc::Error::Rpc(e);
                        slog!(Error, daemon: endpoint_name, action: "warmup check".to_owned(),
                            error: &e
                        );
                        Err(e)
                    }
                }
                None => {
                    slog!(WarmedUp, daemon: endpoint_name);
                    Ok(false)
                }
            }
        }
        Err(e) => {
            slog!(Error, daemon: endpoint_name, action: "warmup check".to_owned(), error: &e);
            Err(e)
        }
    }
}

/// A Dash Core client.
pub struct Dash {
    /// The underlying jsonrpc client.
    client: jsonrpc::client::Client,
    /// Name used in logs.
    name: String,
}

impl Dash {
    /// Create a new Dash Core client.
    pub fn new(
        name: String,
        url: &str,
        user: Option<String>,
        pass: Option<String>,
    ) -> Result<Dash, jsonrpc::Error> {
        let mut client_builder = jsonrpc::simple_http::Builder::new()
            .timeout(RPC_TIMEOUT)
            .url(url)?;
        if let Some(u) = user {
            client_builder = client_builder.auth(u, pass);
        }
        Ok(Dash {
            client: jsonrpc::Client::with_transport(client_builder.build()),
            name: name,
        })
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Rpc for Dash {
    /// Convenience method to do a JSONRPC query and deserialize the result
    fn jsonrpc_query<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        args: &[jsonrpc::serde_json::Value],
    ) -> Result<T, jsonrpc::Error> {
        let args_raw: Vec<Box<RawValue>> = args.iter().map(|a| jsonrpc::arg(a)).collect();
        slog!(RpcRequest, daemon: &self.name, method: query,
            arguments: &args_raw.iter().map(|a| a.get().to_owned()).collect::<Vec<_>>()
        );
        let request = self.client.build_request(query, &args_raw);
        let start_time = Instant::now();
        let response = self.client.send_request(request)?;
        let duration_ns = start_time.elapsed().as_nanos();
        if let Some(ref error) = response.error {
            slog!(RpcResponse, daemon: &self.name, method: query,
                result: format!("error: {:?}", error).as_str(), duration_ns
            );
        } else if let Some(ref result) = response.result {
            let size = result.get().len();
            slog!(RpcResponse, daemon: &self.name, method: query, duration_ns,
                result: format!("{} bytes", size).as_str(),
            );
            slog!(RpcResultTrace, daemon: &self.name, result: &result.to_string());
        } else {
            slog!(RpcResponse, daemon: &self.name, method: query, result: "null", duration_ns);
        }
        response.result::<T>()
    }

    fn is_warming_up(&self, endpoint_name: &str) -> Result<bool, jsonrpc::Error> {
        is_warming_up(&self.client, endpoint_name)
    }
}
impl DashRpc for Dash {}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;
    use crate::bls::BlsSecretKey;

    struct DummyNode {
        pubkey: BlsPublicKey,
    }

    impl DummyNode {
        fn quorum(&self, sub: String, a: serde_json::Value, b: serde_json::Value) -> serde_json::Value {
            match &sub[..] {
                "list" => {
                    assert_eq!(a, serde_json::Value::from(2));
                    serde_json::json!({
                        "llmq_test": [BlockHash::from_byte_array([1; 32])],
                        "llmq_test_platform": [BlockHash::from_byte_array([2; 32])],
                    })
                }
                "info" => serde_json::json!({
                    "height": 40,
                    "type": "llmq_test_platform",
                    "quorumHash": b,
                    "quorumPublicKey": self.pubkey.to_string(),
                }),
                _ => panic!("unexpected quorum call {}", sub),
            }
        }
    }

    impl_dummy_rpc!(
        DummyNode,
        dummy,
        "getblock", hash, verbosity => {
            let _: BlockHash = hash;
            match verbosity {
                0u8 => serde_json::Value::from("00"),
                _ => serde_json::json!({ "cbTx": { "version": 3, "creditPoolBalance": 12.5 } }),
            }
        },
        "quorum", sub, a, b => dummy.quorum(sub, a, b)
    );

    #[test]
    fn hash_decode() {
        let hash_str = "\"84e3fba7a2e319acd03098f80ad4b44f8efbcd7e6a70cced228b2d706c2012c6\"";
        let _: sha256d::Hash = serde_json::from_str(&hash_str).expect("decoding json");
        let _: BlockHash = serde_json::from_str(&hash_str).expect("decoding json");
        let _: Txid = serde_json::from_str(&hash_str).expect("decoding json");
    }

    #[test]
    fn header_decode() {
        let header = "{
          \"hash\": \"84e3fba7a2e319acd03098f80ad4b44f8efbcd7e6a70cced228b2d706c2012c6\",
          \"confirmations\": -1,
          \"height\": 1001,
          \"version\": 536870912,
          \"previousblockhash\": \"0000000000000000000000000000000000000000000000000000000000000000\"
        }";
        let info: BlockHeaderInfo = serde_json::from_str(header).expect("decoding json");
        assert_eq!(info.height, 1001);
        assert_eq!(info.confirmations, -1);
        assert_eq!(info.prev_blockhash, Some(BlockHash::all_zeros()));
    }

    #[test]
    fn pool_balance_and_quorums() {
        let pubkey = BlsSecretKey::from_seed(&[1; 32]).unwrap().public_key();
        let node = DummyNode { pubkey: pubkey };

        let balance = node.block_pool_balance(BlockHash::all_zeros()).unwrap();
        assert_eq!(balance, Some(Amount::from_sat(1_250_000_000)));

        let list = node.quorum_list(LlmqType::LLMQ_TEST_PLATFORM, 2).unwrap();
        assert_eq!(list, vec![BlockHash::from_byte_array([2; 32])]);
        assert!(node.quorum_list(LlmqType(42), 2).unwrap().is_empty());

        let quorum = node.quorum_info(LlmqType::LLMQ_TEST_PLATFORM, list[0]).unwrap();
        assert_eq!(quorum.height, 40);
        assert_eq!(quorum.quorum_hash, list[0]);
        assert_eq!(quorum.public_key, pubkey);
    }

    /// A node answering every call with the same error code.
    struct FailingNode(i32);

    impl Rpc for FailingNode {
        fn jsonrpc_query<T: serde::de::DeserializeOwned>(
            &self,
            _: &str,
            _: &[jsonrpc::serde_json::Value],
        ) -> Result<T, jsonrpc::Error> {
            Err(jsonrpc::Error::Rpc(jsonrpc::error::RpcError {
                code: self.0,
                message: "failing".to_owned(),
                data: None,
            }))
        }

        fn is_warming_up(&self, _: &str) -> Result<bool, jsonrpc::Error> {
            Ok(false)
        }
    }
    impl DashRpc for FailingNode {}

    #[test]
    fn unknown_header() {
        let unknown = FailingNode(RPC_INVALID_ADDRESS_OR_KEY);
        assert_eq!(unknown.block_header_info(BlockHash::all_zeros()).unwrap(), None);

        // warming up is not the same as not knowing the block
        let warming = FailingNode(-28);
        match warming.block_header_info(BlockHash::all_zeros()) {
            Err(jsonrpc::Error::Rpc(e)) => assert_eq!(e.code, -28),
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn bad_block_hex() {
        let node = DummyNode { pubkey: BlsSecretKey::from_seed(&[1; 32]).unwrap().public_key() };
        assert!(node.block(BlockHash::all_zeros(), 1).is_err());
    }
}
