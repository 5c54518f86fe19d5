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

//! # Signing oracle
//!
//! Withdrawals carry one recovered threshold signature. Producing it is the
//! job of the quorum members; this module only asks for it and waits.
//!

use std::{error, fmt, thread};
use std::time::{Duration, Instant};

use bitcoin::hashes::sha256d;
use bitcoin::Txid;

use common::LlmqType;

use crate::bls::BlsSignature;
use crate::quorum::QuorumHash;
use crate::config::Local;
use crate::rpc::{Dash, DashRpc};

/// Oracle errors.
#[derive(Debug)]
pub enum Error {
    /// The node could not be reached or refused the call.
    Rpc(jsonrpc::Error),
    /// No signer accepted the signing request.
    NoSigner,
    /// No recovered signature after polling.
    Timeout {
        /// The request.
        request_id: sha256d::Hash,
        /// Number of polls.
        attempts: u32,
    },
}

impl From<jsonrpc::Error> for Error {
    fn from(e: jsonrpc::Error) -> Error {
        Error::Rpc(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Rpc(ref e) => write!(f, "rpc: {}", e),
            Error::NoSigner => f.write_str("no signer accepted the request"),
            Error::Timeout { ref request_id, attempts } => {
                write!(f, "no recovered signature for {} after {} attempts", request_id, attempts)
            }
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::Rpc(ref e) => Some(e),
            _ => None,
        }
    }
}

/// A request for a quorum signature.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SignRequest {
    /// Quorum type that has to sign.
    pub llmq_type: LlmqType,
    /// The quorum selected for the request.
    pub quorum_hash: QuorumHash,
    /// Request id.
    pub request_id: sha256d::Hash,
    /// Message hash.
    pub msg_hash: Txid,
}

/// A recovered threshold signature.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct RecoveredSig {
    /// Quorum type.
    #[serde(rename = "llmqType")]
    pub llmq_type: LlmqType,
    /// The quorum that signed.
    #[serde(rename = "quorumHash")]
    pub quorum_hash: QuorumHash,
    /// Request id.
    #[serde(rename = "id")]
    pub request_id: sha256d::Hash,
    /// Message hash.
    #[serde(rename = "msgHash")]
    pub msg_hash: Txid,
    /// The signature.
    pub sig: BlsSignature,
}

/// How long to wait for a recovered signature.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PollConfig {
    /// Number of polls before giving up.
    pub max_attempts: u32,
    /// Sleep between polls.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> PollConfig {
        PollConfig {
            max_attempts: 30,
            interval: Duration::from_millis(500),
        }
    }
}

/// Something that can get a quorum to sign a request.
pub trait SigningOracle {
    /// The quorum that is responsible for the request id.
    fn select_quorum(
        &self,
        llmq_type: LlmqType,
        request_id: sha256d::Hash,
    ) -> Result<QuorumHash, Error>;

    /// Ask the quorum to sign.
    fn request_signature(&self, request: &SignRequest) -> Result<(), Error>;

    /// The recovered signature, if the quorum is done.
    fn recovered_sig(&self, request: &SignRequest) -> Result<Option<RecoveredSig>, Error>;
}

/// Poll the oracle until the signature is recovered or `max_attempts` polls
/// came back empty.
pub fn poll_recovered_sig<O: SigningOracle + ?Sized>(
    oracle: &O,
    request: &SignRequest,
    config: &PollConfig,
) -> Result<RecoveredSig, Error> {
    let start = Instant::now();
    for attempt in 1..=config.max_attempts {
        if let Some(sig) = oracle.recovered_sig(request)? {
            slog!(RecoveredSignature, request_id: request.request_id,
                quorum_hash: sig.quorum_hash, attempts: attempt,
            );
            return Ok(sig);
        }
        slog!(SignaturePending, request_id: request.request_id, attempt: attempt,
            max_attempts: config.max_attempts,
        );
        if attempt < config.max_attempts {
            thread::sleep(config.interval);
        }
    }

    slog!(SignatureTimeout, request_id: request.request_id, attempts: config.max_attempts,
        waited_ms: start.elapsed().as_millis() as u64,
    );
    Err(Error::Timeout {
        request_id: request.request_id,
        attempts: config.max_attempts,
    })
}

/// An oracle backed by dashd nodes: one node to query and the masternodes
/// that hold the key shares.
pub struct RpcOracle<R: DashRpc> {
    node: R,
    signers: Vec<(String, R)>,
}

impl<R: DashRpc> RpcOracle<R> {
    /// Create a new oracle.
    pub fn new(node: R, signers: Vec<(String, R)>) -> RpcOracle<R> {
        RpcOracle {
            node: node,
            signers: signers,
        }
    }
}

impl RpcOracle<Dash> {
    /// Connect to the node and the signers of the configuration.
    pub fn from_config(local: &Local) -> Result<RpcOracle<Dash>, jsonrpc::Error> {
        let node = Dash::new(
            "dashd".to_owned(),
            &local.dashd_rpc_url,
            local.dashd_rpc_user.clone(),
            local.dashd_rpc_pass.clone(),
        )?;
        let mut signers = Vec::with_capacity(local.signers.len());
        for signer in &local.signers {
            let rpc = Dash::new(
                signer.name.clone(),
                &signer.rpc_url,
                signer.rpc_user.clone(),
                signer.rpc_pass.clone(),
            )?;
            signers.push((signer.name.clone(), rpc));
        }
        Ok(RpcOracle::new(node, signers))
    }
}

impl<R: DashRpc> SigningOracle for RpcOracle<R> {
    fn select_quorum(
        &self,
        llmq_type: LlmqType,
        request_id: sha256d::Hash,
    ) -> Result<QuorumHash, Error> {
        let quorum_hash = self.node.quorum_select(llmq_type, request_id)?.quorum_hash;
        slog!(SelectQuorum, llmq_type: llmq_type.0, request_id: request_id, quorum_hash: quorum_hash);
        Ok(quorum_hash)
    }

    fn request_signature(&self, request: &SignRequest) -> Result<(), Error> {
        slog!(RequestSignature, llmq_type: request.llmq_type.0, request_id: request.request_id,
            msg_hash: request.msg_hash,
        );
        let mut accepted = 0;
        for (name, signer) in &self.signers {
            let res = signer.quorum_sign(
                request.llmq_type, request.request_id, request.msg_hash, request.quorum_hash,
            );
            match res {
                Ok(true) => accepted += 1,
                // not a member of the quorum
                Ok(false) => {}
                Err(e) => {
                    slog!(SignerUnavailable, signer: name, request_id: request.request_id,
                        error: e.to_string(),
                    );
                }
            }
        }
        if accepted == 0 {
            return Err(Error::NoSigner);
        }
        Ok(())
    }

    fn recovered_sig(&self, request: &SignRequest) -> Result<Option<RecoveredSig>, Error> {
        let has = self.node.quorum_has_recsig(request.llmq_type, request.request_id, request.msg_hash)?;
        if !has {
            return Ok(None);
        }
        let sig = self.node.quorum_recsig(request.llmq_type, request.request_id, request.msg_hash)?;
        Ok(Some(sig))
    }
}
