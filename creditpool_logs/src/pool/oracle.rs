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

//! # Quorum and signing oracle logs
//!

use bitcoin::hashes::sha256d;
use bitcoin::{BlockHash, Txid};

/// A quorum became known.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RegisterQuorum {
    /// Quorum type.
    pub llmq_type: u8,
    /// Quorum hash.
    pub quorum_hash: BlockHash,
    /// Height the quorum was formed at.
    pub height: u64,
}

/// Old quorums were forgotten.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct PruneQuorums {
    /// Quorums formed at or below this height were considered.
    pub formed_below: u64,
    /// Number of quorums forgotten.
    pub removed: usize,
}

/// The oracle picked the quorum responsible for a request.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SelectQuorum {
    /// Quorum type.
    pub llmq_type: u8,
    /// Request id.
    pub request_id: sha256d::Hash,
    /// The selected quorum.
    pub quorum_hash: BlockHash,
}

/// We asked the quorum members to sign.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RequestSignature {
    /// Quorum type.
    pub llmq_type: u8,
    /// Request id.
    pub request_id: sha256d::Hash,
    /// Message hash.
    pub msg_hash: Txid,
}

/// The recovered signature is not available yet.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SignaturePending {
    /// Request id.
    pub request_id: sha256d::Hash,
    /// The attempt that came back empty.
    pub attempt: u32,
    /// Number of attempts we will make.
    pub max_attempts: u32,
}

/// A recovered signature was obtained.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RecoveredSignature {
    /// Request id.
    pub request_id: sha256d::Hash,
    /// The quorum that signed.
    pub quorum_hash: BlockHash,
    /// Number of polls needed.
    pub attempts: u32,
}

/// No recovered signature appeared within the polling bound.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SignatureTimeout {
    /// Request id.
    pub request_id: sha256d::Hash,
    /// Number of polls made.
    pub attempts: u32,
    /// Total time spent waiting, in milliseconds.
    pub waited_ms: u64,
}

/// A signer node did not take our signing request.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SignerUnavailable<'a> {
    /// The signer's RPC url.
    pub signer: &'a str,
    /// Request id.
    pub request_id: sha256d::Hash,
    /// Error returned.
    pub error: String,
}
