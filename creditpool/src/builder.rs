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

//! # Transaction builders
//!
//! Assemble asset locks from funding inputs, and asset unlocks from a
//! withdrawal request plus a quorum signature obtained through the oracle.
//!

use std::{error, fmt};

use bitcoin::hashes::sha256d;
use bitcoin::{Amount, ScriptBuf, TxIn, TxOut, Txid};

use common::constants::{tx_type, ASSET_LOCK_PAYLOAD_VERSION, ASSET_UNLOCK_PAYLOAD_VERSION};
use common::LlmqType;

use crate::assetlock::{self, AssetLockPayload, AssetUnlockPayload};
use crate::bls::BlsSignature;
use crate::oracle::{self, poll_recovered_sig, PollConfig, SignRequest, SigningOracle};
use crate::quorum::QuorumHash;
use crate::transaction::Transaction;

/// Builder errors.
#[derive(Debug)]
pub enum Error {
    /// An asset lock needs at least one credit output.
    NoCreditOutputs,
    /// The transaction does not pass its own checks.
    Invalid(assetlock::Error),
    /// The oracle failed.
    Oracle(oracle::Error),
    /// The quorum did not sign in time.
    OracleTimeout {
        /// The request.
        request_id: sha256d::Hash,
        /// Number of polls.
        attempts: u32,
    },
    /// The recovered signature is from another quorum than the selected one.
    WrongQuorum {
        /// Selected quorum.
        expected: QuorumHash,
        /// Signing quorum.
        got: QuorumHash,
    },
    /// The recovered signature is over another message.
    WrongMessageHash {
        /// Hash of our transaction.
        expected: Txid,
        /// Hash that was signed.
        got: Txid,
    },
}

impl From<assetlock::Error> for Error {
    fn from(e: assetlock::Error) -> Error {
        Error::Invalid(e)
    }
}

impl From<oracle::Error> for Error {
    fn from(e: oracle::Error) -> Error {
        match e {
            oracle::Error::Timeout { request_id, attempts } => Error::OracleTimeout {
                request_id: request_id,
                attempts: attempts,
            },
            e => Error::Oracle(e),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::NoCreditOutputs => f.write_str("asset lock without credit outputs"),
            Error::Invalid(ref e) => write!(f, "built an invalid transaction: {}", e),
            Error::Oracle(ref e) => write!(f, "signing oracle: {}", e),
            Error::OracleTimeout { ref request_id, attempts } => write!(f,
                "quorum did not sign {} after {} attempts", request_id, attempts,
            ),
            Error::WrongQuorum { ref expected, ref got } => {
                write!(f, "signature by quorum {} instead of {}", got, expected)
            }
            Error::WrongMessageHash { ref expected, ref got } => {
                write!(f, "signature over {} instead of {}", got, expected)
            }
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::Invalid(ref e) => Some(e),
            Error::Oracle(ref e) => Some(e),
            _ => None,
        }
    }
}

/// Builds an asset lock.
#[derive(Clone, Debug, Default)]
pub struct AssetLockBuilder {
    inputs: Vec<TxIn>,
    credit_outputs: Vec<TxOut>,
    change: Option<TxOut>,
}

impl AssetLockBuilder {
    /// Create an empty builder.
    pub fn new() -> AssetLockBuilder {
        Default::default()
    }

    /// Spend a funding input.
    pub fn input(mut self, input: TxIn) -> AssetLockBuilder {
        self.inputs.push(input);
        self
    }

    /// Credit `value` to a P2PKH script on the platform side.
    pub fn credit(mut self, script_pubkey: ScriptBuf, value: Amount) -> AssetLockBuilder {
        self.credit_outputs.push(TxOut {
            value: value,
            script_pubkey: script_pubkey,
        });
        self
    }

    /// Return change to a script.
    pub fn change(mut self, script_pubkey: ScriptBuf, value: Amount) -> AssetLockBuilder {
        self.change = Some(TxOut {
            value: value,
            script_pubkey: script_pubkey,
        });
        self
    }

    /// Build the unsigned transaction.
    pub fn build(self) -> Result<Transaction, Error> {
        if self.credit_outputs.is_empty() {
            return Err(Error::NoCreditOutputs);
        }
        let total = self.credit_outputs.iter()
            .try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.value))
            .ok_or(Error::Invalid(assetlock::Error::CreditAmountMismatch {
                credited: Amount::MAX,
                locked: Amount::ZERO,
            }))?;

        let mut tx = Transaction::new_special(tx_type::ASSET_LOCK);
        tx.input = self.inputs;
        tx.output.push(TxOut {
            value: total,
            script_pubkey: ScriptBuf::from_bytes(vec![0x6a, 0x00]),
        });
        tx.output.extend(self.change);
        tx.set_payload(&AssetLockPayload {
            version: ASSET_LOCK_PAYLOAD_VERSION,
            credit_outputs: self.credit_outputs,
        });
        assetlock::check_asset_lock_tx(&tx)?;
        Ok(tx)
    }
}

/// Builds an asset unlock and gets it signed.
#[derive(Clone, Debug)]
pub struct AssetUnlockBuilder {
    index: u64,
    fee: u32,
    requested_height: u32,
    outputs: Vec<TxOut>,
}

impl AssetUnlockBuilder {
    /// Start a withdrawal.
    pub fn new(index: u64, fee: u32, requested_height: u32) -> AssetUnlockBuilder {
        AssetUnlockBuilder {
            index: index,
            fee: fee,
            requested_height: requested_height,
            outputs: vec![],
        }
    }

    /// Pay `value` to a script.
    pub fn output(mut self, script_pubkey: ScriptBuf, value: Amount) -> AssetUnlockBuilder {
        self.outputs.push(TxOut {
            value: value,
            script_pubkey: script_pubkey,
        });
        self
    }

    /// Have a quorum of type `llmq_type` sign the withdrawal and return the
    /// finished transaction.
    pub fn build<O: SigningOracle + ?Sized>(
        &self,
        oracle: &O,
        llmq_type: LlmqType,
        config: &PollConfig,
    ) -> Result<Transaction, Error> {
        let request_id = assetlock::request_id(self.index);
        let quorum_hash = oracle.select_quorum(llmq_type, request_id)?;

        let mut payload = AssetUnlockPayload {
            version: ASSET_UNLOCK_PAYLOAD_VERSION,
            index: self.index,
            fee: self.fee,
            requested_height: self.requested_height,
            quorum_hash: quorum_hash,
            quorum_sig: BlsSignature::null(),
        };
        let mut tx = Transaction::new_special(tx_type::ASSET_UNLOCK);
        tx.output = self.outputs.clone();
        tx.set_payload(&payload);
        assetlock::check_asset_unlock_tx(&tx)?;

        let request = SignRequest {
            llmq_type: llmq_type,
            quorum_hash: quorum_hash,
            request_id: request_id,
            msg_hash: assetlock::message_hash(&tx, &payload),
        };
        oracle.request_signature(&request)?;
        let recovered = poll_recovered_sig(oracle, &request, config)?;
        if recovered.quorum_hash != quorum_hash {
            return Err(Error::WrongQuorum {
                expected: quorum_hash,
                got: recovered.quorum_hash,
            });
        }
        if recovered.msg_hash != request.msg_hash {
            return Err(Error::WrongMessageHash {
                expected: request.msg_hash,
                got: recovered.msg_hash,
            });
        }

        payload.quorum_sig = recovered.sig;
        tx.set_payload(&payload);
        Ok(tx)
    }
}
