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

//! # Asset locks and unlocks
//!
//! An asset lock moves coins into the credit pool: the coins are burned in
//! an empty `OP_RETURN` output and the payload lists the outputs they are
//! credited to on the platform side.
//!
//! An asset unlock pays coins out of the pool. It has no inputs, its outputs
//! are the withdrawal and its payload carries a recovered quorum signature
//! over the transaction.
//!
//! The checks here only look at a single transaction plus, for unlocks, the
//! quorums and the height. Everything that depends on the pool state lives
//! in the ledger.
//!

use std::{error, fmt};

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{Amount, Script, TxOut, Txid};

use common::constants::{
    tx_type, ASSET_LOCK_PAYLOAD_VERSION, ASSET_UNLOCK_PAYLOAD_VERSION,
    ASSET_UNLOCK_REQUEST_ID_PREFIX, MAXIMUM_WITHDRAWALS, MAX_MONEY, MNHF_REQUEST_ID_PREFIX,
};
use common::{BlockHeight, ConsensusParams};

use crate::bls::BlsSignature;
use crate::quorum::{QuorumHash, QuorumRegistry};
use crate::transaction::Transaction;

/// Payload of an asset lock.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AssetLockPayload {
    /// Payload version.
    pub version: u8,
    /// Outputs credited on the platform side.
    pub credit_outputs: Vec<TxOut>,
}
impl_consensus_encoding!(AssetLockPayload, version, credit_outputs);

/// Payload of an asset unlock.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AssetUnlockPayload {
    /// Payload version.
    pub version: u8,
    /// Withdrawal index, unique per chain.
    pub index: u64,
    /// Fee paid to the miner, in duffs.
    pub fee: u32,
    /// Height at which the platform asked for the withdrawal.
    pub requested_height: u32,
    /// Quorum that signed the withdrawal.
    pub quorum_hash: QuorumHash,
    /// Recovered signature of that quorum.
    pub quorum_sig: BlsSignature,
}
impl_consensus_encoding!(AssetUnlockPayload, version, index, fee, requested_height, quorum_hash, quorum_sig);

impl AssetUnlockPayload {
    /// The request id the quorum signs this withdrawal under.
    pub fn request_id(&self) -> sha256d::Hash {
        request_id(self.index)
    }

    /// The fee as an amount.
    pub fn fee_amount(&self) -> Amount {
        Amount::from_sat(self.fee as u64)
    }
}

/// Errors of a single lock or unlock transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Not an asset lock.
    WrongLockType(u16),
    /// An `OP_RETURN` output carries data.
    NonEmptyReturn,
    /// The `OP_RETURN` output has no value.
    ZeroOutReturn,
    /// More than one `OP_RETURN` output.
    MultipleReturn,
    /// No `OP_RETURN` output.
    NoReturn,
    /// The lock payload does not decode.
    BadLockPayload,
    /// Unknown lock payload version.
    BadLockVersion(u8),
    /// The lock credits nothing.
    EmptyCreditOutputs,
    /// A credit output is not pay-to-pubkey-hash.
    NonP2pkhCreditOutput,
    /// Credit outputs do not add up to the burned amount.
    CreditAmountMismatch {
        /// Sum of the credit outputs.
        credited: Amount,
        /// Value of the `OP_RETURN` output.
        locked: Amount,
    },
    /// An output or the credited total is above the money supply.
    LockAmountTooLarge(Amount),
    /// Not an asset unlock.
    WrongUnlockType(u16),
    /// An unlock spends inputs.
    UnlockHasInput,
    /// An unlock with too many outputs.
    TooManyOutputs(usize),
    /// The unlock payload does not decode.
    BadUnlockPayload,
    /// Unknown unlock payload version.
    BadUnlockVersion(u8),
    /// Zero fee or an amount outside the money range.
    FeeOutOfRange(u32),
    /// Fee above the configured ceiling.
    FeeAbsurdlyHigh {
        /// The fee.
        fee: Amount,
        /// The ceiling.
        ceiling: Amount,
    },
    /// The quorum is not known.
    UnknownQuorum(QuorumHash),
    /// The signature does not verify against the quorum key.
    SignatureNotVerified(QuorumHash),
    /// The quorum is known but no longer among the active ones.
    QuorumNotActive(QuorumHash),
    /// The unlock is outside its height window.
    RequestTooLate {
        /// Height the withdrawal was requested at.
        requested: BlockHeight,
        /// Height it is being validated at.
        height: BlockHeight,
    },
}

impl Error {
    /// The reject reason reported to peers and in RPC results.
    pub fn reject_reason(&self) -> &'static str {
        match *self {
            Error::WrongLockType(_) => "bad-assetlocktx-type",
            Error::NonEmptyReturn => "bad-assetlocktx-non-empty-return",
            Error::ZeroOutReturn => "bad-assetlocktx-zeroout-return",
            Error::MultipleReturn => "bad-assetlocktx-multiple-return",
            Error::NoReturn => "bad-assetlocktx-no-return",
            Error::BadLockPayload => "bad-assetlocktx-payload",
            Error::BadLockVersion(_) => "bad-assetlocktx-version",
            Error::EmptyCreditOutputs => "bad-assetlocktx-emptycreditoutputs",
            Error::NonP2pkhCreditOutput => "bad-assetlocktx-pubKeyHash",
            Error::CreditAmountMismatch { .. } => "bad-assetlocktx-creditamount",
            Error::LockAmountTooLarge(_) => "bad-txns-txouttotal-toolarge",
            Error::WrongUnlockType(_) => "bad-assetunlocktx-type",
            Error::UnlockHasInput => "bad-assetunlocktx-have-input",
            Error::TooManyOutputs(_) => "bad-assetunlocktx-too-many-outs",
            Error::BadUnlockPayload => "bad-assetunlocktx-payload",
            Error::BadUnlockVersion(_) => "bad-assetunlocktx-version",
            Error::FeeOutOfRange(_) => "bad-txns-assetunlock-fee-outofrange",
            Error::FeeAbsurdlyHigh { .. } => "absurdly-high-fee",
            Error::UnknownQuorum(_) => "bad-assetunlock-quorum-hash",
            Error::SignatureNotVerified(_) => "bad-assetunlock-not-verified",
            Error::QuorumNotActive(_) => "bad-assetunlock-not-active-quorum",
            Error::RequestTooLate { .. } => "bad-assetunlock-too-late",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::WrongLockType(t) => write!(f, "expected asset lock, got type {}", t),
            Error::NonEmptyReturn => f.write_str("OP_RETURN output carries data"),
            Error::ZeroOutReturn => f.write_str("OP_RETURN output has no value"),
            Error::MultipleReturn => f.write_str("more than one OP_RETURN output"),
            Error::NoReturn => f.write_str("no OP_RETURN output"),
            Error::BadLockPayload => f.write_str("undecodable asset lock payload"),
            Error::BadLockVersion(v) => write!(f, "unknown asset lock payload version {}", v),
            Error::EmptyCreditOutputs => f.write_str("asset lock without credit outputs"),
            Error::NonP2pkhCreditOutput => f.write_str("credit output is not P2PKH"),
            Error::CreditAmountMismatch { credited, locked } => {
                write!(f, "credit outputs sum to {} but {} is locked", credited, locked)
            }
            Error::LockAmountTooLarge(amount) => write!(f, "lock amount {} out of range", amount),
            Error::WrongUnlockType(t) => write!(f, "expected asset unlock, got type {}", t),
            Error::UnlockHasInput => f.write_str("asset unlock has inputs"),
            Error::TooManyOutputs(n) => {
                write!(f, "asset unlock has {} outputs, max {}", n, MAXIMUM_WITHDRAWALS)
            }
            Error::BadUnlockPayload => f.write_str("undecodable asset unlock payload"),
            Error::BadUnlockVersion(v) => write!(f, "unknown asset unlock payload version {}", v),
            Error::FeeOutOfRange(fee) => write!(f, "fee {} or withdrawal out of range", fee),
            Error::FeeAbsurdlyHigh { fee, ceiling } => {
                write!(f, "fee {} above ceiling {}", fee, ceiling)
            }
            Error::UnknownQuorum(ref h) => write!(f, "unknown quorum {}", h),
            Error::SignatureNotVerified(ref h) => write!(f, "signature of quorum {} does not verify", h),
            Error::QuorumNotActive(ref h) => write!(f, "quorum {} is not active", h),
            Error::RequestTooLate { requested, height } => {
                write!(f, "withdrawal requested at {} cannot be mined at {}", requested, height)
            }
        }
    }
}

impl error::Error for Error {}

/// `sha256d(ser_string(prefix) || value)`.
fn tagged_request_id(prefix: &str, value: [u8; 8]) -> sha256d::Hash {
    let mut data = serialize(&prefix.to_owned());
    data.extend_from_slice(&value);
    sha256d::Hash::hash(&data)
}

/// Request id of the withdrawal with the given index.
pub fn request_id(index: u64) -> sha256d::Hash {
    tagged_request_id(ASSET_UNLOCK_REQUEST_ID_PREFIX, index.to_le_bytes())
}

/// Request id of a hard-fork signal for the given version bit.
pub fn mnhf_request_id(version_bit: i64) -> sha256d::Hash {
    tagged_request_id(MNHF_REQUEST_ID_PREFIX, version_bit.to_le_bytes())
}

/// The hash a quorum signs for an unlock: its txid with a null signature.
pub fn message_hash(tx: &Transaction, payload: &AssetUnlockPayload) -> Txid {
    let mut unsigned = tx.clone();
    unsigned.set_payload(&AssetUnlockPayload {
        quorum_sig: BlsSignature::null(),
        ..payload.clone()
    });
    unsigned.txid()
}

/// Whether the script is an `OP_RETURN`, empty or not.
fn is_op_return(script: &Script) -> bool {
    script.as_bytes().first() == Some(&0x6a)
}

/// Check the structure of an asset lock and return the amount it locks.
pub fn check_asset_lock_tx(tx: &Transaction) -> Result<Amount, Error> {
    if tx.tx_type != tx_type::ASSET_LOCK {
        return Err(Error::WrongLockType(tx.tx_type));
    }

    let mut locked = None;
    for out in &tx.output {
        if out.value.to_sat() > MAX_MONEY {
            return Err(Error::LockAmountTooLarge(out.value));
        }
        if !is_op_return(&out.script_pubkey) {
            continue;
        }
        if out.script_pubkey.as_bytes() != [0x6a, 0x00] {
            return Err(Error::NonEmptyReturn);
        }
        if out.value == Amount::ZERO {
            return Err(Error::ZeroOutReturn);
        }
        if locked.is_some() {
            return Err(Error::MultipleReturn);
        }
        locked = Some(out.value);
    }
    let locked = locked.ok_or(Error::NoReturn)?;

    let payload: AssetLockPayload = tx.payload().map_err(|_| Error::BadLockPayload)?;
    if payload.version == 0 || payload.version > ASSET_LOCK_PAYLOAD_VERSION {
        return Err(Error::BadLockVersion(payload.version));
    }
    if payload.credit_outputs.is_empty() {
        return Err(Error::EmptyCreditOutputs);
    }

    let mut credited = Amount::ZERO;
    for out in &payload.credit_outputs {
        credited = credited.checked_add(out.value)
            .filter(|c| c.to_sat() <= MAX_MONEY)
            .ok_or(Error::LockAmountTooLarge(out.value))?;
        if !out.script_pubkey.is_p2pkh() {
            return Err(Error::NonP2pkhCreditOutput);
        }
    }
    if credited != locked {
        return Err(Error::CreditAmountMismatch { credited, locked });
    }
    Ok(locked)
}

/// Check the structure of an asset unlock and return its payload.
pub fn check_asset_unlock_tx(tx: &Transaction) -> Result<AssetUnlockPayload, Error> {
    if tx.tx_type != tx_type::ASSET_UNLOCK {
        return Err(Error::WrongUnlockType(tx.tx_type));
    }
    if !tx.input.is_empty() {
        return Err(Error::UnlockHasInput);
    }
    if tx.output.len() > MAXIMUM_WITHDRAWALS {
        return Err(Error::TooManyOutputs(tx.output.len()));
    }

    let payload: AssetUnlockPayload = tx.payload().map_err(|_| Error::BadUnlockPayload)?;
    if payload.version == 0 || payload.version > ASSET_UNLOCK_PAYLOAD_VERSION {
        return Err(Error::BadUnlockVersion(payload.version));
    }
    Ok(payload)
}

/// The amount leaving the pool: fee plus all outputs.
pub fn withdrawal_amount(tx: &Transaction, payload: &AssetUnlockPayload) -> Result<Amount, Error> {
    tx.value_out()
        .and_then(|v| v.checked_add(payload.fee_amount()))
        .filter(|v| v.to_sat() <= MAX_MONEY)
        .ok_or(Error::FeeOutOfRange(payload.fee))
}

/// Check everything about a structurally valid unlock that does not depend
/// on the pool state, at validation height `height`. Returns the amount
/// leaving the pool.
///
/// Checks run in a fixed order and the first failure is reported: fee,
/// quorum and signature, quorum activity, height window.
pub fn check_asset_unlock_signed(
    tx: &Transaction,
    payload: &AssetUnlockPayload,
    height: BlockHeight,
    quorums: &QuorumRegistry,
    params: &ConsensusParams,
) -> Result<Amount, Error> {
    if payload.fee == 0 {
        return Err(Error::FeeOutOfRange(payload.fee));
    }
    if payload.fee_amount() > params.unlock_fee_ceiling {
        return Err(Error::FeeAbsurdlyHigh {
            fee: payload.fee_amount(),
            ceiling: params.unlock_fee_ceiling,
        });
    }
    let amount = withdrawal_amount(tx, payload)?;

    let llmq_type = params.llmq_type_asset_locks;
    let quorum = quorums.get(llmq_type, &payload.quorum_hash)
        .ok_or(Error::UnknownQuorum(payload.quorum_hash))?;
    let msg_hash = message_hash(tx, payload);
    if !quorum.verify(&payload.request_id(), &msg_hash, &payload.quorum_sig) {
        return Err(Error::SignatureNotVerified(payload.quorum_hash));
    }

    if !quorums.is_active(llmq_type, &payload.quorum_hash, height, params.active_quorum_count) {
        return Err(Error::QuorumNotActive(payload.quorum_hash));
    }

    let requested = payload.requested_height as BlockHeight;
    if height < requested || height - requested >= params.unlock_expiry_blocks {
        return Err(Error::RequestTooLate { requested, height });
    }
    Ok(amount)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use bitcoin::{BlockHash, OutPoint, PubkeyHash, ScriptBuf, Sequence, TxIn, Witness};
    use bitcoin::hashes::Hash;

    use common::constants::COIN;
    use common::LlmqType;

    use crate::bls::BlsSecretKey;
    use crate::quorum::Quorum;

    /// A single-member stand-in for a quorum whose secret key we hold.
    pub struct TestQuorum {
        pub quorum: Quorum,
        pub secret: BlsSecretKey,
    }

    impl TestQuorum {
        pub fn new(seed: u8, height: BlockHeight) -> TestQuorum {
            let secret = BlsSecretKey::from_seed(&[seed; 32]).unwrap();
            TestQuorum {
                quorum: Quorum {
                    llmq_type: ConsensusParams::default().llmq_type_asset_locks,
                    quorum_hash: BlockHash::from_byte_array([seed; 32]),
                    height: height,
                    public_key: secret.public_key(),
                },
                secret: secret,
            }
        }

        pub fn hash(&self) -> QuorumHash {
            self.quorum.quorum_hash
        }

        /// Sign the unlock in place.
        pub fn sign(&self, tx: &mut Transaction) {
            let mut payload: AssetUnlockPayload = tx.payload().unwrap();
            payload.quorum_hash = self.quorum.quorum_hash;
            let msg_hash = message_hash(tx, &payload);
            let sign_hash = self.quorum.sign_hash(&payload.request_id(), &msg_hash);
            payload.quorum_sig = self.secret.sign(&sign_hash.to_byte_array());
            tx.set_payload(&payload);
        }
    }

    pub fn p2pkh(seed: u8) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array([seed; 20]))
    }

    pub fn lock_tx(amounts: &[u64]) -> Transaction {
        let total = amounts.iter().sum::<u64>();
        let mut tx = Transaction::new_special(tx_type::ASSET_LOCK);
        tx.input.push(TxIn {
            previous_output: OutPoint::new(Txid::from_byte_array([total as u8; 32]), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
        tx.output.push(TxOut {
            value: Amount::from_sat(total),
            script_pubkey: ScriptBuf::from_bytes(vec![0x6a, 0x00]),
        });
        tx.set_payload(&AssetLockPayload {
            version: 1,
            credit_outputs: amounts.iter().map(|a| TxOut {
                value: Amount::from_sat(*a),
                script_pubkey: p2pkh(1),
            }).collect(),
        });
        tx
    }

    /// An unlock signed by `quorum`, paying `amount` minus the fee.
    pub fn unlock_tx(quorum: &TestQuorum, index: u64, amount: u64, requested_height: u32) -> Transaction {
        let fee = 1000;
        let mut tx = Transaction::new_special(tx_type::ASSET_UNLOCK);
        tx.output.push(TxOut {
            value: Amount::from_sat(amount - fee as u64),
            script_pubkey: p2pkh(2),
        });
        tx.set_payload(&AssetUnlockPayload {
            version: 1,
            index: index,
            fee: fee,
            requested_height: requested_height,
            quorum_hash: quorum.hash(),
            quorum_sig: BlsSignature::null(),
        });
        quorum.sign(&mut tx);
        tx
    }

    fn set_unlock_payload<F: FnOnce(&mut AssetUnlockPayload)>(tx: &mut Transaction, f: F) {
        let mut payload: AssetUnlockPayload = tx.payload().unwrap();
        f(&mut payload);
        tx.set_payload(&payload);
    }

    #[test]
    fn request_id_vectors() {
        assert_eq!(
            request_id(101).to_string(),
            "fcc76a643c5c668244fdcef09833955d6f4b803fa6c459f7732983c2332389fd",
        );
        assert_eq!(
            mnhf_request_id(10).to_string(),
            "7c0e7c3081f6ea8b6937fc2c159d7a0098a93ac517a1b75d4e8b3f25e34b75e3",
        );
    }

    #[test]
    fn unlock_payload_encoding() {
        let payload = AssetUnlockPayload {
            version: 1,
            index: 0x0102,
            fee: 0x0a0b,
            requested_height: 7,
            quorum_hash: BlockHash::from_byte_array([0xee; 32]),
            quorum_sig: BlsSignature::null(),
        };
        let raw = serialize(&payload);
        assert_eq!(raw.len(), 1 + 8 + 4 + 4 + 32 + 96);
        assert_eq!(&raw[0..17], &hex!("0102010000000000000b0a000007000000"));
        assert_eq!(raw[17], 0xee);
    }

    #[test]
    fn message_hash_ignores_signature() {
        let q = TestQuorum::new(1, 0);
        let tx = unlock_tx(&q, 5, COIN, 10);
        let payload: AssetUnlockPayload = tx.payload().unwrap();
        assert!(!payload.quorum_sig.is_null());

        let mut unsigned = tx.clone();
        set_unlock_payload(&mut unsigned, |p| p.quorum_sig = BlsSignature::null());
        assert_eq!(message_hash(&tx, &payload), unsigned.txid());
        assert_ne!(tx.txid(), unsigned.txid());
    }

    #[test]
    fn lock_checks() {
        let tx = lock_tx(&[30, 70]);
        assert_eq!(check_asset_lock_tx(&tx), Ok(Amount::from_sat(100)));

        let reason = |tx: &Transaction| check_asset_lock_tx(tx).unwrap_err().reject_reason();

        let mut bad = tx.clone();
        bad.tx_type = tx_type::ASSET_UNLOCK;
        assert_eq!(reason(&bad), "bad-assetlocktx-type");

        let mut bad = tx.clone();
        bad.output[0].script_pubkey = ScriptBuf::from_bytes(vec![0x6a, 0x01, 0x00]);
        assert_eq!(reason(&bad), "bad-assetlocktx-non-empty-return");

        let mut bad = tx.clone();
        bad.output[0].value = Amount::ZERO;
        assert_eq!(reason(&bad), "bad-assetlocktx-zeroout-return");

        let mut bad = tx.clone();
        bad.output.push(bad.output[0].clone());
        assert_eq!(reason(&bad), "bad-assetlocktx-multiple-return");

        let mut bad = tx.clone();
        bad.output[0].script_pubkey = p2pkh(3);
        assert_eq!(reason(&bad), "bad-assetlocktx-no-return");

        let mut bad = tx.clone();
        bad.extra_payload.push(0);
        assert_eq!(reason(&bad), "bad-assetlocktx-payload");

        let mut bad = tx.clone();
        bad.extra_payload[0] = 2;
        assert_eq!(reason(&bad), "bad-assetlocktx-version");

        let mut bad = tx.clone();
        bad.set_payload(&AssetLockPayload { version: 1, credit_outputs: vec![] });
        assert_eq!(reason(&bad), "bad-assetlocktx-emptycreditoutputs");

        let mut bad = tx.clone();
        let mut payload: AssetLockPayload = bad.payload().unwrap();
        payload.credit_outputs[1].script_pubkey = ScriptBuf::new();
        bad.set_payload(&payload);
        assert_eq!(reason(&bad), "bad-assetlocktx-pubKeyHash");

        let mut bad = tx.clone();
        bad.output[0].value = Amount::from_sat(101);
        assert_eq!(reason(&bad), "bad-assetlocktx-creditamount");
    }

    #[test]
    fn lock_amount_range() {
        assert_eq!(check_asset_lock_tx(&lock_tx(&[MAX_MONEY])), Ok(Amount::from_sat(MAX_MONEY)));

        let huge = lock_tx(&[u64::MAX]);
        assert_eq!(check_asset_lock_tx(&huge), Err(Error::LockAmountTooLarge(Amount::MAX)));
        assert_eq!(
            check_asset_lock_tx(&huge).unwrap_err().reject_reason(),
            "bad-txns-txouttotal-toolarge",
        );

        // the burned output is in range but the credits add up past it
        let mut tx = lock_tx(&[MAX_MONEY, 1]);
        assert!(check_asset_lock_tx(&tx).is_err());
        tx.output[0].value = Amount::from_sat(MAX_MONEY);
        assert_eq!(check_asset_lock_tx(&tx), Err(Error::LockAmountTooLarge(Amount::from_sat(1))));
    }

    #[test]
    fn unlock_structure() {
        let q = TestQuorum::new(1, 0);
        let tx = unlock_tx(&q, 1, COIN, 10);
        assert!(check_asset_unlock_tx(&tx).is_ok());

        let reason = |tx: &Transaction| check_asset_unlock_tx(tx).unwrap_err().reject_reason();

        let mut bad = tx.clone();
        bad.tx_type = tx_type::ASSET_LOCK;
        assert_eq!(reason(&bad), "bad-assetunlocktx-type");

        let mut bad = tx.clone();
        bad.input = lock_tx(&[1]).input;
        assert_eq!(reason(&bad), "bad-assetunlocktx-have-input");

        let mut bad = tx.clone();
        bad.output = vec![tx.output[0].clone(); MAXIMUM_WITHDRAWALS + 1];
        assert_eq!(reason(&bad), "bad-assetunlocktx-too-many-outs");
        bad.output.pop();
        assert!(check_asset_unlock_tx(&bad).is_ok());

        let mut bad = tx.clone();
        bad.extra_payload.pop();
        assert_eq!(reason(&bad), "bad-assetunlocktx-payload");

        let mut bad = tx.clone();
        set_unlock_payload(&mut bad, |p| p.version = 0);
        assert_eq!(reason(&bad), "bad-assetunlocktx-version");
    }

    #[test]
    fn unlock_context_order() {
        let params = ConsensusParams::default();
        let q = TestQuorum::new(1, 100);
        let mut quorums = QuorumRegistry::new();
        quorums.insert(q.quorum.clone());

        let tx = unlock_tx(&q, 1, COIN, 200);
        let payload = check_asset_unlock_tx(&tx).unwrap();
        let check = |tx: &Transaction, payload: &AssetUnlockPayload, height, quorums: &QuorumRegistry| {
            check_asset_unlock_signed(tx, payload, height, quorums, &params).map_err(|e| e.reject_reason())
        };

        assert_eq!(check(&tx, &payload, 200, &quorums), Ok(Amount::from_sat(COIN)));
        assert_eq!(check(&tx, &payload, 247, &quorums), Ok(Amount::from_sat(COIN)));
        assert_eq!(check(&tx, &payload, 248, &quorums), Err("bad-assetunlock-too-late"));
        assert_eq!(check(&tx, &payload, 199, &quorums), Err("bad-assetunlock-too-late"));

        // two newer quorums push ours out of the active set
        quorums.insert(TestQuorum::new(2, 210).quorum);
        quorums.insert(TestQuorum::new(3, 220).quorum);
        assert_eq!(check(&tx, &payload, 215, &quorums), Ok(Amount::from_sat(COIN)));
        assert_eq!(check(&tx, &payload, 220, &quorums), Err("bad-assetunlock-not-active-quorum"));
        // inactive beats too late
        assert_eq!(check(&tx, &payload, 300, &quorums), Err("bad-assetunlock-not-active-quorum"));

        // a signature by another quorum
        let other = TestQuorum::new(2, 210);
        let mut forged = tx.clone();
        set_unlock_payload(&mut forged, |p| p.quorum_sig = {
            let mut signed = tx.clone();
            other.sign(&mut signed);
            signed.payload::<AssetUnlockPayload>().unwrap().quorum_sig
        });
        let forged_payload = forged.payload().unwrap();
        assert_eq!(check(&forged, &forged_payload, 300, &quorums), Err("bad-assetunlock-not-verified"));

        // tampering with the outputs breaks the signature
        let mut tampered = tx.clone();
        tampered.output[0].value = Amount::from_sat(1);
        assert_eq!(check(&tampered, &payload, 200, &quorums), Err("bad-assetunlock-not-verified"));

        let mut unknown = payload.clone();
        unknown.quorum_hash = BlockHash::from_byte_array([9; 32]);
        assert_eq!(check(&tx, &unknown, 200, &quorums), Err("bad-assetunlock-quorum-hash"));

        // fee comes first
        let mut free = unknown.clone();
        free.fee = 0;
        assert_eq!(check(&tx, &free, 300, &quorums), Err("bad-txns-assetunlock-fee-outofrange"));
        let mut pricey = unknown.clone();
        pricey.fee = (params.unlock_fee_ceiling.to_sat() + 1) as u32;
        assert_eq!(check(&tx, &pricey, 300, &quorums), Err("absurdly-high-fee"));

        let mut huge = tx.clone();
        huge.output[0].value = Amount::from_sat(MAX_MONEY);
        assert_eq!(check(&huge, &payload, 200, &quorums), Err("bad-txns-assetunlock-fee-outofrange"));

        assert_eq!(params.llmq_type_asset_locks, LlmqType::LLMQ_TEST_PLATFORM);
    }
}
