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

//! # Coinbase payload
//! The coinbase of every block commits to the masternode list, the quorums
//! and, from version 3 on, to the credit pool balance after the block.
//!

use std::convert::TryFrom;
use std::io;

use bitcoin::consensus::encode::{self, Decodable, Encodable, VarInt};
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::Amount;

use common::constants::CBTX_VERSION_CREDIT_POOL;

use crate::bls::BlsSignature;

/// Extra payload of a coinbase transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinbasePayload {
    /// Payload version.
    pub version: u16,
    /// Height of the block.
    pub height: u32,
    /// Merkle root of the masternode list.
    pub merkle_root_mn_list: sha256d::Hash,
    /// Merkle root of the active quorums. Version 2 and up.
    pub merkle_root_quorums: sha256d::Hash,
    /// Distance to the best chainlocked block. Version 3 and up.
    pub best_cl_height_diff: u64,
    /// Chainlock signature of that block. Version 3 and up.
    pub best_cl_signature: BlsSignature,
    /// Pool balance after the block. Version 3 and up.
    pub credit_pool_balance: Amount,
}

impl CoinbasePayload {
    /// A payload committing to the given pool balance.
    pub fn with_balance(height: u32, balance: Amount) -> CoinbasePayload {
        CoinbasePayload {
            version: CBTX_VERSION_CREDIT_POOL,
            height: height,
            merkle_root_mn_list: sha256d::Hash::all_zeros(),
            merkle_root_quorums: sha256d::Hash::all_zeros(),
            best_cl_height_diff: 0,
            best_cl_signature: BlsSignature::null(),
            credit_pool_balance: balance,
        }
    }

    /// The committed pool balance, if this version carries one.
    pub fn committed_balance(&self) -> Option<Amount> {
        if self.version >= CBTX_VERSION_CREDIT_POOL {
            Some(self.credit_pool_balance)
        } else {
            None
        }
    }
}

impl Encodable for CoinbasePayload {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.version.consensus_encode(w)?;
        len += self.height.consensus_encode(w)?;
        len += self.merkle_root_mn_list.consensus_encode(w)?;
        if self.version >= 2 {
            len += self.merkle_root_quorums.consensus_encode(w)?;
        }
        if self.version >= CBTX_VERSION_CREDIT_POOL {
            len += VarInt(self.best_cl_height_diff).consensus_encode(w)?;
            len += self.best_cl_signature.consensus_encode(w)?;
            let balance = i64::try_from(self.credit_pool_balance.to_sat())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "credit pool balance out of range"))?;
            len += balance.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for CoinbasePayload {
    fn consensus_decode_from_finite_reader<R: io::Read + ?Sized>(
        r: &mut R,
    ) -> Result<CoinbasePayload, encode::Error> {
        let version = u16::consensus_decode_from_finite_reader(r)?;
        let height = u32::consensus_decode_from_finite_reader(r)?;
        let merkle_root_mn_list = Decodable::consensus_decode_from_finite_reader(r)?;
        let mut ret = CoinbasePayload {
            version: version,
            height: height,
            merkle_root_mn_list: merkle_root_mn_list,
            merkle_root_quorums: sha256d::Hash::all_zeros(),
            best_cl_height_diff: 0,
            best_cl_signature: BlsSignature::null(),
            credit_pool_balance: Amount::ZERO,
        };
        if version >= 2 {
            ret.merkle_root_quorums = Decodable::consensus_decode_from_finite_reader(r)?;
        }
        if version >= CBTX_VERSION_CREDIT_POOL {
            ret.best_cl_height_diff = VarInt::consensus_decode_from_finite_reader(r)?.0;
            ret.best_cl_signature = Decodable::consensus_decode_from_finite_reader(r)?;
            let balance = i64::consensus_decode_from_finite_reader(r)?;
            if balance < 0 {
                return Err(encode::Error::ParseFailed("negative credit pool balance"));
            }
            ret.credit_pool_balance = Amount::from_sat(balance as u64);
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bitcoin::consensus::encode::{deserialize, serialize};

    #[test]
    fn versions() {
        let mut payload = CoinbasePayload::with_balance(10, Amount::from_sat(5));
        let raw = serialize(&payload);
        assert_eq!(raw.len(), 2 + 4 + 32 + 32 + 1 + 96 + 8);
        assert_eq!(&raw[raw.len() - 8..], &hex!("0500000000000000"));
        assert_eq!(deserialize::<CoinbasePayload>(&raw).unwrap(), payload);
        assert_eq!(payload.committed_balance(), Some(Amount::from_sat(5)));

        payload.version = 2;
        payload.best_cl_signature = BlsSignature::null();
        payload.credit_pool_balance = Amount::ZERO;
        let raw = serialize(&payload);
        assert_eq!(raw.len(), 2 + 4 + 32 + 32);
        assert_eq!(deserialize::<CoinbasePayload>(&raw).unwrap(), payload);
        assert_eq!(payload.committed_balance(), None);
    }

    #[test]
    fn negative_balance() {
        let payload = CoinbasePayload::with_balance(10, Amount::ZERO);
        let mut raw = serialize(&payload);
        let n = raw.len();
        raw[n - 8..].copy_from_slice(&(-1i64).to_le_bytes());
        assert!(deserialize::<CoinbasePayload>(&raw).is_err());

        // and none that would read back negative is written
        let mut buf = vec![];
        assert!(CoinbasePayload::with_balance(10, Amount::MAX).consensus_encode(&mut buf).is_err());
    }
}
