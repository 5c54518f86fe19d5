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


//! # Constants
//! Various constant values needed by other parts of the code

use crate::BlockHeight;

/// Number of duffs in one coin.
pub const COIN: u64 = 100_000_000;

/// Total value that can ever exist on the chain, in duffs.
pub const MAX_MONEY: u64 = 21_000_000 * COIN;

/// The first transaction version that carries a type and an extra payload.
pub const SPECIAL_TX_VERSION: u16 = 3;

/// Special transaction type tags.
pub mod tx_type {
    /// A regular transaction without extra payload.
    pub const NORMAL: u16 = 0;
    /// Coinbase carrying the chain state commitments and the pool balance.
    pub const COINBASE: u16 = 5;
    /// Final quorum commitment.
    pub const QUORUM_COMMITMENT: u16 = 6;
    /// Masternode hard-fork signal.
    pub const MNHF_SIGNAL: u16 = 7;
    /// Deposit into the credit pool.
    pub const ASSET_LOCK: u16 = 8;
    /// Withdrawal from the credit pool.
    pub const ASSET_UNLOCK: u16 = 9;
}

/// Highest asset lock payload version we understand.
pub const ASSET_LOCK_PAYLOAD_VERSION: u8 = 1;

/// Highest asset unlock payload version we understand.
pub const ASSET_UNLOCK_PAYLOAD_VERSION: u8 = 1;

/// The first coinbase payload version that commits to the credit pool balance.
pub const CBTX_VERSION_CREDIT_POOL: u16 = 3;

/// Maximum number of outputs in a single withdrawal.
pub const MAXIMUM_WITHDRAWALS: usize = 32;

/// Domain tag of the request id of a withdrawal.
pub const ASSET_UNLOCK_REQUEST_ID_PREFIX: &str = "plwdtx";

/// Domain tag of the request id of a hard-fork signal.
pub const MNHF_REQUEST_ID_PREFIX: &str = "mnhf";

/// Number of blocks mined in one day at the target spacing.
pub const BLOCKS_IN_ONE_DAY: BlockHeight = 576;

/// Default number of snapshots kept below the tip.
pub const DEFAULT_SNAPSHOT_DEPTH: BlockHeight = 2 * BLOCKS_IN_ONE_DAY;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn money_fits_in_signed_field() {
        assert!(MAX_MONEY < i64::max_value() as u64);
        assert_eq!(ASSET_UNLOCK_REQUEST_ID_PREFIX.len(), 6);
    }
}
