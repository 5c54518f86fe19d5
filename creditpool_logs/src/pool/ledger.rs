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

//! # Ledger logs
//!

use bitcoin::{BlockHash, Txid};

/// Periodic overview of the pool at the tip.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct PoolStatus {
    /// Height of the tip.
    pub height: u64,
    /// Hash of the tip.
    pub hash: BlockHash,
    /// Pool balance at the tip, in duffs.
    pub balance: u64,
    /// Current withdrawal epoch.
    pub epoch: u64,
    /// Withdrawal limit of the current epoch.
    pub epoch_limit: u64,
    /// Amount withdrawn in the current epoch so far.
    pub epoch_withdrawn: u64,
    /// Number of withdrawal indices used on this chain.
    pub spent_indexes: u64,
    /// Number of snapshots kept in memory.
    pub snapshots: usize,
}

/// A block was applied to the pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ConnectBlock {
    /// The block height.
    pub height: u64,
    /// The block hash.
    pub hash: BlockHash,
    /// Amount that entered the pool in this block.
    pub locked: u64,
    /// Amount that left the pool in this block.
    pub unlocked: u64,
    /// Pool balance after this block.
    pub balance: u64,
}

/// A block was removed from the tip of the pool's chain.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DisconnectBlock {
    /// The block height.
    pub height: u64,
    /// The block hash.
    pub hash: BlockHash,
    /// The balance before the block was removed.
    pub balance_before: u64,
    /// The balance of the new tip.
    pub balance_after: u64,
}

/// A block could not be applied to the pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RejectBlock<'a> {
    /// The block height.
    pub height: u64,
    /// The block hash.
    pub hash: BlockHash,
    /// The offending transaction, if the error is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<Txid>,
    /// The reject reason.
    pub reason: &'a str,
}

/// An asset lock credited the pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CreditAssetLock {
    /// The lock transaction.
    pub txid: Txid,
    /// Amount credited.
    pub amount: u64,
}

/// An asset unlock debited the pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DebitAssetUnlock {
    /// The unlock transaction.
    pub txid: Txid,
    /// Withdrawal index.
    pub index: u64,
    /// Amount debited, fee included.
    pub amount: u64,
    /// The fee part of the amount.
    pub fee: u64,
}

/// The platform reward was added to the pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct PlatformReward {
    /// The block height.
    pub height: u64,
    /// Amount credited.
    pub amount: u64,
}

/// A new withdrawal epoch started.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NewEpoch {
    /// Epoch number.
    pub epoch: u64,
    /// Height of the first block of the epoch.
    pub height: u64,
    /// Balance entering the epoch.
    pub balance: u64,
    /// Withdrawal limit for the epoch.
    pub limit: u64,
}

/// A withdrawal was refused because the epoch limit would be crossed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct WithdrawalLimitReached {
    /// Epoch number.
    pub epoch: u64,
    /// Withdrawal limit for the epoch.
    pub limit: u64,
    /// Amount withdrawn in the epoch so far.
    pub withdrawn: u64,
    /// Amount the refused withdrawal asked for.
    pub requested: u64,
}

/// The coinbase committed to another balance than the one we computed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CoinbaseBalanceMismatch {
    /// The block height.
    pub height: u64,
    /// The block hash.
    pub hash: BlockHash,
    /// Balance we computed.
    pub computed: u64,
    /// Balance in the coinbase payload.
    pub committed: i64,
}

/// Old snapshots were dropped.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct PruneSnapshots {
    /// Snapshots below this height are gone.
    pub below_height: u64,
    /// Number of snapshots dropped.
    pub removed: usize,
}

/// We were asked to undo a block that is not our tip. The caller
/// lost track of the chain; continuing would corrupt the pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct UndoNonTipBlock {
    /// The block we were asked to undo.
    pub hash: BlockHash,
    /// Our tip.
    pub tip: BlockHash,
}

/// The chain reorganized below the oldest snapshot we keep.
/// Shut down and require a resync from an older starting point.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DeepReorg {
    /// Height of the block that had to be undone.
    pub height: u64,
    /// Hash of the block that had to be undone.
    pub hash: BlockHash,
    /// Number of snapshots retained below the tip.
    pub retained_depth: u64,
}
