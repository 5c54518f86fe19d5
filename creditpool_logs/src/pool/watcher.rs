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

//! # Pool watcher logs
//!

use bitcoin::BlockHash;

/// The pool watcher started.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct StartingPoolWatcher<'a> {
    /// Version of the software.
    pub version: &'a str,
    /// Data directory.
    pub datadir: &'a str,
    /// Height tracking starts from.
    pub start_height: u64,
    /// Block tracking starts from.
    pub start_hash: BlockHash,
}

/// How far behind the node we are.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SyncStatus {
    /// Height of the node's tip.
    pub node_height: u64,
    /// Height of our tip.
    pub ledger_height: u64,
}

/// The node switched to another branch.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ReorgDetected {
    /// Last block both branches share.
    pub fork_height: u64,
    /// Hash of that block.
    pub fork_hash: BlockHash,
    /// Our tip height before the switch.
    pub old_tip_height: u64,
    /// Number of blocks we have to undo.
    pub undo_count: u64,
}

/// The node accepted a block the pool rejects. The node and this
/// software disagree on consensus, which needs human attention.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct DivergentBlock<'a> {
    /// The block height.
    pub height: u64,
    /// The block hash.
    pub hash: BlockHash,
    /// Why we rejected it.
    pub reason: &'a str,
}

/// The node reports another pool balance than we computed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct BalanceAuditMismatch {
    /// The block height.
    pub height: u64,
    /// The block hash.
    pub hash: BlockHash,
    /// Balance reported by the node.
    pub node_balance: u64,
    /// Balance we computed.
    pub ledger_balance: u64,
}

/// The ledger cache was written.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SaveLedgerCache<'a> {
    /// Path of the cache.
    pub filename: &'a str,
    /// Number of snapshots written.
    pub snapshots: usize,
}

/// There is no ledger cache, we start from the configured block.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct NoLedgerCache<'a> {
    /// Path of the cache.
    pub filename: &'a str,
}

/// The ledger cache could not be parsed and is ignored.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CorruptLedgerCache<'a> {
    /// Path of the cache.
    pub filename: &'a str,
    /// Parse error.
    pub error: String,
}
