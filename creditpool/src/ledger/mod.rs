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

//! # Credit pool ledger
//!
//! Tracks the pool balance block by block. Every connected block gets an
//! immutable snapshot keyed by its hash; disconnecting a block simply
//! drops its snapshot and makes the parent the tip again, so nothing is
//! ever patched back.
//!
//! The ledger does not own chain data. It is fed blocks in order by the
//! chain follower and keeps a reference to the block it considers the tip.
//!

pub mod diff;
pub mod limits;
pub mod skipset;

pub use self::diff::CreditPoolDiff;
pub use self::limits::{EpochState, WindowState};
pub use self::skipset::SkipSet;

use std::collections::{HashMap, HashSet};
use std::{error, fmt};

use bitcoin::hashes::Hash;
use bitcoin::{Amount, BlockHash, Txid};

use common::constants::tx_type;
use common::{BlockHeight, ChainTip, ConsensusParams};

use crate::assetlock;
use crate::cbtx::CoinbasePayload;
use crate::quorum::QuorumRegistry;
use crate::transaction::{Block, Transaction};
use crate::utils::{self, BlockRef};

/// Ledger errors. Any of them invalidates the whole block.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// The parent of the block has no snapshot.
    UnknownParent {
        /// The block.
        block: BlockHash,
        /// Its parent.
        parent: BlockHash,
    },
    /// The block already has a snapshot.
    AlreadyApplied(BlockHash),
    /// The block height does not follow its parent.
    UnexpectedHeight {
        /// Parent height plus one.
        expected: BlockHeight,
        /// Height of the block.
        found: BlockHeight,
    },
    /// A lock or unlock failed a check that does not depend on the pool.
    AssetLock(assetlock::Error),
    /// The withdrawal index was used before on this chain.
    DuplicateIndex(u64),
    /// The withdrawal index is too far ahead of the used ones.
    IndexTooFar(u64),
    /// The withdrawal would cross the epoch limit.
    WithdrawalLimitExceeded {
        /// Limit of the epoch.
        limit: Amount,
        /// Withdrawn so far.
        withdrawn: Amount,
        /// The refused amount.
        requested: Amount,
    },
    /// The pool does not hold enough for the withdrawal.
    InsufficientPoolBalance {
        /// What the pool holds.
        balance: Amount,
        /// The refused amount.
        requested: Amount,
    },
    /// Amounts in the block overflow.
    AmountOverflow,
    /// The coinbase payload does not decode.
    BadCoinbasePayload,
    /// The coinbase commits to a different balance than the computed one.
    CoinbaseBalanceMismatch {
        /// The balance after the block.
        computed: Amount,
        /// The balance in the coinbase.
        committed: Amount,
    },
}

impl Error {
    /// The reject reason reported for a block or transaction failing with
    /// this error.
    pub fn reject_reason(&self) -> &'static str {
        match *self {
            Error::UnknownParent { .. } => "bad-prevblk",
            Error::UnexpectedHeight { .. } => "bad-prevblk",
            Error::AlreadyApplied(..) => "duplicate",
            Error::AssetLock(ref e) => e.reject_reason(),
            Error::DuplicateIndex(..) => "bad-assetunlock-duplicated-index",
            Error::IndexTooFar(..) => "bad-assetunlock-too-far-index",
            Error::WithdrawalLimitExceeded { .. } => "failed-creditpool-unlock-too-much",
            Error::InsufficientPoolBalance { .. } => "failed-creditpool-unlock-too-much",
            Error::AmountOverflow => "bad-txns-txouttotal-toolarge",
            Error::BadCoinbasePayload => "bad-cbtx-payload",
            Error::CoinbaseBalanceMismatch { .. } => "bad-cbtx-assetlocked-amount",
        }
    }

    /// Whether the error only depends on the transaction, the quorums and the
    /// height, so the mempool would have caught it too. Other errors come
    /// from the pool state and may go away on another chain.
    pub fn is_stateless(&self) -> bool {
        match *self {
            Error::AssetLock(..) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnknownParent { ref block, ref parent } => {
                write!(f, "parent {} of block {} is unknown", parent, block)
            }
            Error::AlreadyApplied(ref hash) => write!(f, "block {} already applied", hash),
            Error::UnexpectedHeight { expected, found } => {
                write!(f, "block at height {} where {} was expected", found, expected)
            }
            Error::AssetLock(ref e) => fmt::Display::fmt(e, f),
            Error::DuplicateIndex(idx) => write!(f, "withdrawal index {} already used", idx),
            Error::IndexTooFar(idx) => write!(f, "withdrawal index {} too far ahead", idx),
            Error::WithdrawalLimitExceeded { limit, withdrawn, requested } => write!(f,
                "withdrawal of {} exceeds epoch limit {} ({} withdrawn)", requested, limit, withdrawn,
            ),
            Error::InsufficientPoolBalance { balance, requested } => {
                write!(f, "withdrawal of {} exceeds pool balance {}", requested, balance)
            }
            Error::AmountOverflow => f.write_str("amount overflow"),
            Error::BadCoinbasePayload => f.write_str("bad coinbase payload"),
            Error::CoinbaseBalanceMismatch { computed, committed } => write!(f,
                "coinbase commits to pool balance {} but it is {}", committed, computed,
            ),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::AssetLock(ref e) => Some(e),
            _ => None,
        }
    }
}

/// The state of the pool after a block.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// The block.
    pub block: BlockRef,
    /// Its parent.
    pub prev_hash: BlockHash,
    /// Balance after the block.
    pub balance: Amount,
    /// Locked in the block, platform reward included.
    pub locked: Amount,
    /// Withdrawn in the block, fees included.
    pub unlocked: Amount,
    /// Withdrawal indices used up to and including the block.
    pub spent_indexes: SkipSet,
    /// Withdrawal epoch of the block.
    pub epoch: EpochState,
}

impl PoolSnapshot {
    /// Snapshot of the block tracking starts at.
    ///
    /// Nothing is known about earlier withdrawals, so the epoch of that
    /// block starts out untouched.
    pub fn base(block: BlockRef, balance: Amount, params: &ConsensusParams) -> PoolSnapshot {
        PoolSnapshot {
            block: block,
            prev_hash: BlockHash::all_zeros(),
            balance: balance,
            locked: Amount::ZERO,
            unlocked: Amount::ZERO,
            spent_indexes: SkipSet::new(params.index_window),
            epoch: EpochState::start(balance, block.height, params),
        }
    }
}

/// The credit pool ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreditPoolLedger {
    /// Not stored; always taken from the configuration.
    #[serde(skip)]
    params: ConsensusParams,
    /// The active tip.
    tip: BlockRef,
    /// Snapshots of all retained blocks.
    #[serde(with = "utils::serialize::hashmap")]
    snapshots: HashMap<BlockHash, PoolSnapshot>,
}

impl CreditPoolLedger {
    /// Start tracking at `base`, whose pool holds `base_balance`.
    pub fn new(params: ConsensusParams, base: BlockRef, base_balance: Amount) -> CreditPoolLedger {
        let mut snapshots = HashMap::new();
        snapshots.insert(base.hash, PoolSnapshot::base(base, base_balance, &params));
        CreditPoolLedger {
            params: params,
            tip: base,
            snapshots: snapshots,
        }
    }

    /// Replace the consensus parameters, after loading the ledger from disk.
    pub fn set_params(&mut self, params: ConsensusParams) {
        self.params = params;
    }

    /// The consensus parameters.
    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Whether the tip has a snapshot. Only a damaged cache has none.
    pub fn is_consistent(&self) -> bool {
        self.snapshots.contains_key(&self.tip.hash)
    }

    /// The active tip.
    pub fn tip_ref(&self) -> BlockRef {
        self.tip
    }

    /// Snapshot of the active tip.
    pub fn tip(&self) -> Option<&PoolSnapshot> {
        self.snapshots.get(&self.tip.hash)
    }

    /// Snapshot of a block.
    pub fn snapshot(&self, hash: &BlockHash) -> Option<&PoolSnapshot> {
        self.snapshots.get(hash)
    }

    /// Pool balance after a block.
    pub fn balance_at(&self, hash: &BlockHash) -> Option<Amount> {
        self.snapshots.get(hash).map(|s| s.balance)
    }

    /// Whether the withdrawal index was used on the active chain.
    pub fn is_index_spent(&self, index: u64) -> bool {
        self.tip().map(|s| s.spent_indexes.contains(index)).unwrap_or(false)
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Height of the oldest retained snapshot.
    pub fn oldest_height(&self) -> BlockHeight {
        self.snapshots.values().map(|s| s.block.height).min().unwrap_or(self.tip.height)
    }

    /// Start a diff on top of a retained block, for assembling the block
    /// at `height`.
    pub fn diff_on<'a>(
        &'a self,
        parent: &BlockHash,
        height: BlockHeight,
        quorums: &'a QuorumRegistry,
    ) -> Option<CreditPoolDiff<'a>> {
        let parent = self.snapshots.get(parent)?;
        Some(CreditPoolDiff::new(parent, height, quorums, &self.params))
    }

    fn connect(
        &self,
        block: &Block,
        quorums: &QuorumRegistry,
    ) -> Result<PoolSnapshot, (Option<Txid>, Error)> {
        if self.snapshots.contains_key(&block.hash) {
            return Err((None, Error::AlreadyApplied(block.hash)));
        }
        let parent = self.snapshots.get(&block.prev_blockhash()).ok_or((None, Error::UnknownParent {
            block: block.hash,
            parent: block.prev_blockhash(),
        }))?;
        if block.height != parent.block.height + 1 {
            return Err((None, Error::UnexpectedHeight {
                expected: parent.block.height + 1,
                found: block.height,
            }));
        }

        let mut diff = CreditPoolDiff::new(parent, block.height, quorums, &self.params);
        for tx in &block.txdata {
            diff.process_transaction(tx).map_err(|e| (Some(tx.txid()), e))?;
        }
        if let Some(coinbase) = block.coinbase() {
            diff.add_platform_reward(coinbase).map_err(|e| (Some(coinbase.txid()), e))?;
            let balance = diff.balance().map_err(|e| (Some(coinbase.txid()), e))?;
            check_coinbase_balance(block, coinbase, balance).map_err(|e| (Some(coinbase.txid()), e))?;
        }
        diff.into_snapshot(block.block_ref()).map_err(|e| (None, e))
    }

    /// Apply a block on top of its parent and make it the tip.
    ///
    /// The ledger is unchanged on error.
    pub fn apply_block(&mut self, block: &Block, quorums: &QuorumRegistry) -> Result<&PoolSnapshot, Error> {
        let snapshot = match self.connect(block, quorums) {
            Ok(s) => s,
            Err((txid, e)) => {
                slog!(RejectBlock, height: block.height, hash: block.hash, txid: txid,
                    reason: e.reject_reason(),
                );
                return Err(e);
            }
        };

        slog!(ConnectBlock, height: block.height, hash: block.hash, locked: snapshot.locked.to_sat(),
            unlocked: snapshot.unlocked.to_sat(), balance: snapshot.balance.to_sat(),
        );
        self.tip = block.block_ref();
        logs::set_chain_tip(ChainTip::new(block.height, block.hash));
        Ok(self.snapshots.entry(block.hash).or_insert(snapshot))
    }

    /// Disconnect the tip. The parent becomes the tip again.
    ///
    /// Being asked to undo anything but the tip, or a block whose parent was
    /// pruned, means the caller lost track of the chain. Both are fatal.
    pub fn undo_block(&mut self, block: &Block) {
        if block.hash != self.tip.hash {
            slog_fatal!(UndoNonTipBlock, hash: block.hash, tip: self.tip.hash);
        }
        let prev_hash = match self.snapshots.get(&block.hash) {
            Some(snapshot) => snapshot.prev_hash,
            None => slog_fatal!(UndoNonTipBlock, hash: block.hash, tip: self.tip.hash),
        };
        let parent = match self.snapshots.get(&prev_hash) {
            Some(parent) => (parent.block, parent.balance),
            None => slog_fatal!(DeepReorg, height: block.height, hash: block.hash,
                retained_depth: self.tip.height - self.oldest_height(),
            ),
        };

        let removed = self.snapshots.remove(&block.hash);
        slog!(DisconnectBlock, height: block.height, hash: block.hash,
            balance_before: removed.map(|s| s.balance.to_sat()).unwrap_or(0),
            balance_after: parent.1.to_sat(),
        );
        self.tip = parent.0;
        logs::set_chain_tip(ChainTip::new(parent.0.height, parent.0.hash));
    }

    /// Drop snapshots more than `keep_depth` blocks below the tip, and any
    /// that are not ancestors of the tip. Returns the number dropped.
    pub fn prune(&mut self, keep_depth: BlockHeight) -> usize {
        let cutoff = self.tip.height.saturating_sub(keep_depth);
        let mut keep = HashSet::new();
        let mut cursor = self.snapshots.get(&self.tip.hash);
        while let Some(snapshot) = cursor {
            if snapshot.block.height < cutoff {
                break;
            }
            keep.insert(snapshot.block.hash);
            cursor = self.snapshots.get(&snapshot.prev_hash);
        }

        let before = self.snapshots.len();
        self.snapshots.retain(|hash, _| keep.contains(hash));
        let removed = before - self.snapshots.len();
        if removed > 0 {
            slog!(PruneSnapshots, below_height: cutoff, removed: removed);
        }
        removed
    }

    /// Log the state of the pool at the tip.
    pub fn log_status(&self) {
        if let Some(tip) = self.tip() {
            slog!(PoolStatus, height: tip.block.height, hash: tip.block.hash,
                balance: tip.balance.to_sat(), epoch: tip.epoch.epoch,
                epoch_limit: tip.epoch.limit.to_sat(), epoch_withdrawn: tip.epoch.withdrawn.to_sat(),
                spent_indexes: tip.spent_indexes.size(), snapshots: self.snapshots.len(),
            );
        }
    }
}

/// Compare the computed balance with the one the coinbase commits to.
fn check_coinbase_balance(block: &Block, coinbase: &Transaction, computed: Amount) -> Result<(), Error> {
    if coinbase.tx_type != tx_type::COINBASE {
        return Ok(());
    }
    let payload: CoinbasePayload = coinbase.payload().map_err(|_| Error::BadCoinbasePayload)?;
    match payload.committed_balance() {
        Some(committed) if committed != computed => {
            slog!(CoinbaseBalanceMismatch, height: block.height, hash: block.hash,
                computed: computed.to_sat(), committed: committed.to_sat() as i64,
            );
            Err(Error::CoinbaseBalanceMismatch { computed, committed })
        }
        _ => Ok(()),
    }
}
