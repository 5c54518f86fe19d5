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

//! # Chain follower
//!
//! Keeps the ledger on the node's best chain. Every sync walks back from
//! our tip to the last block the node still has on its chain, undoes what
//! lies above it and then connects the node's blocks up to its tip.
//!
//! The node is trusted to have validated the blocks. A block it accepted
//! that the ledger rejects, or a balance it reports that differs from
//! ours, means the two disagree on consensus and we stop.
//!

use std::path::Path;
use std::time::Duration;
use std::{cmp, fs, io, thread};

use bitcoin::Amount;

use common::constants::tx_type;
use common::{BlockHeight, ChainTip, ConsensusParams};

use crate::assetlock::check_asset_unlock_tx;
use crate::config::{Local, Start};
use crate::ledger::{CreditPoolLedger, PoolSnapshot};
use crate::quorum::QuorumRegistry;
use crate::rpc::DashRpc;
use crate::transaction::Block;
use crate::utils::{self, BlockRef};

/// Name of the ledger cache in the data directory.
pub const CACHE_FILENAME: &str = "creditpool.json";

/// Name of the node in logs.
const DAEMON: &str = "dashd";

/// Follows the node's chain and keeps a [CreditPoolLedger] on it.
pub struct PoolWatcher<R: DashRpc> {
    rpc: R,
    ledger: CreditPoolLedger,
    quorums: QuorumRegistry,
    snapshot_depth: BlockHeight,
    quorum_scan_count: usize,
    sync_interval: Duration,
    cache_file: String,
}

/// Read the ledger cache, if there is a usable one.
fn load_cache(filename: &str, params: ConsensusParams) -> Option<CreditPoolLedger> {
    let file = match fs::File::open(filename) {
        Ok(file) => file,
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
            slog!(NoLedgerCache, filename: filename);
            return None;
        }
        Err(e) => {
            slog!(ReadFailed, filename: filename, error: e.to_string());
            return None;
        }
    };

    match serde_json::from_reader::<_, CreditPoolLedger>(io::BufReader::new(file)) {
        Ok(mut ledger) => {
            ledger.set_params(params);
            if ledger.is_consistent() {
                Some(ledger)
            } else {
                slog!(CorruptLedgerCache, filename: filename,
                    error: format!("no snapshot for tip {}", ledger.tip_ref()),
                );
                None
            }
        }
        Err(e) => {
            slog!(CorruptLedgerCache, filename: filename, error: e.to_string());
            None
        }
    }
}

impl<R: DashRpc> PoolWatcher<R> {
    /// Create a watcher, restoring the ledger from `datadir` if a cache
    /// exists there and starting from `start` otherwise.
    pub fn new<P: AsRef<Path>>(
        rpc: R,
        params: ConsensusParams,
        local: &Local,
        start: &Start,
        datadir: P,
    ) -> PoolWatcher<R> {
        let cache_file = datadir.as_ref().join(CACHE_FILENAME).to_string_lossy().into_owned();
        let ledger = load_cache(&cache_file, params).unwrap_or_else(|| {
            CreditPoolLedger::new(params, start.block_ref(), start.balance)
        });
        let tip = ledger.tip_ref();
        logs::set_chain_tip(ChainTip::new(tip.height, tip.hash));
        log!(Debug, "ledger starts at {} with {} snapshots", tip, ledger.len());

        PoolWatcher {
            rpc: rpc,
            ledger: ledger,
            quorums: QuorumRegistry::new(),
            snapshot_depth: local.snapshot_depth,
            quorum_scan_count: local.quorum_scan_count,
            sync_interval: local.sync_interval,
            cache_file: cache_file,
        }
    }

    /// The ledger.
    pub fn ledger(&self) -> &CreditPoolLedger {
        &self.ledger
    }

    /// The known quorums.
    pub fn quorums(&self) -> &QuorumRegistry {
        &self.quorums
    }

    /// The node connection.
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Pool balance after a block, if the block is retained.
    pub fn balance_at(&self, hash: &bitcoin::BlockHash) -> Option<Amount> {
        self.ledger.balance_at(hash)
    }

    /// Walk back from the tip to the last block on the node's chain.
    ///
    /// Returns that block, or `None` if none of the retained blocks is on
    /// the node's chain, together with the blocks above it, tip first.
    fn find_fork(&self) -> Result<(Option<BlockRef>, Vec<BlockRef>), jsonrpc::Error> {
        let mut stale = vec![];
        let mut cursor = Some(self.ledger.tip_ref());
        while let Some(block) = cursor {
            match self.rpc.block_header_info(block.hash)? {
                Some(ref info) if info.confirmations >= 0 => return Ok((Some(block), stale)),
                _ => stale.push(block),
            }
            cursor = self.ledger.snapshot(&block.hash)
                .and_then(|s| self.ledger.snapshot(&s.prev_hash))
                .map(|parent: &PoolSnapshot| parent.block);
        }
        Ok((None, stale))
    }

    /// Undo the blocks the node dropped from its chain.
    fn rewind(&mut self) -> Result<(), jsonrpc::Error> {
        let (fork, stale) = self.find_fork()?;
        if stale.is_empty() {
            return Ok(());
        }

        let old_tip = self.ledger.tip_ref();
        let fork = fork.unwrap_or_default();
        slog!(ReorgDetected, fork_height: fork.height, fork_hash: fork.hash,
            old_tip_height: old_tip.height, undo_count: stale.len() as u64,
        );
        for block in stale {
            // a stale block without a retained parent makes this fatal
            let block = self.rpc.block(block.hash, block.height)?;
            self.ledger.undo_block(&block);
        }
        self.quorums.remove_formed_above(fork.height);
        Ok(())
    }

    /// Ask the node for the recent quorums of the type signing withdrawals.
    fn refresh_quorums(&mut self) -> Result<(), jsonrpc::Error> {
        let llmq_type = self.ledger.params().llmq_type_asset_locks;
        for hash in self.rpc.quorum_list(llmq_type, self.quorum_scan_count)? {
            if self.quorums.get(llmq_type, &hash).is_none() {
                let quorum = self.rpc.quorum_info(llmq_type, hash)?;
                self.quorums.insert(quorum);
            }
        }
        Ok(())
    }

    /// Fetch the quorums that signed the withdrawals of a block and are not
    /// known yet. While catching up these may have dropped out of the recent
    /// quorums the node lists.
    fn fetch_signing_quorums(&mut self, block: &Block) -> Result<(), jsonrpc::Error> {
        let llmq_type = self.ledger.params().llmq_type_asset_locks;
        for tx in block.txdata.iter().filter(|tx| tx.tx_type == tx_type::ASSET_UNLOCK) {
            // malformed unlocks are the ledger's business
            let payload = match check_asset_unlock_tx(tx) {
                Ok(payload) => payload,
                Err(_) => continue,
            };
            if self.quorums.get(llmq_type, &payload.quorum_hash).is_none() {
                let quorum = self.rpc.quorum_info(llmq_type, payload.quorum_hash)?;
                self.quorums.insert(quorum);
            }
        }
        Ok(())
    }

    /// Connect the block at `height` from the node's chain.
    ///
    /// Returns false if the node's block there does not build on our tip,
    /// which means the node reorganized while we were syncing.
    fn connect_next(&mut self, height: BlockHeight) -> Result<bool, jsonrpc::Error> {
        let hash = self.rpc.block_at(height)?;
        let block = self.rpc.block(hash, height)?;
        if block.prev_blockhash() != self.ledger.tip_ref().hash {
            return Ok(false);
        }

        self.fetch_signing_quorums(&block)?;
        let balance = match self.ledger.apply_block(&block, &self.quorums) {
            Ok(snapshot) => snapshot.balance,
            Err(e) => slog_fatal!(DivergentBlock, height: height, hash: hash, reason: e.reject_reason()),
        };
        if let Some(node_balance) = self.rpc.block_pool_balance(hash)? {
            if node_balance != balance {
                slog_fatal!(BalanceAuditMismatch, height: height, hash: hash,
                    node_balance: node_balance.to_sat(), ledger_balance: balance.to_sat(),
                );
            }
        }
        Ok(true)
    }

    /// Bring the ledger to the node's tip.
    pub fn sync(&mut self) -> Result<(), jsonrpc::Error> {
        let old_tip = self.ledger.tip_ref();
        if self.rpc.tip()? == old_tip.hash {
            return Ok(());
        }

        self.rewind()?;
        self.refresh_quorums()?;

        let node_height = self.rpc.block_count()?;
        while self.ledger.tip_ref().height < node_height {
            let height = self.ledger.tip_ref().height + 1;
            if !self.connect_next(height)? {
                break;
            }
        }

        self.ledger.prune(self.snapshot_depth);
        // keep what the node lists so the next refresh does not fetch it again
        let keep = cmp::max(self.ledger.params().active_quorum_count, self.quorum_scan_count);
        self.quorums.prune(self.ledger.oldest_height(), keep);

        if self.ledger.tip_ref() != old_tip {
            self.save_to_disk();
        }
        slog!(SyncStatus, node_height: node_height, ledger_height: self.ledger.tip_ref().height);
        self.ledger.log_status();
        Ok(())
    }

    /// Write the ledger cache.
    pub fn save_to_disk(&self) {
        let saved = utils::export_to_file(
            &self.cache_file,
            |fh| serde_json::to_writer(fh, &self.ledger),
        );
        if saved {
            slog!(SaveLedgerCache, filename: &self.cache_file, snapshots: self.ledger.len());
        }
    }

    /// Wait for the node to finish warming up.
    pub fn startup(&self) {
        loop {
            match self.rpc.is_warming_up(DAEMON) {
                Ok(false) => return,
                Ok(true) => {}
                Err(e) => {
                    slog!(Error, daemon: DAEMON, action: "warmup check".to_owned(), error: &e);
                }
            }
            thread::sleep(self.sync_interval);
        }
    }

    /// Sync forever.
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(e) = self.sync() {
                slog!(Error, daemon: DAEMON, action: "sync".to_owned(), error: &e);
            }
            thread::sleep(self.sync_interval);
        }
    }
}
