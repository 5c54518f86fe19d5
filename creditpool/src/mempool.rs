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

//! # Mempool
//!
//! Pending pool transactions. Admission only runs the checks that do not
//! depend on the pool state: a withdrawal larger than the pool is admitted
//! here and simply never mined.
//!

use std::collections::{BTreeMap, HashMap, HashSet};

use bitcoin::Txid;

use common::constants::tx_type;
use common::{BlockHeight, ConsensusParams};

use crate::assetlock::{self, check_asset_lock_tx, check_asset_unlock_signed, check_asset_unlock_tx};
use crate::quorum::QuorumRegistry;
use crate::transaction::{Block, Transaction};

/// Reject reason of a transaction that is already pending.
pub const ALREADY_IN_MEMPOOL: &str = "txn-already-in-mempool";

/// The stateless admission checks.
#[derive(Clone, Debug)]
pub struct MempoolPolicy {
    params: ConsensusParams,
}

impl MempoolPolicy {
    /// Create a new policy.
    pub fn new(params: ConsensusParams) -> MempoolPolicy {
        MempoolPolicy {
            params: params,
        }
    }

    /// Check a transaction for inclusion in the block after `tip_height`.
    pub fn check(
        &self,
        tx: &Transaction,
        tip_height: BlockHeight,
        quorums: &QuorumRegistry,
    ) -> Result<(), assetlock::Error> {
        match tx.tx_type {
            tx_type::ASSET_LOCK => check_asset_lock_tx(tx).map(|_| ()),
            tx_type::ASSET_UNLOCK => {
                let payload = check_asset_unlock_tx(tx)?;
                check_asset_unlock_signed(tx, &payload, tip_height, quorums, &self.params).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

/// Outcome of a mempool admission query.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MempoolAcceptResult {
    /// The transaction.
    pub txid: Txid,
    /// Whether it is (or would be) admitted.
    pub allowed: bool,
    /// Why not.
    #[serde(rename = "reject-reason", default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl MempoolAcceptResult {
    fn allowed(txid: Txid) -> MempoolAcceptResult {
        MempoolAcceptResult {
            txid: txid,
            allowed: true,
            reject_reason: None,
        }
    }

    fn rejected(txid: Txid, reason: &str) -> MempoolAcceptResult {
        MempoolAcceptResult {
            txid: txid,
            allowed: false,
            reject_reason: Some(reason.to_owned()),
        }
    }
}

/// Pending transactions, in arrival order.
#[derive(Clone, Debug)]
pub struct Mempool {
    policy: MempoolPolicy,
    next_seq: u64,
    order: BTreeMap<u64, Txid>,
    txs: HashMap<Txid, (u64, Transaction)>,
}

impl Mempool {
    /// Create an empty mempool.
    pub fn new(policy: MempoolPolicy) -> Mempool {
        Mempool {
            policy: policy,
            next_seq: 0,
            order: BTreeMap::new(),
            txs: HashMap::new(),
        }
    }

    /// The admission policy.
    pub fn policy(&self) -> &MempoolPolicy {
        &self.policy
    }

    /// Whether `accept` would admit the transaction. Never changes the pool.
    pub fn test_accept(
        &self,
        tx: &Transaction,
        tip_height: BlockHeight,
        quorums: &QuorumRegistry,
    ) -> MempoolAcceptResult {
        let txid = tx.txid();
        if self.txs.contains_key(&txid) {
            return MempoolAcceptResult::rejected(txid, ALREADY_IN_MEMPOOL);
        }
        match self.policy.check(tx, tip_height, quorums) {
            Ok(()) => MempoolAcceptResult::allowed(txid),
            Err(e) => MempoolAcceptResult::rejected(txid, e.reject_reason()),
        }
    }

    /// Admit the transaction if it passes the checks.
    pub fn accept(
        &mut self,
        tx: Transaction,
        tip_height: BlockHeight,
        quorums: &QuorumRegistry,
    ) -> MempoolAcceptResult {
        let res = self.test_accept(&tx, tip_height, quorums);
        if !res.allowed {
            slog!(MempoolReject, txid: res.txid,
                reason: res.reject_reason.as_ref().map(|s| s.as_str()).unwrap_or(""),
            );
            return res;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, res.txid);
        let tx_type = tx.tx_type;
        self.txs.insert(res.txid, (seq, tx));
        slog!(MempoolAccept, txid: res.txid, tx_type: tx_type, size: self.txs.len());
        res
    }

    fn remove(&mut self, txid: &Txid) -> Option<Transaction> {
        let (seq, tx) = self.txs.remove(txid)?;
        self.order.remove(&seq);
        Some(tx)
    }

    /// Drop the transactions of a connected block, and pending withdrawals
    /// reusing an index the block spent. Returns the number dropped.
    pub fn remove_for_block(&mut self, block: &Block) -> usize {
        let mut spent = HashSet::new();
        let mut removed = 0;
        for tx in &block.txdata {
            if self.remove(&tx.txid()).is_some() {
                removed += 1;
            }
            if let Ok(payload) = check_asset_unlock_tx(tx) {
                spent.insert(payload.index);
            }
        }

        let conflicts = self.unlocks()
            .filter(|(_, index)| spent.contains(index))
            .map(|(txid, _)| txid)
            .collect::<Vec<_>>();
        for txid in conflicts {
            slog!(MempoolExpire, txid: txid, reason: "bad-assetunlock-duplicated-index");
            self.remove(&txid);
            removed += 1;
        }
        removed
    }

    /// Drop the transactions that fail the checks at the new tip, e.g.
    /// withdrawals whose request expired. Returns the number dropped.
    pub fn remove_expired(&mut self, tip_height: BlockHeight, quorums: &QuorumRegistry) -> usize {
        let mut expired = vec![];
        for (txid, (_, tx)) in &self.txs {
            if let Err(e) = self.policy.check(tx, tip_height, quorums) {
                slog!(MempoolExpire, txid: *txid, reason: e.reject_reason());
                expired.push(*txid);
            }
        }
        for txid in &expired {
            self.remove(txid);
        }
        expired.len()
    }

    /// Pending withdrawals and their indices.
    fn unlocks<'a>(&'a self) -> impl Iterator<Item = (Txid, u64)> + 'a {
        self.iter().filter_map(|tx| check_asset_unlock_tx(tx).ok().map(|p| (tx.txid(), p.index)))
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Whether the transaction is pending.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.txs.contains_key(txid)
    }

    /// Pending transactions in arrival order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.order.values().filter_map(move |txid| self.txs.get(txid).map(|e| &e.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use common::constants::COIN;

    use crate::assetlock::tests::{lock_tx, unlock_tx, TestQuorum};
    use crate::ledger::tests::{base_ref, block};

    fn setup() -> (Mempool, QuorumRegistry, TestQuorum) {
        let quorum = TestQuorum::new(1, 100);
        let mut quorums = QuorumRegistry::new();
        quorums.insert(quorum.quorum.clone());
        (Mempool::new(MempoolPolicy::new(ConsensusParams::default())), quorums, quorum)
    }

    #[test]
    fn admission() {
        let (mut pool, quorums, quorum) = setup();
        let lock = lock_tx(&[COIN]);
        let res = pool.test_accept(&lock, 110, &quorums);
        assert!(res.allowed);
        assert!(pool.is_empty());

        assert!(pool.accept(lock.clone(), 110, &quorums).allowed);
        let res = pool.accept(lock.clone(), 110, &quorums);
        assert_eq!(res.reject_reason.as_ref().map(|s| s.as_str()), Some(ALREADY_IN_MEMPOOL));
        assert_eq!(pool.len(), 1);

        let mut bad = lock_tx(&[2 * COIN]);
        bad.output[0].value = bitcoin::Amount::from_sat(COIN);
        let res = pool.accept(bad, 110, &quorums);
        assert!(!res.allowed);
        assert_eq!(res.reject_reason.unwrap(), "bad-assetlocktx-creditamount");

        let res = pool.accept(lock_tx(&[u64::MAX]), 110, &quorums);
        assert_eq!(res.reject_reason.unwrap(), "bad-txns-txouttotal-toolarge");

        // way more than any pool holds, but that is not our business
        let unlock = unlock_tx(&quorum, 0, 1_000_000 * COIN, 110);
        assert!(pool.accept(unlock.clone(), 110, &quorums).allowed);
        assert!(pool.contains(&unlock.txid()));
        let order = pool.iter().map(|tx| tx.txid()).collect::<Vec<_>>();
        assert_eq!(order, vec![lock.txid(), unlock.txid()]);
    }

    #[test]
    fn accept_result_json() {
        let (pool, quorums, quorum) = setup();
        let res = pool.test_accept(&unlock_tx(&quorum, 0, COIN, 10), 110, &quorums);
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["allowed"], false);
        assert_eq!(json["reject-reason"], "bad-assetunlock-too-late");

        let res = pool.test_accept(&unlock_tx(&quorum, 0, COIN, 110), 110, &quorums);
        let json = serde_json::to_value(&res).unwrap();
        assert!(json.get("reject-reason").is_none());
    }

    #[test]
    fn block_removes_mined_and_conflicts() {
        let (mut pool, quorums, quorum) = setup();
        let mined = unlock_tx(&quorum, 5, COIN, 110);
        let conflict = unlock_tx(&quorum, 5, 2 * COIN, 110);
        let other = unlock_tx(&quorum, 6, COIN, 110);
        for tx in vec![mined.clone(), conflict.clone(), other.clone()] {
            assert!(pool.accept(tx, 110, &quorums).allowed);
        }

        let b = block(base_ref(110), 0, vec![mined.clone()], None);
        assert_eq!(pool.remove_for_block(&b), 2);
        assert!(!pool.contains(&mined.txid()));
        assert!(!pool.contains(&conflict.txid()));
        assert!(pool.contains(&other.txid()));
    }

    #[test]
    fn temporal_ordering() {
        // the quorum rotates out well after the request expires
        let (_, mut quorums, quorum) = setup();
        quorums.insert(TestQuorum::new(2, 170).quorum);
        quorums.insert(TestQuorum::new(3, 180).quorum);
        let pool = Mempool::new(MempoolPolicy::new(ConsensusParams::default()));
        let tx = unlock_tx(&quorum, 0, COIN, 110);

        let stage = |height| {
            let res = pool.test_accept(&tx, height, &quorums);
            match res.reject_reason.as_ref().map(|s| s.as_str()) {
                None => 0,
                Some("bad-assetunlock-too-late") => 1,
                Some("bad-assetunlock-not-active-quorum") => 2,
                Some(r) => panic!("unexpected reason {}", r),
            }
        };
        let stages = (110..=200).map(|h| (h, stage(h))).collect::<Vec<_>>();
        for pair in stages.windows(2) {
            assert!(pair[0].1 <= pair[1].1, "regressed at height {}", pair[1].0);
        }
        assert_eq!(stage(157), 0);
        assert_eq!(stage(158), 1);
        assert_eq!(stage(179), 1);
        assert_eq!(stage(180), 2);
    }

    #[test]
    fn expiry() {
        let (mut pool, quorums, quorum) = setup();
        let early = unlock_tx(&quorum, 0, COIN, 110);
        let late = unlock_tx(&quorum, 1, COIN, 130);
        pool.accept(early.clone(), 130, &quorums);
        pool.accept(late.clone(), 130, &quorums);
        pool.accept(lock_tx(&[COIN]), 130, &quorums);

        assert_eq!(pool.remove_expired(157, &quorums), 0);
        assert_eq!(pool.remove_expired(158, &quorums), 1);
        assert!(!pool.contains(&early.txid()));
        assert!(pool.contains(&late.txid()));
        assert_eq!(pool.len(), 2);
    }
}
