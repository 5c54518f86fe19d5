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

//! # Block templates
//!
//! Picks the pending transactions that fit in the next block as far as the
//! pool is concerned.
//!

use bitcoin::hashes::Hash;
use bitcoin::{Amount, BlockHash};

use common::constants::MAX_MONEY;
use common::BlockHeight;

use crate::cbtx::CoinbasePayload;
use crate::ledger::{self, CreditPoolLedger};
use crate::mempool::Mempool;
use crate::quorum::QuorumRegistry;
use crate::transaction::Transaction;

/// The pool side of a block template.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BlockTemplate {
    /// Height of the block.
    pub height: BlockHeight,
    /// Selected transactions, in mempool arrival order.
    pub transactions: Vec<Transaction>,
    /// Locked by the selected transactions.
    pub locked: Amount,
    /// Withdrawn by the selected transactions.
    pub unlocked: Amount,
    /// Pool balance after the selected transactions, before any platform reward.
    pub balance: Amount,
}

impl BlockTemplate {
    /// Coinbase payload for the block, given the platform reward the coinbase pays.
    pub fn coinbase_payload(&self, platform_reward: Amount) -> Result<CoinbasePayload, ledger::Error> {
        let balance = self.balance
            .checked_add(platform_reward)
            .filter(|b| b.to_sat() <= MAX_MONEY)
            .ok_or(ledger::Error::AmountOverflow)?;
        Ok(CoinbasePayload::with_balance(self.height as u32, balance))
    }
}

/// Select the mempool transactions for the block at `height` on top of
/// `parent`. Transactions that do not apply are skipped and stay pending.
pub fn select_block_transactions(
    ledger: &CreditPoolLedger,
    parent: &BlockHash,
    height: BlockHeight,
    mempool: &Mempool,
    quorums: &QuorumRegistry,
) -> Result<BlockTemplate, ledger::Error> {
    let mut diff = ledger.diff_on(parent, height, quorums).ok_or(ledger::Error::UnknownParent {
        block: BlockHash::all_zeros(),
        parent: *parent,
    })?;

    let mut transactions = vec![];
    for tx in mempool.iter() {
        match diff.process_transaction(tx) {
            Ok(()) => transactions.push(tx.clone()),
            Err(e) => {
                slog!(SkipTemplateTx, txid: tx.txid(), height: height, reason: e.reject_reason());
            }
        }
    }

    Ok(BlockTemplate {
        height: height,
        transactions: transactions,
        locked: diff.locked(),
        unlocked: diff.unlocked(),
        balance: diff.balance()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use common::constants::COIN;
    use common::ConsensusParams;

    use crate::assetlock::tests::{lock_tx, unlock_tx, TestQuorum};
    use crate::ledger::tests::{base_ref, block, coins};
    use crate::mempool::MempoolPolicy;

    fn setup(height: BlockHeight, balance: Amount) -> (CreditPoolLedger, Mempool, QuorumRegistry, TestQuorum) {
        let quorum = TestQuorum::new(1, height - 10);
        let mut quorums = QuorumRegistry::new();
        quorums.insert(quorum.quorum.clone());
        let params = ConsensusParams::default();
        let ledger = CreditPoolLedger::new(params, base_ref(height), balance);
        (ledger, Mempool::new(MempoolPolicy::new(params)), quorums, quorum)
    }

    #[test]
    fn unlock_above_balance() {
        let (mut ledger, mut pool, quorums, quorum) = setup(100, coins(10));
        let tip = ledger.tip_ref();
        let greedy = unlock_tx(&quorum, 0, 10 * COIN + 1, 100);
        assert!(pool.accept(greedy.clone(), tip.height, &quorums).allowed);
        assert!(pool.accept(lock_tx(&[COIN]), tip.height, &quorums).allowed);

        let template = select_block_transactions(&ledger, &tip.hash, 101, &pool, &quorums).unwrap();
        assert_eq!(template.transactions.len(), 1);
        assert_eq!(template.balance, coins(11));
        assert_eq!(template.coinbase_payload(Amount::ZERO).unwrap().credit_pool_balance, coins(11));
        assert!(pool.contains(&greedy.txid()));
        match template.coinbase_payload(Amount::from_sat(MAX_MONEY)) {
            Err(ledger::Error::AmountOverflow) => {}
            r => panic!("unexpected {:?}", r),
        }

        // a block forcing it in is invalid
        let b = block(tip, 0, vec![greedy], None);
        let err = ledger.apply_block(&b, &quorums).unwrap_err();
        assert_eq!(err.reject_reason(), "failed-creditpool-unlock-too-much");
    }

    #[test]
    fn template_connects() {
        let (mut ledger, mut pool, quorums, quorum) = setup(575, coins(20_000));
        let tip = ledger.tip_ref();
        for (index, amount) in [600, 131, 131, 131, 131, 131].iter().enumerate() {
            let tx = unlock_tx(&quorum, index as u64, amount * COIN, 575);
            assert!(pool.accept(tx, tip.height, &quorums).allowed);
        }
        pool.accept(lock_tx(&[3 * COIN]), tip.height, &quorums);

        let template = select_block_transactions(&ledger, &tip.hash, 576, &pool, &quorums).unwrap();
        // the last two withdrawals cross the limit, the lock after them still fits
        assert_eq!(template.transactions.len(), 5);
        assert_eq!(template.unlocked, coins(993));
        assert_eq!(template.locked, coins(3));

        let b = block(tip, 0, template.transactions.clone(), Some(template.balance));
        let snapshot = ledger.apply_block(&b, &quorums).unwrap();
        assert_eq!(snapshot.balance, coins(20_000 + 3 - 993));
        assert_eq!(snapshot.epoch.withdrawn, coins(993));

        pool.remove_for_block(&b);
        assert_eq!(pool.len(), 2);
        let template = select_block_transactions(&ledger, &b.hash, 577, &pool, &quorums).unwrap();
        assert!(template.transactions.is_empty());
    }

    #[test]
    fn unknown_parent() {
        let (ledger, pool, quorums, _) = setup(100, coins(1));
        let parent = BlockHash::from_byte_array([7; 32]);
        match select_block_transactions(&ledger, &parent, 101, &pool, &quorums) {
            Err(ledger::Error::UnknownParent { parent: p, .. }) => assert_eq!(p, parent),
            r => panic!("unexpected {:?}", r),
        }
    }
}
