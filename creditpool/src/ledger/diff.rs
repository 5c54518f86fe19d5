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

//! # Pool diff
//!
//! The changes one block makes to the pool, built up transaction by
//! transaction on top of the parent snapshot. Used both to connect blocks
//! and to fill block templates.
//!

use bitcoin::{Amount, BlockHash};

use common::constants::{tx_type, MAX_MONEY};
use common::{BlockHeight, ConsensusParams};

use crate::assetlock::{self, check_asset_lock_tx, check_asset_unlock_signed, check_asset_unlock_tx};
use crate::quorum::QuorumRegistry;
use crate::transaction::Transaction;
use crate::utils::BlockRef;

use super::limits::{EpochState, WindowState};
use super::skipset::{AddError, SkipSet};
use super::{Error, PoolSnapshot};

/// Script of a platform reward output: a bare `OP_RETURN`.
const PLATFORM_REWARD_SCRIPT: [u8; 1] = [0x6a];

/// Pool changes of a block under construction.
#[derive(Clone, Debug)]
pub struct CreditPoolDiff<'a> {
    params: &'a ConsensusParams,
    quorums: &'a QuorumRegistry,
    prev_hash: BlockHash,
    height: BlockHeight,
    prev_balance: Amount,
    locked: Amount,
    unlocked: Amount,
    spent: SkipSet,
    epoch: EpochState,
}

impl<'a> CreditPoolDiff<'a> {
    /// Start a diff for the block at `height` on top of `parent`.
    pub fn new(
        parent: &PoolSnapshot,
        height: BlockHeight,
        quorums: &'a QuorumRegistry,
        params: &'a ConsensusParams,
    ) -> CreditPoolDiff<'a> {
        CreditPoolDiff {
            params: params,
            quorums: quorums,
            prev_hash: parent.block.hash,
            height: height,
            prev_balance: parent.balance,
            locked: Amount::ZERO,
            unlocked: Amount::ZERO,
            spent: parent.spent_indexes.clone(),
            epoch: EpochState::next(&parent.epoch, parent.balance, height, params),
        }
    }

    /// Height of the block.
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// Amount locked in the block so far.
    pub fn locked(&self) -> Amount {
        self.locked
    }

    /// Amount withdrawn in the block so far.
    pub fn unlocked(&self) -> Amount {
        self.unlocked
    }

    /// Pool balance after the transactions processed so far.
    pub fn balance(&self) -> Result<Amount, Error> {
        self.prev_balance
            .checked_add(self.locked)
            .and_then(|b| b.checked_sub(self.unlocked))
            .ok_or(Error::AmountOverflow)
    }

    /// The locked total after crediting `amount`, if the pool stays within the money supply.
    fn credit(&self, amount: Amount) -> Result<Amount, Error> {
        let locked = self.locked.checked_add(amount).ok_or(Error::AmountOverflow)?;
        match self.prev_balance.checked_add(locked) {
            Some(total) if total.to_sat() <= MAX_MONEY => Ok(locked),
            _ => Err(Error::AmountOverflow),
        }
    }

    /// Whether the epoch still accepts withdrawals.
    pub fn window_state(&self) -> WindowState {
        self.epoch.state()
    }

    /// Process one transaction. On error the diff is unchanged.
    pub fn process_transaction(&mut self, tx: &Transaction) -> Result<(), Error> {
        match tx.tx_type {
            tx_type::ASSET_LOCK => self.process_lock(tx),
            tx_type::ASSET_UNLOCK => self.process_unlock(tx),
            _ => Ok(()),
        }
    }

    fn process_lock(&mut self, tx: &Transaction) -> Result<(), Error> {
        let amount = check_asset_lock_tx(tx)?;
        self.locked = self.credit(amount)?;
        slog!(CreditAssetLock, txid: tx.txid(), amount: amount.to_sat());
        Ok(())
    }

    fn process_unlock(&mut self, tx: &Transaction) -> Result<(), Error> {
        let payload = check_asset_unlock_tx(tx)?;
        // unlocks are validated against the state of the parent block
        let validation_height = self.height.saturating_sub(1);
        let amount = check_asset_unlock_signed(
            tx, &payload, validation_height, self.quorums, self.params,
        )?;

        match self.spent.can_be_added(payload.index) {
            Ok(()) => {}
            Err(AddError::Spent) => return Err(Error::DuplicateIndex(payload.index)),
            Err(AddError::TooFar) => return Err(Error::IndexTooFar(payload.index)),
        }

        let mut epoch = self.epoch;
        if let Err(e) = epoch.try_withdraw(amount) {
            // keeps the refusal, nothing was withdrawn
            self.epoch = epoch;
            return Err(Error::WithdrawalLimitExceeded {
                limit: e.limit,
                withdrawn: e.withdrawn,
                requested: e.requested,
            });
        }

        let available = self.balance()?;
        if amount > available {
            return Err(Error::InsufficientPoolBalance {
                balance: available,
                requested: amount,
            });
        }

        self.spent.add(payload.index).map_err(|_| Error::DuplicateIndex(payload.index))?;
        self.epoch = epoch;
        self.unlocked = self.unlocked.checked_add(amount).ok_or(Error::AmountOverflow)?;
        slog!(DebitAssetUnlock, txid: tx.txid(), index: payload.index, amount: amount.to_sat(),
            fee: payload.fee as u64,
        );
        Ok(())
    }

    /// Credit the platform reward paid by the coinbase, if active at this height.
    pub fn add_platform_reward(&mut self, coinbase: &Transaction) -> Result<Amount, Error> {
        let active = match self.params.platform_reward_height {
            Some(h) => self.height >= h,
            None => false,
        };
        if !active {
            return Ok(Amount::ZERO);
        }

        let mut reward = Amount::ZERO;
        for out in &coinbase.output {
            if out.script_pubkey.as_bytes() == PLATFORM_REWARD_SCRIPT {
                reward = reward.checked_add(out.value).ok_or(Error::AmountOverflow)?;
            }
        }
        if reward > Amount::ZERO {
            self.locked = self.credit(reward)?;
            slog!(PlatformReward, height: self.height, amount: reward.to_sat());
        }
        Ok(reward)
    }

    /// Turn the diff into the snapshot of the block.
    pub fn into_snapshot(self, block: BlockRef) -> Result<PoolSnapshot, Error> {
        let balance = self.balance()?;
        Ok(PoolSnapshot {
            block: block,
            prev_hash: self.prev_hash,
            balance: balance,
            locked: self.locked,
            unlocked: self.unlocked,
            spent_indexes: self.spent,
            epoch: self.epoch,
        })
    }
}

impl From<assetlock::Error> for Error {
    fn from(e: assetlock::Error) -> Error {
        Error::AssetLock(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bitcoin::hashes::Hash;
    use bitcoin::{ScriptBuf, TxOut};

    use common::constants::COIN;

    use crate::assetlock::tests::{lock_tx, unlock_tx, TestQuorum};

    fn setup(balance: u64) -> (PoolSnapshot, QuorumRegistry, TestQuorum) {
        let quorum = TestQuorum::new(1, 50);
        let mut quorums = QuorumRegistry::new();
        quorums.insert(quorum.quorum.clone());
        let params = ConsensusParams::default();
        let mut base = PoolSnapshot::base(
            BlockRef::new(99, BlockHash::from_byte_array([9; 32])),
            Amount::from_sat(balance),
            &params,
        );
        // entered the epoch with a much larger pool
        base.epoch = EpochState::start(Amount::from_sat(20_000 * COIN), 99, &params);
        (base, quorums, quorum)
    }

    #[test]
    fn locks_and_unlocks() {
        let params = ConsensusParams::default();
        let (base, quorums, quorum) = setup(10 * COIN);
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);

        diff.process_transaction(&lock_tx(&[COIN, 2 * COIN])).unwrap();
        diff.process_transaction(&unlock_tx(&quorum, 0, 5 * COIN, 99)).unwrap();
        // normal transactions are ignored
        diff.process_transaction(&Transaction::new_special(0)).unwrap();
        assert_eq!(diff.locked(), Amount::from_sat(3 * COIN));
        assert_eq!(diff.unlocked(), Amount::from_sat(5 * COIN));
        assert_eq!(diff.balance().unwrap(), Amount::from_sat(8 * COIN));

        let snap = diff.into_snapshot(BlockRef::new(100, BlockHash::from_byte_array([1; 32]))).unwrap();
        assert_eq!(snap.prev_hash, base.block.hash);
        assert!(snap.spent_indexes.contains(0));
        assert_eq!(snap.epoch.withdrawn, Amount::from_sat(5 * COIN));
    }

    #[test]
    fn failure_leaves_diff_unchanged() {
        let params = ConsensusParams::default();
        let (base, quorums, quorum) = setup(10 * COIN);
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);

        diff.process_transaction(&unlock_tx(&quorum, 3, 4 * COIN, 99)).unwrap();
        match diff.process_transaction(&unlock_tx(&quorum, 3, COIN, 99)) {
            Err(Error::DuplicateIndex(3)) => {}
            r => panic!("unexpected {:?}", r),
        }
        match diff.process_transaction(&unlock_tx(&quorum, 4, 7 * COIN, 99)) {
            Err(Error::InsufficientPoolBalance { balance, requested }) => {
                assert_eq!(balance, Amount::from_sat(6 * COIN));
                assert_eq!(requested, Amount::from_sat(7 * COIN));
            }
            r => panic!("unexpected {:?}", r),
        }
        assert_eq!(diff.unlocked(), Amount::from_sat(4 * COIN));
        assert_eq!(diff.epoch.withdrawn, Amount::from_sat(4 * COIN));
        assert_eq!(diff.window_state(), WindowState::Open);

        // the same index fits once the balance does
        diff.process_transaction(&lock_tx(&[COIN])).unwrap();
        diff.process_transaction(&unlock_tx(&quorum, 4, 7 * COIN, 99)).unwrap();
        assert_eq!(diff.balance().unwrap(), Amount::ZERO);
    }

    #[test]
    fn index_window() {
        let mut params = ConsensusParams::default();
        params.index_window = 5;
        let quorum = TestQuorum::new(1, 50);
        let mut quorums = QuorumRegistry::new();
        quorums.insert(quorum.quorum.clone());
        let base = PoolSnapshot::base(
            BlockRef::new(99, BlockHash::from_byte_array([9; 32])),
            Amount::from_sat(10 * COIN),
            &params,
        );
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);
        match diff.process_transaction(&unlock_tx(&quorum, 6, COIN, 99)) {
            Err(Error::IndexTooFar(6)) => {}
            r => panic!("unexpected {:?}", r),
        }
        diff.process_transaction(&unlock_tx(&quorum, 5, COIN, 99)).unwrap();
    }

    #[test]
    fn stateless_errors_first() {
        let params = ConsensusParams::default();
        let (base, quorums, quorum) = setup(COIN);
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);
        diff.process_transaction(&unlock_tx(&quorum, 0, COIN / 2, 99)).unwrap();

        // spent index and too much, but the request is too old
        match diff.process_transaction(&unlock_tx(&quorum, 0, 2 * COIN, 10)) {
            Err(Error::AssetLock(assetlock::Error::RequestTooLate { .. })) => {}
            r => panic!("unexpected {:?}", r),
        }
    }

    #[test]
    fn platform_reward() {
        let mut params = ConsensusParams::default();
        let (base, quorums, _) = setup(COIN);
        let mut coinbase = Transaction::new_special(tx_type::COINBASE);
        coinbase.output.push(TxOut {
            value: Amount::from_sat(500),
            script_pubkey: ScriptBuf::from_bytes(vec![0x6a]),
        });
        coinbase.output.push(TxOut {
            value: Amount::from_sat(700),
            script_pubkey: ScriptBuf::from_bytes(vec![0x6a, 0x00]),
        });

        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);
        assert_eq!(diff.add_platform_reward(&coinbase).unwrap(), Amount::ZERO);

        params.platform_reward_height = Some(101);
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);
        assert_eq!(diff.add_platform_reward(&coinbase).unwrap(), Amount::ZERO);

        params.platform_reward_height = Some(100);
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);
        assert_eq!(diff.add_platform_reward(&coinbase).unwrap(), Amount::from_sat(500));
        assert_eq!(diff.balance().unwrap(), Amount::from_sat(COIN + 500));
    }

    #[test]
    fn money_supply_cap() {
        let mut params = ConsensusParams::default();
        params.platform_reward_height = Some(100);
        let (base, quorums, _) = setup(MAX_MONEY - COIN);
        let mut diff = CreditPoolDiff::new(&base, 100, &quorums, &params);

        diff.process_transaction(&lock_tx(&[COIN / 2])).unwrap();
        // each lock is in range on its own but the pool would pass the supply
        match diff.process_transaction(&lock_tx(&[COIN])) {
            Err(Error::AmountOverflow) => {}
            r => panic!("unexpected {:?}", r),
        }
        assert_eq!(diff.locked(), Amount::from_sat(COIN / 2));

        let mut coinbase = Transaction::new_special(tx_type::COINBASE);
        coinbase.output.push(TxOut {
            value: Amount::from_sat(COIN),
            script_pubkey: ScriptBuf::from_bytes(vec![0x6a]),
        });
        match diff.add_platform_reward(&coinbase) {
            Err(Error::AmountOverflow) => {}
            r => panic!("unexpected {:?}", r),
        }
        diff.process_transaction(&lock_tx(&[COIN / 2])).unwrap();
        assert_eq!(diff.balance().unwrap(), Amount::from_sat(MAX_MONEY));
        let snap = diff.into_snapshot(BlockRef::new(100, BlockHash::from_byte_array([1; 32]))).unwrap();
        assert_eq!(snap.balance, Amount::from_sat(MAX_MONEY));
    }
}
