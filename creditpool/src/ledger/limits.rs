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

//! # Withdrawal limits
//!
//! Withdrawals are capped per epoch. The cap of an epoch is fixed when the
//! epoch starts, from the balance entering it; locks during the epoch do
//! not raise it.
//!

use std::cmp;

use bitcoin::Amount;

use common::{BlockHeight, ConsensusParams};

/// Withdrawal limit for an epoch entered with the given balance.
pub fn withdrawal_limit(balance: Amount, params: &ConsensusParams) -> Amount {
    if balance <= params.limit_low {
        return balance;
    }
    let scaled = Amount::from_sat(balance.to_sat() / params.limit_divisor);
    cmp::min(cmp::max(scaled, params.limit_low), params.limit_high)
}

/// Whether more can be withdrawn in the epoch.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WindowState {
    /// Withdrawals are still accepted.
    Open,
    /// The limit was hit.
    Exhausted,
}

/// A withdrawal would cross the epoch limit.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LimitExceeded {
    /// Limit of the epoch.
    pub limit: Amount,
    /// Withdrawn so far.
    pub withdrawn: Amount,
    /// The refused amount.
    pub requested: Amount,
}

/// Withdrawal accounting of the epoch a block is in.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct EpochState {
    /// Epoch number.
    pub epoch: u64,
    /// Limit of the epoch.
    pub limit: Amount,
    /// Withdrawn in the epoch up to and including the block.
    pub withdrawn: Amount,
    /// A withdrawal was refused in the block being built.
    #[serde(skip)]
    refused: bool,
}

impl EpochState {
    /// A fresh epoch for the block at `height` entered with `balance`.
    pub fn start(balance: Amount, height: BlockHeight, params: &ConsensusParams) -> EpochState {
        EpochState {
            epoch: params.epoch_of(height),
            limit: withdrawal_limit(balance, params),
            withdrawn: Amount::ZERO,
            refused: false,
        }
    }

    /// Epoch state of the block at `height` whose parent has state `parent`
    /// and balance `parent_balance`.
    pub fn next(
        parent: &EpochState,
        parent_balance: Amount,
        height: BlockHeight,
        params: &ConsensusParams,
    ) -> EpochState {
        if params.epoch_of(height) == parent.epoch {
            return EpochState {
                refused: false,
                ..*parent
            };
        }
        let ret = EpochState::start(parent_balance, height, params);
        slog!(NewEpoch, epoch: ret.epoch, height: height, balance: parent_balance.to_sat(),
            limit: ret.limit.to_sat(),
        );
        ret
    }

    /// What is left to withdraw in this epoch.
    pub fn remaining(&self) -> Amount {
        self.limit.checked_sub(self.withdrawn).unwrap_or(Amount::ZERO)
    }

    /// Account for a withdrawal. Nothing is accounted on error.
    pub fn try_withdraw(&mut self, amount: Amount) -> Result<(), LimitExceeded> {
        if amount > self.remaining() {
            self.refused = true;
            slog!(WithdrawalLimitReached, epoch: self.epoch, limit: self.limit.to_sat(),
                withdrawn: self.withdrawn.to_sat(), requested: amount.to_sat(),
            );
            return Err(LimitExceeded {
                limit: self.limit,
                withdrawn: self.withdrawn,
                requested: amount,
            });
        }
        self.withdrawn += amount;
        Ok(())
    }

    /// Whether the window is still open.
    pub fn state(&self) -> WindowState {
        if self.refused || self.withdrawn >= self.limit {
            WindowState::Exhausted
        } else {
            WindowState::Open
        }
    }
}
