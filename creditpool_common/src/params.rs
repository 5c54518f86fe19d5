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


//! # Consensus parameters
//! The tunable rules of the credit pool. Every field has a default so a
//! configuration file only needs to name what it changes.

use bitcoin::Amount;

use crate::constants::{BLOCKS_IN_ONE_DAY, COIN};
use crate::{BlockHeight, LlmqType};

/// Struct to contain all configurable consensus constants.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConsensusParams {
    /// Quorum type that signs withdrawals.
    pub llmq_type_asset_locks: LlmqType,
    /// Length of a withdrawal limit epoch, in blocks.
    pub epoch_length: BlockHeight,
    /// Below this balance the whole pool may be withdrawn in one epoch.
    /// Above it, this is also the lowest limit an epoch can get.
    #[cfg_attr(feature = "serde", serde(with = "bitcoin::amount::serde::as_sat"))]
    pub limit_low: Amount,
    /// The limit never grows past this amount.
    #[cfg_attr(feature = "serde", serde(with = "bitcoin::amount::serde::as_sat"))]
    pub limit_high: Amount,
    /// The limit is the balance entering the epoch divided by this.
    pub limit_divisor: u64,
    /// Largest fee an unlock may pay.
    #[cfg_attr(feature = "serde", serde(with = "bitcoin::amount::serde::as_sat"))]
    pub unlock_fee_ceiling: Amount,
    /// Number of blocks after its requested height an unlock is still accepted.
    pub unlock_expiry_blocks: BlockHeight,
    /// Number of most recent quorums that may sign a withdrawal.
    pub active_quorum_count: usize,
    /// How far ahead of the highest used index a new index may be.
    pub index_window: u64,
    /// Height from which empty `OP_RETURN` coinbase outputs feed the pool.
    pub platform_reward_height: Option<BlockHeight>,
}

impl ConsensusParams {
    /// Parameters of the production network.
    pub fn mainnet() -> ConsensusParams {
        ConsensusParams {
            llmq_type_asset_locks: LlmqType::LLMQ_100_67,
            ..Default::default()
        }
    }

    /// Parameters of local regression test networks.
    pub fn regtest() -> ConsensusParams {
        ConsensusParams {
            llmq_type_asset_locks: LlmqType::LLMQ_TEST_PLATFORM,
            ..Default::default()
        }
    }

    /// The epoch a block at the given height belongs to.
    pub fn epoch_of(&self, height: BlockHeight) -> u64 {
        height / self.epoch_length
    }

    /// Check the parameters for obvious inconsistencies.
    pub fn sanity_check(&self) -> Result<(), &'static str> {
        if self.epoch_length == 0 {
            return Err("epoch_length must not be zero");
        }
        if self.limit_divisor == 0 {
            return Err("limit_divisor must not be zero");
        }
        if self.limit_low > self.limit_high {
            return Err("limit_low must not exceed limit_high");
        }
        if self.active_quorum_count == 0 {
            return Err("active_quorum_count must not be zero");
        }
        if self.unlock_fee_ceiling == Amount::ZERO {
            return Err("unlock_fee_ceiling must not be zero");
        }
        Ok(())
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            llmq_type_asset_locks: LlmqType::LLMQ_TEST_PLATFORM,
            epoch_length: BLOCKS_IN_ONE_DAY,
            limit_low: Amount::from_sat(100 * COIN),
            limit_high: Amount::from_sat(1000 * COIN),
            limit_divisor: 10,
            unlock_fee_ceiling: Amount::from_sat(COIN / 100),
            unlock_expiry_blocks: 48,
            active_quorum_count: 2,
            index_window: 10_000,
            platform_reward_height: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn epochs() {
        let params = ConsensusParams::default();
        assert_eq!(params.epoch_of(0), 0);
        assert_eq!(params.epoch_of(575), 0);
        assert_eq!(params.epoch_of(576), 1);
    }

    #[test]
    fn sanity() {
        assert!(ConsensusParams::mainnet().sanity_check().is_ok());
        assert!(ConsensusParams::regtest().sanity_check().is_ok());

        let mut params = ConsensusParams::default();
        params.limit_low = params.limit_high + Amount::ONE_SAT;
        assert!(params.sanity_check().is_err());

        let mut params = ConsensusParams::default();
        params.epoch_length = 0;
        assert!(params.sanity_check().is_err());
    }

    #[test]
    fn partial_deserialize() {
        let params: ConsensusParams = serde_json::from_str(r#"{
            "epoch_length": 100,
            "limit_low": 5000
        }"#).unwrap();
        assert_eq!(params.epoch_length, 100);
        assert_eq!(params.limit_low, Amount::from_sat(5000));
        assert_eq!(params.limit_high, ConsensusParams::default().limit_high);
    }
}
