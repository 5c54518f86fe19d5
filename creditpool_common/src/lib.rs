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

#[cfg(feature = "serde")]
extern crate serde;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_derive;

pub extern crate bitcoin;

pub mod constants;
pub mod params;
#[macro_use]
pub mod macros;

pub use params::ConsensusParams;

use std::fmt;

use bitcoin::BlockHash;

/// A block height (or height delta, e.g. number of confirmations)
pub type BlockHeight = u64;

/// The type of a long-living masternode quorum.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LlmqType(pub u8);

impl LlmqType {
    /// 50 members, 60% threshold.
    pub const LLMQ_50_60: LlmqType = LlmqType(1);
    /// 400 members, 60% threshold.
    pub const LLMQ_400_60: LlmqType = LlmqType(2);
    /// 400 members, 85% threshold.
    pub const LLMQ_400_85: LlmqType = LlmqType(3);
    /// 100 members, 67% threshold. Signs withdrawals on mainnet.
    pub const LLMQ_100_67: LlmqType = LlmqType(4);
    /// 3 members, 2 threshold. Regression testing only.
    pub const LLMQ_TEST: LlmqType = LlmqType(100);
    /// Platform quorum used on regression test networks.
    pub const LLMQ_TEST_PLATFORM: LlmqType = LlmqType(106);
}

impl LlmqType {
    /// The name the node uses for this type in `quorum list`.
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            1 => Some("llmq_50_60"),
            2 => Some("llmq_400_60"),
            3 => Some("llmq_400_85"),
            4 => Some("llmq_100_67"),
            100 => Some("llmq_test"),
            106 => Some("llmq_test_platform"),
            _ => None,
        }
    }
}

impl fmt::Display for LlmqType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The block the ledger currently considers its tip.
///
/// This is attached to every log line as context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChainTip {
    /// Height of the tip, zero when nothing is tracked yet.
    pub height: BlockHeight,
    /// Hash of the tip.
    pub hash: Option<BlockHash>,
}

impl ChainTip {
    /// Create a new tip reference.
    pub fn new(height: BlockHeight, hash: BlockHash) -> ChainTip {
        ChainTip {
            height: height,
            hash: Some(hash),
        }
    }
}

impl fmt::Display for ChainTip {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.hash {
            Some(ref hash) => write!(f, "{}:{}", self.height, hash),
            None => write!(f, "{}:none", self.height),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use bitcoin::hashes::Hash;

    #[test]
    fn chain_tip_display() {
        assert_eq!(ChainTip::default().to_string(), "0:none");
        let tip = ChainTip::new(7, BlockHash::all_zeros());
        assert_eq!(tip.to_string(), format!("7:{}", "0".repeat(64)));
    }

    #[test]
    fn llmq_type_serde() {
        let s = serde_json::to_string(&LlmqType::LLMQ_TEST_PLATFORM).unwrap();
        assert_eq!(s, "106");
        let t: LlmqType = serde_json::from_str("4").unwrap();
        assert_eq!(t, LlmqType::LLMQ_100_67);
        assert_eq!(t.name(), Some("llmq_100_67"));
        assert_eq!(LlmqType(42).name(), None);
    }
}
