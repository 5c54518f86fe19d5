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

//! # Quorums
//! The masternode quorums the node knows about, and which of them may
//! sign a withdrawal at a given height.
//!

use std::collections::BTreeMap;

use bitcoin::hashes::{sha256d, Hash, HashEngine};
use bitcoin::{BlockHash, Txid};

use common::{BlockHeight, LlmqType};

use crate::bls::{BlsPublicKey, BlsSignature};

/// A quorum is named by the hash of the block it was formed at.
pub type QuorumHash = BlockHash;

/// Hash that a quorum signs for a request.
pub fn build_sign_hash(
    llmq_type: LlmqType,
    quorum_hash: &QuorumHash,
    request_id: &sha256d::Hash,
    msg_hash: &Txid,
) -> sha256d::Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(&[llmq_type.0]);
    engine.input(quorum_hash.as_byte_array());
    engine.input(request_id.as_byte_array());
    engine.input(msg_hash.as_byte_array());
    sha256d::Hash::from_engine(engine)
}

/// A formed quorum.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Quorum {
    /// Quorum type.
    pub llmq_type: LlmqType,
    /// Hash of the formation block.
    pub quorum_hash: QuorumHash,
    /// Height of the formation block.
    pub height: BlockHeight,
    /// Aggregated public key of the members.
    pub public_key: BlsPublicKey,
}

impl Quorum {
    /// The hash this quorum signs for the given request.
    pub fn sign_hash(&self, request_id: &sha256d::Hash, msg_hash: &Txid) -> sha256d::Hash {
        build_sign_hash(self.llmq_type, &self.quorum_hash, request_id, msg_hash)
    }

    /// Check a recovered signature of this quorum.
    pub fn verify(&self, request_id: &sha256d::Hash, msg_hash: &Txid, sig: &BlsSignature) -> bool {
        sig.verify(&self.public_key, &self.sign_hash(request_id, msg_hash).to_byte_array())
    }
}

/// All known quorums, grouped by type and ordered by formation height.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct QuorumRegistry {
    quorums: BTreeMap<LlmqType, Vec<Quorum>>,
}

impl QuorumRegistry {
    /// Create an empty registry.
    pub fn new() -> QuorumRegistry {
        Default::default()
    }

    /// Add a quorum, replacing a known one with the same hash.
    pub fn insert(&mut self, quorum: Quorum) {
        let list = self.quorums.entry(quorum.llmq_type).or_insert_with(Vec::new);
        match list.iter().position(|q| q.quorum_hash == quorum.quorum_hash) {
            Some(idx) => {
                list.remove(idx);
            }
            None => {
                slog!(RegisterQuorum, llmq_type: quorum.llmq_type.0,
                    quorum_hash: quorum.quorum_hash, height: quorum.height,
                );
            }
        }
        let pos = list.iter().position(|q| q.height > quorum.height).unwrap_or(list.len());
        list.insert(pos, quorum);
    }

    /// Look up a quorum.
    pub fn get(&self, llmq_type: LlmqType, quorum_hash: &QuorumHash) -> Option<&Quorum> {
        self.quorums.get(&llmq_type)?.iter().find(|q| q.quorum_hash == *quorum_hash)
    }

    /// The `count` most recent quorums of a type formed at or below `height`,
    /// most recent first.
    pub fn active_at(&self, llmq_type: LlmqType, height: BlockHeight, count: usize) -> Vec<&Quorum> {
        match self.quorums.get(&llmq_type) {
            Some(list) => list.iter().rev().filter(|q| q.height <= height).take(count).collect(),
            None => vec![],
        }
    }

    /// Whether the quorum is in the active set at `height`.
    pub fn is_active(
        &self,
        llmq_type: LlmqType,
        quorum_hash: &QuorumHash,
        height: BlockHeight,
        count: usize,
    ) -> bool {
        self.active_at(llmq_type, height, count).iter().any(|q| q.quorum_hash == *quorum_hash)
    }

    /// Forget quorums formed in blocks above `height`, after those blocks
    /// were disconnected.
    pub fn remove_formed_above(&mut self, height: BlockHeight) {
        for list in self.quorums.values_mut() {
            list.retain(|q| q.height <= height);
        }
        self.quorums.retain(|_, list| !list.is_empty());
    }

    /// Forget quorums formed at or below `height` except the `keep` most
    /// recent of them of each type. Returns the number forgotten.
    pub fn prune(&mut self, height: BlockHeight, keep: usize) -> usize {
        let before = self.len();
        for list in self.quorums.values_mut() {
            // ordered by height, so the old ones come first
            let old = list.iter().take_while(|q| q.height <= height).count();
            if old > keep {
                list.drain(..old - keep);
            }
        }
        let removed = before - self.len();
        if removed > 0 {
            slog!(PruneQuorums, formed_below: height, removed: removed);
        }
        removed
    }

    /// Number of known quorums of all types.
    pub fn len(&self) -> usize {
        self.quorums.values().map(Vec::len).sum()
    }

    /// Whether no quorum is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all quorums.
    pub fn iter(&self) -> impl Iterator<Item = &Quorum> {
        self.quorums.values().flat_map(|list| list.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bls::BlsSecretKey;

    fn quorum(seed: u8, height: BlockHeight) -> Quorum {
        Quorum {
            llmq_type: LlmqType::LLMQ_TEST_PLATFORM,
            quorum_hash: BlockHash::from_byte_array([seed; 32]),
            height: height,
            public_key: BlsSecretKey::from_seed(&[seed; 32]).unwrap().public_key(),
        }
    }

    #[test]
    fn sign_hash_layout() {
        let request_id = sha256d::Hash::from_byte_array([2; 32]);
        let msg_hash = Txid::from_byte_array([3; 32]);
        let quorum_hash = BlockHash::from_byte_array([1; 32]);

        let mut data = vec![106u8];
        data.extend_from_slice(&[1; 32]);
        data.extend_from_slice(&[2; 32]);
        data.extend_from_slice(&[3; 32]);
        assert_eq!(
            build_sign_hash(LlmqType::LLMQ_TEST_PLATFORM, &quorum_hash, &request_id, &msg_hash),
            sha256d::Hash::hash(&data),
        );
    }

    #[test]
    fn verify() {
        let q = quorum(5, 10);
        let sk = BlsSecretKey::from_seed(&[5; 32]).unwrap();
        let request_id = sha256d::Hash::hash(b"request");
        let msg_hash = Txid::from_byte_array([9; 32]);

        let sig = sk.sign(&q.sign_hash(&request_id, &msg_hash).to_byte_array());
        assert!(q.verify(&request_id, &msg_hash, &sig));
        assert!(!q.verify(&request_id, &Txid::from_byte_array([8; 32]), &sig));

        // same key, other quorum hash
        let mut other = q.clone();
        other.quorum_hash = BlockHash::from_byte_array([6; 32]);
        assert!(!other.verify(&request_id, &msg_hash, &sig));
    }

    #[test]
    fn active_set() {
        let mut reg = QuorumRegistry::new();
        reg.insert(quorum(3, 30));
        reg.insert(quorum(1, 10));
        reg.insert(quorum(2, 20));
        assert_eq!(reg.len(), 3);

        let ty = LlmqType::LLMQ_TEST_PLATFORM;
        let heights = |h| reg.active_at(ty, h, 2).iter().map(|q| q.height).collect::<Vec<_>>();
        assert_eq!(heights(5), Vec::<BlockHeight>::new());
        assert_eq!(heights(10), vec![10]);
        assert_eq!(heights(25), vec![20, 10]);
        assert_eq!(heights(100), vec![30, 20]);

        let first = BlockHash::from_byte_array([1; 32]);
        assert!(reg.is_active(ty, &first, 29, 2));
        assert!(!reg.is_active(ty, &first, 30, 2));
        assert!(reg.active_at(LlmqType::LLMQ_TEST, 100, 2).is_empty());
    }

    #[test]
    fn replace_and_remove() {
        let mut reg = QuorumRegistry::new();
        reg.insert(quorum(1, 10));
        reg.insert(quorum(2, 20));

        let mut moved = quorum(1, 15);
        moved.public_key = quorum(9, 0).public_key;
        reg.insert(moved.clone());
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(moved.llmq_type, &moved.quorum_hash), Some(&moved));

        reg.remove_formed_above(15);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(moved.llmq_type, &BlockHash::from_byte_array([2; 32])).is_none());
        reg.remove_formed_above(0);
        assert!(reg.is_empty());
    }

    #[test]
    fn prune_keeps_active_set() {
        let mut reg = QuorumRegistry::new();
        for (seed, height) in [(1, 10), (2, 30), (3, 20), (4, 40), (5, 60)].iter() {
            reg.insert(quorum(*seed, *height));
        }
        let mut other = quorum(9, 5);
        other.llmq_type = LlmqType::LLMQ_100_67;
        reg.insert(other);

        let active = |reg: &QuorumRegistry| reg.active_at(LlmqType::LLMQ_TEST_PLATFORM, 45, 2)
            .iter().map(|q| q.height).collect::<Vec<_>>();
        assert_eq!(active(&reg), vec![40, 30]);

        assert_eq!(reg.prune(45, 2), 2);
        assert_eq!(reg.len(), 4);
        assert!(reg.get(LlmqType::LLMQ_TEST_PLATFORM, &BlockHash::from_byte_array([1; 32])).is_none());
        assert!(reg.get(LlmqType::LLMQ_TEST_PLATFORM, &BlockHash::from_byte_array([3; 32])).is_none());
        assert!(reg.get(LlmqType::LLMQ_100_67, &BlockHash::from_byte_array([9; 32])).is_some());
        assert_eq!(active(&reg), vec![40, 30]);

        assert_eq!(reg.prune(45, 2), 0);
    }
}
