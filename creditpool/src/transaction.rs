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

//! # Transactions and blocks
//!
//! Special transactions share the input and output format with Bitcoin but
//! pack a 16-bit type into the upper half of the version field and append an
//! extra payload after the lock time.
//!

use std::io;

use bitcoin::blockdata::block;
use bitcoin::consensus::encode::{self, deserialize, serialize, Decodable, Encodable, VarInt};
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{Amount, BlockHash, TxIn, TxOut, Txid};

use common::constants::{tx_type, SPECIAL_TX_VERSION};
use common::BlockHeight;

use crate::utils::BlockRef;

/// A transaction with an optional special payload.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Transaction {
    /// Transaction version, the low half of the 32-bit version field.
    pub version: u16,
    /// Special transaction type, the high half of the 32-bit version field.
    pub tx_type: u16,
    /// Inputs.
    pub input: Vec<TxIn>,
    /// Outputs.
    pub output: Vec<TxOut>,
    /// Lock time.
    pub lock_time: u32,
    /// Serialized special payload; empty for normal transactions.
    pub extra_payload: Vec<u8>,
}

impl Transaction {
    /// Create an empty special transaction of the given type.
    pub fn new_special(tx_type: u16) -> Transaction {
        Transaction {
            version: SPECIAL_TX_VERSION,
            tx_type: tx_type,
            input: vec![],
            output: vec![],
            lock_time: 0,
            extra_payload: vec![],
        }
    }

    /// Whether the encoding carries the extra payload.
    fn has_payload(&self) -> bool {
        self.version >= SPECIAL_TX_VERSION && self.tx_type != tx_type::NORMAL
    }

    /// The transaction id.
    pub fn txid(&self) -> Txid {
        Txid::from_raw_hash(sha256d::Hash::hash(&serialize(self)))
    }

    /// Whether this is the coinbase transaction of a block.
    pub fn is_coinbase(&self) -> bool {
        self.input.len() == 1 && self.input[0].previous_output.is_null()
    }

    /// Sum of all output values, `None` on overflow.
    pub fn value_out(&self) -> Option<Amount> {
        self.output.iter().try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.value))
    }

    /// Decode the special payload. Trailing bytes are an error.
    pub fn payload<T: Decodable>(&self) -> Result<T, encode::Error> {
        deserialize(&self.extra_payload)
    }

    /// Replace the special payload.
    pub fn set_payload<T: Encodable>(&mut self, payload: &T) {
        self.extra_payload = serialize(payload);
    }
}

impl Encodable for Transaction {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let version = (self.version as u32 | (self.tx_type as u32) << 16) as i32;
        let mut len = version.consensus_encode(w)?;
        len += self.input.consensus_encode(w)?;
        len += self.output.consensus_encode(w)?;
        len += self.lock_time.consensus_encode(w)?;
        if self.has_payload() {
            len += self.extra_payload.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for Transaction {
    fn consensus_decode_from_finite_reader<R: io::Read + ?Sized>(
        r: &mut R,
    ) -> Result<Transaction, encode::Error> {
        let version = i32::consensus_decode_from_finite_reader(r)? as u32;
        let mut tx = Transaction {
            version: (version & 0xffff) as u16,
            tx_type: (version >> 16) as u16,
            input: Decodable::consensus_decode_from_finite_reader(r)?,
            output: Decodable::consensus_decode_from_finite_reader(r)?,
            lock_time: Decodable::consensus_decode_from_finite_reader(r)?,
            extra_payload: vec![],
        };
        if tx.has_payload() {
            tx.extra_payload = Decodable::consensus_decode_from_finite_reader(r)?;
        }
        Ok(tx)
    }
}

/// A block as far as the pool is concerned.
///
/// Block hashes are not computed locally; they come from the node
/// together with the height.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Block {
    /// The block hash.
    pub hash: BlockHash,
    /// The block height.
    pub height: BlockHeight,
    /// The block header.
    pub header: block::Header,
    /// Transactions, coinbase first.
    pub txdata: Vec<Transaction>,
}

impl Block {
    /// Decode the consensus serialization of a block whose hash and height are known.
    pub fn from_raw(hash: BlockHash, height: BlockHeight, raw: &[u8]) -> Result<Block, encode::Error> {
        let mut cursor = io::Cursor::new(raw);
        let header = block::Header::consensus_decode(&mut cursor)?;
        let count = VarInt::consensus_decode(&mut cursor)?.0;
        let mut txdata = Vec::new();
        for _ in 0..count {
            txdata.push(Transaction::consensus_decode(&mut cursor)?);
        }
        if cursor.position() as usize != raw.len() {
            return Err(encode::Error::ParseFailed("data not consumed entirely when decoding block"));
        }
        Ok(Block {
            hash: hash,
            height: height,
            header: header,
            txdata: txdata,
        })
    }

    /// The hash of the parent block.
    pub fn prev_blockhash(&self) -> BlockHash {
        self.header.prev_blockhash
    }

    /// The height and hash of this block.
    pub fn block_ref(&self) -> BlockRef {
        BlockRef::new(self.height, self.hash)
    }

    /// The coinbase transaction, if the block has one.
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.txdata.first().filter(|tx| tx.is_coinbase())
    }
}

impl Encodable for Block {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.header.consensus_encode(w)?;
        len += VarInt(self.txdata.len() as u64).consensus_encode(w)?;
        for tx in &self.txdata {
            len += tx.consensus_encode(w)?;
        }
        Ok(len)
    }
}
