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

//! # Utils
//! Helper functions of general usefulness
//!

use std::{fmt, fs, io};

use bitcoin::hashes::Hash;
use bitcoin::BlockHash;

use common::BlockHeight;

pub mod serialize {
    //! Module for special serde serialization.
    pub mod hashmap {
        //! Module for serialization of hashmaps because serde_json will
        //! not serialize hashmaps with non-string keys be default.
        #![allow(missing_docs)]

        use std::collections::HashMap;

        pub fn serialize<S, T, U>(v: &HashMap<T, U>, s: S)
            -> Result<S::Ok, S::Error> where
            S: serde::Serializer,
            T: serde::Serialize + ::std::hash::Hash + Eq,
            U: serde::Serialize,
        {
            use serde::ser::SerializeSeq;

            let mut seq = s.serialize_seq(Some(v.len()))?;
            for pair in v.iter() {
                seq.serialize_element(&pair)?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D, T, U>(d: D)
            -> Result<HashMap<T, U>, D::Error> where
            D: serde::Deserializer<'de>,
            T: serde::Deserialize<'de> + ::std::hash::Hash + Eq,
            U: serde::Deserialize<'de>,
        {
            use std::marker::PhantomData;

            struct Visitor<T, U>(PhantomData<(T, U)>);
            impl<'de, T, U> serde::de::Visitor<'de> for Visitor<T, U> where
                T: serde::Deserialize<'de> + ::std::hash::Hash + Eq,
                U: serde::Deserialize<'de>,
            {
                type Value = HashMap<T, U>;

                fn expecting(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                    write!(f, "a sequence of pairs")
                }

                fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut a: A)
                    -> Result<Self::Value, A::Error>
                {
                    let mut ret = HashMap::new();
                    while let Some((key, value)) = a.next_element()? {
                        ret.insert(key, value);
                    }
                    Ok(ret)
                }
            }

            d.deserialize_seq(Visitor(PhantomData))
        }
    }
}

/// A block hash and height pair.
#[derive(Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    // Height comes first so refs order by height when used as map keys.

    /// The block height.
    pub height: BlockHeight,
    /// The block hash.
    #[serde(default = "bitcoin::BlockHash::all_zeros")]
    pub hash: BlockHash,
}

impl BlockRef {
    /// Create a new [BlockRef].
    pub fn new(height: BlockHeight, hash: BlockHash) -> BlockRef {
        BlockRef {
            height: height,
            hash: hash,
        }
    }
}

impl std::default::Default for BlockRef {
    fn default() -> Self {
        BlockRef {
            height: BlockHeight::default(),
            hash: BlockHash::all_zeros(),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.height, self.hash)
    }
}

/// (Attempt to) export some serializable object to a file.
///
/// The data is first written to `<file>.0` and then moved over `file`, so
/// a crash never leaves a half-written file behind.
pub fn export_to_file<F, E>(file: &str, export_fn: F) -> bool
    where F: FnOnce(io::BufWriter<fs::File>) -> Result<(), E>,
          E: fmt::Display,
{
    let mut temp_name = file.to_owned();
    temp_name.push_str(".0");
    match fs::File::create(&temp_name) {
        Ok(fh) => {
            let wr = io::BufWriter::new(fh);
            if let Err(e) = export_fn(wr) {
                slog!(WriteFailed, filename: &temp_name, error: e.to_string());
                false
            } else if let Err(e) = fs::rename(&temp_name, file) {
                slog!(MoveFailed, old_filename: &temp_name, new_filename: file,
                    error: e.to_string()
                );
                false
            } else {
                true
            }
        }
        Err(e) => {
            slog!(CreateFailed, filename: &temp_name, error: e.to_string());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "serialize::hashmap")]
        map: HashMap<BlockRef, u64>,
    }

    #[test]
    fn serde_helpers() {
        let mut map = HashMap::new();
        map.insert(BlockRef::new(7, BlockHash::all_zeros()), 100);
        let holder = Holder { map: map };

        let json = serde_json::to_string(&holder).unwrap();
        assert!(json.starts_with("{\"map\":[["));
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn block_ref_order() {
        let low = BlockRef::new(1, BlockHash::from_byte_array([0xff; 32]));
        let high = BlockRef::new(2, BlockHash::all_zeros());
        assert!(low < high);
        assert_eq!(high.to_string(), format!("2:{}", BlockHash::all_zeros()));
        assert_eq!(BlockRef::default().height, 0);
    }

    #[test]
    fn export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let path = path.to_str().unwrap();

        assert!(export_to_file(path, |mut w| w.write_all(b"first")));
        assert_eq!(fs::read(path).unwrap(), b"first");
        assert!(!fs::metadata(format!("{}.0", path)).is_ok());

        // a failing writer keeps the old contents
        assert!(!export_to_file(path, |_| Err("nope")));
        assert_eq!(fs::read(path).unwrap(), b"first");

        let missing = dir.path().join("nodir").join("out.json");
        assert!(!export_to_file(missing.to_str().unwrap(), |_| Ok::<(), io::Error>(())));
    }
}
