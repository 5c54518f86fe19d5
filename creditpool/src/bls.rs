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

//! # BLS
//! Quorum public keys and recovered threshold signatures on BLS12-381.
//!
//! Keys live in G1 (48 bytes compressed), signatures in G2 (96 bytes).
//! Verification follows the basic scheme; the message is always a 32-byte
//! sign hash.
//!

use std::{error, fmt, io};
use std::str::FromStr;

use bitcoin::consensus::encode::{self, Decodable, Encodable};
use bitcoin::hex::{DisplayHex, FromHex};
use blst::min_pk;
use blst::BLST_ERROR;

/// Domain separation tag of the basic signature scheme.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Length of a compressed public key.
pub const PUBLIC_KEY_SIZE: usize = 48;

/// Length of a compressed signature.
pub const SIGNATURE_SIZE: usize = 96;

/// BLS related errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Hex string could not be decoded.
    BadHex(String),
    /// Wrong number of bytes.
    BadLength(usize, usize),
    /// Key material was rejected by the curve library.
    BadKey(BLST_ERROR),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::BadHex(ref e) => write!(f, "bad hex: {}", e),
            Error::BadLength(expected, got) => write!(f, "expected {} bytes, got {}", expected, got),
            Error::BadKey(e) => write!(f, "bad key material: {:?}", e),
        }
    }
}

impl error::Error for Error {}

macro_rules! impl_bls_bytes {
    ($thing:ident, $len:expr) => {
        impl $thing {
            /// Construct from raw bytes.
            pub fn from_slice(data: &[u8]) -> Result<$thing, Error> {
                if data.len() != $len {
                    return Err(Error::BadLength($len, data.len()));
                }
                let mut ret = [0; $len];
                ret.copy_from_slice(data);
                Ok($thing(ret))
            }

            /// The raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $thing {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0[..].as_hex(), f)
            }
        }

        impl fmt::Debug for $thing {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($thing), self)
            }
        }

        impl FromStr for $thing {
            type Err = Error;

            fn from_str(s: &str) -> Result<$thing, Error> {
                let bytes = Vec::<u8>::from_hex(s).map_err(|e| Error::BadHex(e.to_string()))?;
                $thing::from_slice(&bytes)
            }
        }

        impl Encodable for $thing {
            fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                w.write_all(&self.0)?;
                Ok($len)
            }
        }

        impl Decodable for $thing {
            fn consensus_decode_from_finite_reader<R: io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<$thing, encode::Error> {
                let mut ret = [0; $len];
                r.read_exact(&mut ret)?;
                Ok($thing(ret))
            }
        }

        impl serde::Serialize for $thing {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $thing {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<$thing, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A compressed quorum public key.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlsPublicKey([u8; PUBLIC_KEY_SIZE]);
impl_bls_bytes!(BlsPublicKey, PUBLIC_KEY_SIZE);

/// A compressed recovered signature.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlsSignature([u8; SIGNATURE_SIZE]);
impl_bls_bytes!(BlsSignature, SIGNATURE_SIZE);

impl BlsSignature {
    /// The all-zero placeholder used while computing the message hash.
    pub fn null() -> BlsSignature {
        BlsSignature([0; SIGNATURE_SIZE])
    }

    /// Whether this is the placeholder signature.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Verify the signature over a 32-byte message.
    ///
    /// Malformed points, including the null signature, never verify.
    pub fn verify(&self, pk: &BlsPublicKey, msg: &[u8; 32]) -> bool {
        let pk = match min_pk::PublicKey::from_bytes(&pk.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let sig = match min_pk::Signature::from_bytes(&self.0) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        sig.verify(true, msg, DST, &[], &pk, true) == BLST_ERROR::BLST_SUCCESS
    }
}

impl Default for BlsSignature {
    fn default() -> BlsSignature {
        BlsSignature::null()
    }
}

/// A quorum secret key share holder. Only used by local signers.
pub struct BlsSecretKey(min_pk::SecretKey);

impl BlsSecretKey {
    /// Derive a key from at least 32 bytes of input key material.
    pub fn from_seed(ikm: &[u8]) -> Result<BlsSecretKey, Error> {
        min_pk::SecretKey::key_gen(ikm, &[]).map(BlsSecretKey).map_err(Error::BadKey)
    }

    /// The matching public key.
    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey(self.0.sk_to_pk().to_bytes())
    }

    /// Sign a 32-byte message.
    pub fn sign(&self, msg: &[u8; 32]) -> BlsSignature {
        BlsSignature(self.0.sign(msg, DST, &[]).to_bytes())
    }
}

impl fmt::Debug for BlsSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BlsSecretKey({})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bitcoin::consensus::encode::{deserialize, serialize};

    #[test]
    fn sign_and_verify() {
        let sk = BlsSecretKey::from_seed(&[7; 32]).unwrap();
        let pk = sk.public_key();
        let sig = sk.sign(&[1; 32]);

        assert!(sig.verify(&pk, &[1; 32]));
        assert!(!sig.verify(&pk, &[2; 32]));

        let other = BlsSecretKey::from_seed(&[8; 32]).unwrap().public_key();
        assert!(!sig.verify(&other, &[1; 32]));
        assert!(!BlsSignature::null().verify(&pk, &[1; 32]));
    }

    #[test]
    fn short_seed_is_rejected() {
        assert!(BlsSecretKey::from_seed(&[7; 16]).is_err());
    }

    #[test]
    fn encodings() {
        let sk = BlsSecretKey::from_seed(&[3; 32]).unwrap();
        let sig = sk.sign(&[9; 32]);
        let pk = sk.public_key();

        let raw = serialize(&sig);
        assert_eq!(raw.len(), SIGNATURE_SIZE);
        assert_eq!(deserialize::<BlsSignature>(&raw).unwrap(), sig);
        assert!(deserialize::<BlsSignature>(&raw[1..]).is_err());

        let s = pk.to_string();
        assert_eq!(s.len(), 2 * PUBLIC_KEY_SIZE);
        assert_eq!(s.parse::<BlsPublicKey>().unwrap(), pk);
        assert_eq!("00".parse::<BlsPublicKey>(), Err(Error::BadLength(48, 1)));
        assert!("zz".parse::<BlsPublicKey>().is_err());

        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", s));
        assert_eq!(serde_json::from_str::<BlsPublicKey>(&json).unwrap(), pk);
    }

    #[test]
    fn null_signature() {
        assert!(BlsSignature::null().is_null());
        assert!(BlsSignature::default().is_null());
        let sig = BlsSecretKey::from_seed(&[3; 32]).unwrap().sign(&[0; 32]);
        assert!(!sig.is_null());
    }
}
