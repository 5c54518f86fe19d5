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


//! # Credit pool
//! This is the library used by the pool watcher to track the credit pool of
//! a Dash chain: the funds locked by asset lock transactions and released by
//! quorum-signed asset unlock transactions. It is separated into its own
//! library mainly for ease of testing.
//!

// Coding conventions
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused)]
#![deny(unused_mut)]
#![warn(missing_docs)]

// External libs
#[cfg(test)]
#[macro_use] extern crate hex_literal;
#[macro_use] extern crate serde_derive;

#[macro_use]
pub extern crate creditpool_logs as logs;
#[macro_use]
pub extern crate creditpool_common as common;

#[macro_use] pub mod macros;
pub mod assetlock;
pub mod bls;
pub mod builder;
pub mod cbtx;
pub mod config;
pub mod follower;
pub mod ledger;
pub mod mempool;
pub mod miner;
pub mod oracle;
pub mod quorum;
pub mod rpc;
pub mod transaction;
pub mod utils;

use std::{error, fmt, io};

use bitcoin::consensus::encode;

/// Generic error enum
#[derive(Debug)]
pub enum Error {
    /// Talking to a node failed.
    Rpc(jsonrpc::Error),
    /// Reading or writing a file failed.
    Io(io::Error),
    /// A JSON document does not parse.
    Json(serde_json::Error),
    /// Consensus data does not decode.
    Encode(encode::Error),
    /// Bad configuration.
    Config(config::Error),
    /// The ledger rejected a block.
    Ledger(ledger::Error),
    /// The signing oracle failed.
    Oracle(oracle::Error),
    /// A transaction could not be built.
    Builder(builder::Error),
}

macro_rules! impl_from_error {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(e: $ty) -> Error {
                    Error::$variant(e)
                }
            }
        )*
    };
}

impl_from_error!(
    Rpc(jsonrpc::Error),
    Io(io::Error),
    Json(serde_json::Error),
    Encode(encode::Error),
    Config(config::Error),
    Ledger(ledger::Error),
    Oracle(oracle::Error),
    Builder(builder::Error),
);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Rpc(ref e) => write!(f, "rpc: {}", e),
            Error::Io(ref e) => write!(f, "i/o: {}", e),
            Error::Json(ref e) => write!(f, "json: {}", e),
            Error::Encode(ref e) => write!(f, "decode: {}", e),
            Error::Config(ref e) => write!(f, "config: {}", e),
            Error::Ledger(ref e) => write!(f, "ledger: {}", e),
            Error::Oracle(ref e) => write!(f, "oracle: {}", e),
            Error::Builder(ref e) => write!(f, "builder: {}", e),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::Rpc(ref e) => Some(e),
            Error::Io(ref e) => Some(e),
            Error::Json(ref e) => Some(e),
            Error::Encode(ref e) => Some(e),
            Error::Config(ref e) => Some(e),
            Error::Ledger(ref e) => Some(e),
            Error::Oracle(ref e) => Some(e),
            Error::Builder(ref e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e: Error = ledger::Error::DuplicateIndex(3).into();
        assert_eq!(e.to_string(), "ledger: withdrawal index 3 already used");

        let e: Error = config::Error::Local("bad").into();
        assert_eq!(e.to_string(), "config: local: bad");
    }
}
