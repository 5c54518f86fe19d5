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

//! # Configuration
//!
//! Configuration file for the pool watcher
//!

use std::time::Duration;
use std::{error, fmt};

use bitcoin::{Amount, BlockHash};
use serde::Deserializer;

use common::constants::DEFAULT_SNAPSHOT_DEPTH;
use common::{BlockHeight, ConsensusParams};

use crate::oracle::PollConfig;
use crate::utils::BlockRef;

/// Configuration errors.
#[derive(Debug)]
pub enum Error {
    /// The consensus section does not make sense.
    Consensus(&'static str),
    /// The consensus section does not deserialize on top of the network preset.
    Json(serde_json::Error),
    /// Some local setting does not make sense.
    Local(&'static str),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Json(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Consensus(s) => write!(f, "consensus: {}", s),
            Error::Json(ref e) => write!(f, "consensus: {}", e),
            Error::Local(s) => write!(f, "local: {}", s),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match *self {
            Error::Json(ref e) => Some(e),
            _ => None,
        }
    }
}

/// Helper function to deserialize durations given in milliseconds
pub fn deserialize_duration_ms<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    let ms: u64 = serde::Deserialize::deserialize(d)?;
    Ok(Duration::from_millis(ms))
}

fn default_sync_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_snapshot_depth() -> BlockHeight {
    DEFAULT_SNAPSHOT_DEPTH
}

fn default_quorum_scan_count() -> usize {
    24
}

/// RPC connection to a masternode that holds a key share.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct Signer {
    /// Name used in logs
    pub name: String,
    /// http://url:port of its RPC
    pub rpc_url: String,
    /// RPC username
    pub rpc_user: Option<String>,
    /// RPC password
    pub rpc_pass: Option<String>,
}

/// Local configuration (RPC connections, etc)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct Local {
    /// Verbosity level of the logging system
    pub log_level: logs::Severity,
    /// Period (in ms) to monitor for throttling
    pub log_period_ms: Option<u64>,
    /// Limit on emission of a given log per log_period_ms
    pub log_max_instance_per_period: Option<u32>,
    /// http://url:port of the dashd RPC
    pub dashd_rpc_url: String,
    /// RPC username for dashd
    pub dashd_rpc_user: Option<String>,
    /// RPC password for dashd
    pub dashd_rpc_pass: Option<String>,
    /// Pause between two syncs with dashd (in ms)
    #[serde(alias = "sync_interval_ms")]
    #[serde(default = "default_sync_interval", deserialize_with = "deserialize_duration_ms")]
    pub sync_interval: Duration,
    /// Number of snapshots kept below the tip
    #[serde(default = "default_snapshot_depth")]
    pub snapshot_depth: BlockHeight,
    /// Number of recent quorums of each type asked for on every sync
    #[serde(default = "default_quorum_scan_count")]
    pub quorum_scan_count: usize,
    /// Number of polls for a recovered signature
    pub oracle_poll_attempts: Option<u32>,
    /// Pause between two polls (in ms)
    pub oracle_poll_interval_ms: Option<u64>,
    /// Masternodes asked to sign withdrawals
    #[serde(default, alias = "signer")]
    pub signers: Vec<Signer>,
}

impl Local {
    /// How to wait for recovered signatures.
    pub fn poll_config(&self) -> PollConfig {
        let default = PollConfig::default();
        PollConfig {
            max_attempts: self.oracle_poll_attempts.unwrap_or(default.max_attempts),
            interval: self.oracle_poll_interval_ms.map(Duration::from_millis).unwrap_or(default.interval),
        }
    }
}

/// The network whose consensus parameters are the starting point.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// The production network.
    Mainnet,
    /// Local regression test networks.
    Regtest,
}

impl Default for Network {
    fn default() -> Network {
        Network::Mainnet
    }
}

/// Consensus configuration: a network preset and any fields overriding it.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Consensus {
    /// The preset.
    #[serde(default)]
    pub network: Network,
    /// Overridden fields of [ConsensusParams].
    #[serde(flatten)]
    pub overrides: serde_json::Map<String, serde_json::Value>,
}

impl Default for Consensus {
    fn default() -> Consensus {
        Consensus {
            network: Network::default(),
            overrides: serde_json::Map::new(),
        }
    }
}

impl Consensus {
    /// The preset with all overrides applied.
    pub fn params(&self) -> Result<ConsensusParams, Error> {
        let preset = match self.network {
            Network::Mainnet => ConsensusParams::mainnet(),
            Network::Regtest => ConsensusParams::regtest(),
        };
        let mut value = serde_json::to_value(&preset)?;
        if let Some(map) = value.as_object_mut() {
            for (key, val) in &self.overrides {
                if !map.contains_key(key) {
                    return Err(Error::Consensus("unknown consensus parameter"));
                }
                map.insert(key.clone(), val.clone());
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Where tracking starts.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct Start {
    /// Height of the first tracked block
    pub height: BlockHeight,
    /// Its hash
    pub hash: BlockHash,
    /// Pool balance after it (in duffs)
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub balance: Amount,
}

impl Start {
    /// The first tracked block.
    pub fn block_ref(&self) -> BlockRef {
        BlockRef::new(self.height, self.hash)
    }
}

/// Global pool watcher settings structure
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Configuration {
    /// Local settings
    pub local: Local,
    /// Consensus settings
    #[serde(default)]
    pub consensus: Consensus,
    /// Starting point
    pub start: Start,
}

impl Configuration {
    /// Check the configuration and return the consensus parameters.
    pub fn sanity_check(&self) -> Result<ConsensusParams, Error> {
        let params = self.consensus.params()?;
        params.sanity_check().map_err(Error::Consensus)?;

        if self.local.snapshot_depth < params.unlock_expiry_blocks {
            return Err(Error::Local("snapshot_depth must cover the unlock expiry window"));
        }
        if self.local.quorum_scan_count < params.active_quorum_count {
            return Err(Error::Local("quorum_scan_count must cover the active quorums"));
        }
        if self.local.poll_config().max_attempts == 0 {
            return Err(Error::Local("oracle_poll_attempts must not be zero"));
        }
        let mut names = self.local.signers.iter().map(|s| &s.name).collect::<Vec<_>>();
        names.sort();
        names.dedup();
        if names.len() != self.local.signers.len() {
            return Err(Error::Local("signer names must be unique"));
        }
        Ok(params)
    }
}
