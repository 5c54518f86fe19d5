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


//! # Pool Watcher
//!
//! Follows a Dash node and keeps the credit pool ledger on its best chain
//!

// Coding conventions
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

// External libs
extern crate toml;

#[macro_use]
extern crate creditpool_logs as logs;
extern crate creditpool;

use std::{env, fs, io};

use creditpool::config::Configuration;
use creditpool::follower::PoolWatcher;
use creditpool::rpc::Dash;

fn main() {
    let args: Vec<_> = env::args().collect();
    if args.len() != 2 {
        println!("Usage: {} <datadir>", args[0]);
        return;
    }
    let datadir = &args[1];

    let mut config_path = datadir.clone();
    config_path.push_str("/config.toml");
    let s = match fs::read_to_string(&config_path) {
        Ok(s) => s,
        Err(e) => panic!(
            "Failed to open configuration file {}: {}",
            config_path,
            e
        ),
    };
    let config: Configuration = match toml::from_str(&s) {
        Ok(config) => config,
        Err(e) => panic!(
            "Failed to parse configuration file {}: {}",
            config_path,
            e,
        ),
    };
    logs::initialize(
        config.local.log_level,
        config.local.log_period_ms,
        config.local.log_max_instance_per_period,
        "poolwatcher",
        Box::new(io::stderr()),
    );
    slog!(StartingPoolWatcher, version: env!("CARGO_PKG_VERSION"), datadir: &datadir[..],
        start_height: config.start.height, start_hash: config.start.hash,
    );

    if let Err(e) = run(config, datadir) {
        panic!("Failed to start pool watcher: {}", e);
    }
}

fn run(config: Configuration, datadir: &str) -> Result<(), creditpool::Error> {
    let params = config.sanity_check()?;
    let dashd = Dash::new(
        "dashd".to_owned(),
        &config.local.dashd_rpc_url,
        config.local.dashd_rpc_user.clone(),
        config.local.dashd_rpc_pass.clone(),
    )?;

    let mut watcher = PoolWatcher::new(dashd, params, &config.local, &config.start, datadir);
    watcher.startup();
    watcher.run()
}
