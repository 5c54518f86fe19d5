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

//! # Mempool and block assembly logs
//!

use bitcoin::Txid;

/// A transaction entered the pending pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct MempoolAccept {
    /// The transaction.
    pub txid: Txid,
    /// Its special transaction type.
    pub tx_type: u16,
    /// Pool size after insertion.
    pub size: usize,
}

/// A transaction was refused by the pending pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct MempoolReject<'a> {
    /// The transaction.
    pub txid: Txid,
    /// The reject reason.
    pub reason: &'a str,
}

/// A pending unlock can never be mined any more and was dropped.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct MempoolExpire<'a> {
    /// The transaction.
    pub txid: Txid,
    /// Why it can no longer be mined.
    pub reason: &'a str,
}

/// A pending transaction was left out of a block template.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SkipTemplateTx<'a> {
    /// The transaction.
    pub txid: Txid,
    /// Height of the template.
    pub height: u64,
    /// Why it does not fit.
    pub reason: &'a str,
}
