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


//! # Global table of all log codes
//!

use crate::pool::*;
use crate::io_log::*;
use crate::rpc::*;

use crate::LegacyUnconvertedLogTrace;
use crate::LegacyUnconvertedLogDebug;
use crate::LegacyUnconvertedLogInfo;
use crate::LegacyUnconvertedLogWarn;
use crate::LegacyUnconvertedLogError;
use crate::LegacyUnconvertedLogFatal;

macro_rules! impl_log(
    ($log_id:expr, $level:ident, $struct:ident, $desc:expr) => {
        impl $crate::Log for $struct {
            const SEVERITY: $crate::Severity = $crate::Severity::$level;
            const LOG_ID: &'static str = $log_id;

            fn desc(&self) -> &str {
                $desc
            }
        }
    };
    ($log_id:expr, $level:ident, $struct:ident<$($lt:tt),*>, $desc:expr) => {
        impl<$($lt),*> $crate::Log for $struct<$($lt),*> {
            const SEVERITY: $crate::Severity = $crate::Severity::$level;
            const LOG_ID: &'static str = $log_id;

            fn desc(&self) -> &str {
                $desc
            }
        }
    };
);

// Ledger
impl_log!("C-L000", Info, PoolStatus, "pool status");
impl_log!("C-L001", Debug, ConnectBlock, "connect block");
impl_log!("C-L002", Info, DisconnectBlock, "disconnect block");
impl_log!("C-L003", Warn, RejectBlock<'a>, "reject block");
impl_log!("C-L010", Debug, CreditAssetLock, "credit asset lock");
impl_log!("C-L011", Debug, DebitAssetUnlock, "debit asset unlock");
impl_log!("C-L012", Debug, PlatformReward, "credit platform reward");
impl_log!("C-L020", Info, NewEpoch, "new withdrawal epoch");
impl_log!("C-L021", Warn, WithdrawalLimitReached, "withdrawal limit reached");
impl_log!("C-L030", Debug, PruneSnapshots, "prune snapshots");
impl_log!("C-L800", Error, CoinbaseBalanceMismatch, "coinbase balance mismatch");
impl_log!("C-L900", Fatal, UndoNonTipBlock, "undo of a block that is not the tip");
impl_log!("C-L901", Fatal, DeepReorg, "reorg deeper than retained snapshots");

// Quorums and signing
impl_log!("C-O000", Debug, RegisterQuorum, "register quorum");
impl_log!("C-O001", Debug, SelectQuorum, "select quorum");
impl_log!("C-O002", Info, RequestSignature, "request signature");
impl_log!("C-O003", Trace, SignaturePending, "signature pending");
impl_log!("C-O004", Info, RecoveredSignature, "recovered signature");
impl_log!("C-O005", Debug, PruneQuorums, "prune quorums");
impl_log!("C-O800", Warn, SignerUnavailable<'a>, "signer unavailable");
impl_log!("C-O900", Error, SignatureTimeout, "signature timeout");

// Mempool and block assembly
impl_log!("C-M000", Debug, MempoolAccept, "mempool accept");
impl_log!("C-M001", Info, MempoolReject<'a>, "mempool reject");
impl_log!("C-M002", Debug, MempoolExpire<'a>, "mempool expire");
impl_log!("C-M010", Debug, SkipTemplateTx<'a>, "skip tx in block template");

// Pool watcher
impl_log!("C-W000", Info, StartingPoolWatcher<'a>, "starting pool watcher");
impl_log!("C-W001", Info, SyncStatus, "sync status");
impl_log!("C-W002", Warn, ReorgDetected, "reorg detected");
impl_log!("C-W010", Debug, SaveLedgerCache<'a>, "save ledger cache");
impl_log!("C-W011", Info, NoLedgerCache<'a>, "no ledger cache");
impl_log!("C-W012", Error, CorruptLedgerCache<'a>, "corrupt ledger cache");
impl_log!("C-W900", Fatal, DivergentBlock<'a>, "node accepted a block we reject");
impl_log!("C-W901", Fatal, BalanceAuditMismatch, "node balance differs from ours");

// I/O
impl_log!("G-IO80", Warn, ReadFailed<'a>, "read failed");
impl_log!("G-IO81", Warn, WriteFailed<'a>, "write failed");
impl_log!("G-IO82", Warn, CreateFailed<'a>, "create failed");
impl_log!("G-IO83", Warn, MoveFailed<'a>, "move/rename failed");

// RPC
impl_log!("G-R001", Info, WarmingUp<'a>, "warming up");
impl_log!("G-R002", Info, WarmedUp<'a>, "warmed up");
impl_log!("G-R003", Trace, RpcRequest<'a>, "RPC request");
impl_log!("G-R004", Debug, RpcResponse<'a>, "RPC response");
impl_log!("G-R005", Trace, RpcResultTrace<'a>, "result portion of RPC response");
impl_log!("G-R900", Error, Error<'a, 'b>, "rpc error");

impl_log!("G-L000", Trace, LegacyUnconvertedLogTrace, "legacy log");
impl_log!("G-L001", Debug, LegacyUnconvertedLogDebug, "legacy log");
impl_log!("G-L002", Info, LegacyUnconvertedLogInfo, "legacy log");
impl_log!("G-L003", Warn, LegacyUnconvertedLogWarn, "legacy log");
impl_log!("G-L004", Error, LegacyUnconvertedLogError, "legacy log");
impl_log!("G-L005", Fatal, LegacyUnconvertedLogFatal, "legacy log");

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::Log;
    use super::*;

    macro_rules! ids {
        ($($struct:ty),* $(,)?) => {
            vec![$(<$struct as Log>::LOG_ID),*]
        };
    }

    #[test]
    fn log_ids_are_unique() {
        let ids = ids![
            PoolStatus, ConnectBlock, DisconnectBlock, RejectBlock<'static>, CreditAssetLock,
            DebitAssetUnlock, PlatformReward, NewEpoch, WithdrawalLimitReached, PruneSnapshots,
            CoinbaseBalanceMismatch, UndoNonTipBlock, DeepReorg, RegisterQuorum, SelectQuorum,
            RequestSignature, SignaturePending, RecoveredSignature, PruneQuorums,
            SignerUnavailable<'static>,
            SignatureTimeout, MempoolAccept, MempoolReject<'static>, MempoolExpire<'static>,
            SkipTemplateTx<'static>, StartingPoolWatcher<'static>, SyncStatus, ReorgDetected,
            SaveLedgerCache<'static>, NoLedgerCache<'static>, CorruptLedgerCache<'static>,
            DivergentBlock<'static>, BalanceAuditMismatch, ReadFailed<'static>,
            WriteFailed<'static>, CreateFailed<'static>, MoveFailed<'static>,
            WarmingUp<'static>, WarmedUp<'static>, RpcRequest<'static>, RpcResponse<'static>,
            RpcResultTrace<'static>, Error<'static, 'static>,
            LegacyUnconvertedLogTrace, LegacyUnconvertedLogDebug, LegacyUnconvertedLogInfo,
            LegacyUnconvertedLogWarn, LegacyUnconvertedLogError, LegacyUnconvertedLogFatal,
        ];
        let unique = ids.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), ids.len());
    }
}
