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


//! # Credit Pool Logs
//!
//! Every structured log line the credit pool ledger and its watcher emit.
//!

// Coding conventions
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

extern crate bitcoin;
extern crate jsonrpc;
#[macro_use] extern crate lazy_static;
extern crate serde;
#[macro_use] extern crate serde_derive;
extern crate serde_json;
extern crate time;

extern crate creditpool_common as common;

#[macro_use] pub mod log;
pub mod pool;
pub use self::pool::*;
pub mod io_log;
pub use self::io_log::*;
pub mod rpc;
pub use self::rpc::*;
pub mod log_codes;

use std::{fmt, io, sync, thread};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::ChainTip;

/// The log ID prefix for generic logs (I/O, RPC, throttling).
pub const ID_PREFIX_GENERIC: &str = "G";
/// The log ID prefix for credit pool logs.
pub const ID_PREFIX_CREDITPOOL: &str = "C";

#[derive(PartialEq, Eq, Hash, Debug, Clone)]
struct LogIndex {
    file_name: String,
    line_num: u32,
}

/// Emitted once per period for each log line that hit the emission limit.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Default)]
pub struct ThrottleCount<'a> {
    pub log_name: &'a str,
    pub log_id: &'a str,
    pub originating_file_name: &'a str,
    pub originating_line_number: u32,
    pub suppressed_count: u32,
}

impl<'a> Log for ThrottleCount<'a> {
    const SEVERITY: Severity = Severity::Warn;
    const LOG_ID: &'static str = "G-9999";

    fn desc(&self) -> &str {
        "suppressed log message"
    }
}

/// Structure representing global log context
pub struct GlobalContext {
    /// Handle to output writer.
    out: Box<dyn io::Write + Send>,
    /// Name of the running process
    name: &'static str,
    /// Minimum severity at which to output a log
    min_severity: Severity,
    /// Emissions per log line in the current period
    log_accounting: HashMap<LogIndex, u32>,
    /// Start of the current throttling period
    log_period_start: Instant,
    /// Length of a throttling period
    minimum_log_period: Duration,
    /// Maximum number of emissions of one log line per period
    log_emission_limit: u32,
}

lazy_static! {
    static ref GLOBAL_CONTEXT: sync::Mutex<GlobalContext> = sync::Mutex::new(
        GlobalContext {
            #[cfg(not(test))]
            out: Box::new(io::sink()),
            #[cfg(test)]
            out: Box::new(io::stdout()),
            name: "-",
            min_severity: Severity::Trace,
            log_accounting: HashMap::with_capacity(100),
            log_period_start: Instant::now(),
            minimum_log_period: Duration::from_millis(60000),
            log_emission_limit: 1000,
        }
    );

    static ref GLOBAL_CHAIN_TIP: sync::Mutex<ChainTip> = sync::Mutex::new(
        Default::default()
    );
}

/// Initialize the logging infrastructure
pub fn initialize(
    min_severity: Severity,
    log_period_ms: Option<u64>,
    log_emission_limit: Option<u32>,
    name: &'static str,
    out: Box<dyn io::Write + Send>,
) {
    let mut lock = GLOBAL_CONTEXT.lock().unwrap();
    lock.out = out;
    lock.name = name;
    lock.min_severity = min_severity;
    if let Some(value) = log_period_ms { lock.minimum_log_period = Duration::from_millis(value); }
    if let Some(value) = log_emission_limit { lock.log_emission_limit = value; }
}

/// The format string of the log timestamps.
pub const TIME_FORMAT: &str = "%F %T.%f%z";

fn serialize_time<S: serde::Serializer>(t: &time::Tm, s: S) -> Result<S::Ok, S::Error> {
    let tmfmt = t.strftime(TIME_FORMAT).map_err(serde::ser::Error::custom)?;
    s.collect_str(&tmfmt)
}

fn deserialize_time<'de, D>(d: D) -> Result<time::Tm, D::Error>
    where D: serde::Deserializer<'de>,
{
    struct TmVisitor;
    impl<'de> serde::de::Visitor<'de> for TmVisitor {
        type Value = time::Tm;
        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a timestamp")
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> where E: serde::de::Error {
            time::strptime(v, TIME_FORMAT).map_err(serde::de::Error::custom)
        }
    }
    d.deserialize_str(TmVisitor)
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Severity of the log
pub enum Severity {
    /// Trace message, very chatty
    Trace,
    /// Debugging information
    Debug,
    /// Standard operation information
    Info,
    /// Potential problem
    Warn,
    /// Actual problem
    Error,
    /// Serious problem for which the program should be terminated.
    /// Logging such an error will cause the program to terminate.
    Fatal,
}

impl Severity {
    /// Severity in uppercase.
    pub fn upper(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

/// A log line as written by this crate, for zero-copy reading of log files.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogMessage<'a> {
    #[serde(serialize_with = "serialize_time", deserialize_with = "deserialize_time")]
    pub time: time::Tm,
    pub process: &'a str,
    #[serde(default)]
    pub thread: Option<&'a str>,
    pub severity: Severity,
    pub log_id: &'a str,
    pub desc: &'a str,
    pub name: &'a str,
    pub file: &'a str,
    pub line: u32,
    #[serde(borrow)]
    pub context: &'a serde_json::value::RawValue,
    #[serde(borrow)]
    pub data: &'a serde_json::value::RawValue,
}

impl<'a> LogMessage<'a> {
    /// Parse the internal data, suggested to be used with explicit type parameter.
    pub fn parse<T: serde::Deserialize<'a>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.data.get())
    }

    /// Try interpret the log as the given log type.
    pub fn try_as<T: Log + serde::Deserialize<'a>>(&self) -> Option<T> {
        if self.log_id == T::LOG_ID {
            self.parse().ok()
        } else {
            None
        }
    }

    /// The chain tip the ledger was at when the line was written.
    pub fn chain_tip(&self) -> Result<ChainTip, serde_json::Error> {
        serde_json::from_str(self.context.get())
    }
}

/// Internal generic version of [LogMessage].
#[derive(Serialize)]
struct InternalLogMessage<'a, C: serde::Serialize + 'a, D: serde::Serialize + 'a> {
    // Must stay compatible with [LogMessage].
    #[serde(serialize_with = "serialize_time")]
    time: time::Tm,
    process: &'a str,
    thread: Option<&'a str>,
    severity: Severity,
    log_id: &'static str,
    desc: &'a str,
    name: &'a str,
    file: &'a str,
    line: u32,
    context: &'a C,
    data: &'a D,
}

/// Main log structure
pub trait Log: serde::Serialize + Sized {
    /// Severity level
    const SEVERITY: Severity;

    /// Unique log ID
    const LOG_ID: &'static str;

    /// Human-readable description
    fn desc(&self) -> &str;

    /// Write the log line to the given sink, bypassing filtering and throttling.
    fn log_inner<C>(&self, output_sink: &mut dyn io::Write,
        process: &str, file: &str, line: u32, name: &str, context: &C)
    where
        C: serde::Serialize,
    {
        debug_assert!(match &Self::LOG_ID[0..1] {
            ID_PREFIX_GENERIC => true,
            ID_PREFIX_CREDITPOOL => true,
            _ => false,
        });

        let current = thread::current();
        let msg = InternalLogMessage {
            time: time::now(),
            process: process,
            thread: current.name(),
            severity: Self::SEVERITY,
            log_id: Self::LOG_ID,
            desc: self.desc(),
            name: name,
            file: file,
            line: line,
            context: context,
            data: self,
        };
        // A broken log sink is not something we can report anywhere else.
        if serde_json::to_writer(&mut *output_sink, &msg).is_ok() {
            let _ = writeln!(output_sink);
        }
    }

    /// Output the log line
    fn log<C: serde::Serialize>(&self, file: &str, line: u32, name: &str, ctx: &C) {
        let mut gctx = GLOBAL_CONTEXT.lock().unwrap();
        let gctx = &mut *gctx;  // coach borrowck on individual fields resulting from MutexGuard

        if Self::SEVERITY < gctx.min_severity {
            return;
        }

        let accounting_index = LogIndex { file_name: file.to_string(), line_num: line };
        let count = gctx.log_accounting.entry(accounting_index).or_insert(0);
        *count += 1;
        if *count > gctx.log_emission_limit {
            return;
        }

        let process = gctx.name;

        if Instant::now() > gctx.log_period_start + gctx.minimum_log_period {
            for (index, count) in gctx.log_accounting.drain() {
                if count <= gctx.log_emission_limit {
                    continue;
                }
                let tc = ThrottleCount {
                    log_name: name,
                    log_id: Self::LOG_ID,
                    originating_file_name: &index.file_name,
                    originating_line_number: index.line_num,
                    suppressed_count: count - gctx.log_emission_limit,
                };
                tc.log_inner(&mut *gctx.out, process, file!(), line!(), "ThrottleCount", ctx);
            }

            gctx.log_period_start = Instant::now();
        }

        self.log_inner(&mut *gctx.out, process, file, line, name, ctx);

        assert!(Self::SEVERITY != Severity::Fatal,
            "fatal log was not called with slog_fatal: {}", Self::LOG_ID,
        );
    }

    /// Output the log line and abort the program
    fn log_fatal<C: serde::Serialize>(&self, file: &str, line: u32, name: &str, ctx: &C) -> ! {
        {
            let mut gctx = GLOBAL_CONTEXT.lock().unwrap();
            let gctx = &mut *gctx;
            let process = gctx.name;
            self.log_inner(&mut *gctx.out, process, file, line, name, ctx);
        }

        // Include log code in panic message to aid unit testing.
        panic!("Encountered fatal log {}.", Self::LOG_ID);
    }
}

/// Set the chain tip attached to every following log line.
pub fn set_chain_tip(tip: ChainTip) {
    *GLOBAL_CHAIN_TIP.lock().unwrap() = tip;
}

/// The chain tip attached to log lines.
pub fn get_chain_tip() -> ChainTip {
    *GLOBAL_CHAIN_TIP.lock().unwrap()
}

fn serialize_display<S: serde::Serializer>(
    d: impl fmt::Display,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(&d)
}

/// Obtain the filename of the source file a log is coming from,
/// with the long path stripped
#[macro_export]
macro_rules! filename {
    () => (file!().rsplit("creditpool/").next().unwrap_or(file!()))
}

/// Create a structured log.
///
/// Usage:
/// ```rust,ignore
/// slog!(ConnectBlock, height: 10, hash: hash, ...);
/// ```
#[macro_export]
macro_rules! slog {
    ($struct:ident) => {{
        $crate::Log::log(&$crate::$struct { }, $crate::filename!(), line!(), stringify!($struct), &$crate::get_chain_tip())
    }};
    ($struct:ident, $( $args:tt )*) => {{
        $crate::Log::log(&$crate::$struct {
            $( $args )*
        }, $crate::filename!(), line!(), stringify!($struct), &$crate::get_chain_tip())
    }};
}

/// Create a fatal structured log.
///
/// Usage similar to slog!.
#[macro_export]
macro_rules! slog_fatal {
    ($struct:ident, $( $args:tt )*) => {{
        $crate::Log::log_fatal(&$crate::$struct {
            $( $args )*
        }, $crate::filename!(), line!(), stringify!($struct), &$crate::get_chain_tip())
    }}
}

/// A free-form message from code without a dedicated log struct. Trace-level.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Default)]
pub struct LegacyUnconvertedLogTrace {
    /// Legacy output
    pub message: String,
}

/// A free-form message from code without a dedicated log struct. Debug-level.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Default)]
pub struct LegacyUnconvertedLogDebug {
    /// Legacy output
    pub message: String,
}

/// A free-form message from code without a dedicated log struct. Info-level.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Default)]
pub struct LegacyUnconvertedLogInfo {
    /// Legacy output
    pub message: String,
}

/// A free-form message from code without a dedicated log struct. Warn-level.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Default)]
pub struct LegacyUnconvertedLogWarn {
    /// Legacy output
    pub message: String,
}

/// A free-form message from code without a dedicated log struct. Error-level.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Default)]
pub struct LegacyUnconvertedLogError {
    /// Legacy output
    pub message: String,
}

/// A free-form message from code without a dedicated log struct. Fatal-level.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Default)]
pub struct LegacyUnconvertedLogFatal {
    /// Legacy output
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use bitcoin::hashes::Hash;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn log_line_roundtrip() {
        let buf = SharedBuf::default();
        let mut sink = buf.clone();
        let tip = ChainTip::new(12, bitcoin::BlockHash::all_zeros());
        let log = NewEpoch {
            epoch: 3,
            height: 1728,
            balance: 5_000,
            limit: 500,
        };
        log.log_inner(&mut sink, "unit_test", "src/ledger/mod.rs", 42, "NewEpoch", &tip);

        let bytes = buf.0.lock().unwrap().clone();
        let line = String::from_utf8(bytes).unwrap();
        assert!(line.ends_with('\n'));

        let msg: LogMessage = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(msg.log_id, <NewEpoch as Log>::LOG_ID);
        assert_eq!(msg.severity, Severity::Info);
        assert_eq!(msg.process, "unit_test");
        assert_eq!(msg.line, 42);
        assert_eq!(msg.chain_tip().unwrap(), tip);

        let parsed: NewEpoch = msg.try_as().unwrap();
        assert_eq!(parsed, log);
        assert!(msg.try_as::<LegacyUnconvertedLogInfo>().is_none());
    }

    #[test]
    fn chain_tip_context() {
        let tip = ChainTip::new(99, bitcoin::BlockHash::all_zeros());
        set_chain_tip(tip);
        assert_eq!(get_chain_tip(), tip);
        set_chain_tip(ChainTip::default());
    }
}
