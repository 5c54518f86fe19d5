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


//! # Simple Log
//! Free-form logging for messages that have no structured log yet.
//!

use std::fmt;

use crate::{
    get_chain_tip, Log, Severity, LegacyUnconvertedLogDebug, LegacyUnconvertedLogError,
    LegacyUnconvertedLogFatal, LegacyUnconvertedLogInfo, LegacyUnconvertedLogTrace,
    LegacyUnconvertedLogWarn,
};

/// The main logging function
///
/// The file and line come from the macro call site, so the log name is left empty.
pub fn log<T: fmt::Display>(file: &str, line: u32, level: Severity, message: &T) {
    let message = message.to_string();
    let ctx = get_chain_tip();
    match level {
        Severity::Trace => LegacyUnconvertedLogTrace { message }.log(file, line, "", &ctx),
        Severity::Debug => LegacyUnconvertedLogDebug { message }.log(file, line, "", &ctx),
        Severity::Info => LegacyUnconvertedLogInfo { message }.log(file, line, "", &ctx),
        Severity::Warn => LegacyUnconvertedLogWarn { message }.log(file, line, "", &ctx),
        Severity::Error => LegacyUnconvertedLogError { message }.log(file, line, "", &ctx),
        Severity::Fatal => LegacyUnconvertedLogFatal { message }.log_fatal(file, line, "", &ctx),
    }
}

/// Macro that infers the file and line number.
#[macro_export]
macro_rules! log {
    ($level:ident, $($arg:tt)+) => ({
        $crate::log::log($crate::filename!(), line!(), $crate::Severity::$level, &format_args!($($arg)+))
    })
}

/// trace!() macro that infers the file and line number.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => ({
        $crate::log::log($crate::filename!(), line!(), $crate::Severity::Trace, &format_args!($($arg)+))
    })
}

/// debug!() macro that infers the file and line number.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => ({
        $crate::log::log($crate::filename!(), line!(), $crate::Severity::Debug, &format_args!($($arg)+))
    })
}

/// info!() macro that infers the file and line number.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => ({
        $crate::log::log($crate::filename!(), line!(), $crate::Severity::Info, &format_args!($($arg)+))
    })
}

// Anything that merits a warning or worse should get its own struct and go through slog!().

/// `?` equivalent that logs the error before returning it.
#[macro_export]
macro_rules! log_try {
    ($level:ident, $e:expr) => ({
        match $e {
            Ok(res) => res,
            Err(e) => {
                $crate::log::log($crate::filename!(), line!(), $crate::Severity::$level, &e);
                return Err(From::from(e));
            }
        }
    })
}
