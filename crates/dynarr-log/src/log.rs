use std::sync::OnceLock;

use core::{
    fmt::Write as _,
    str::FromStr,
};

use termcolor::{StandardStream, ColorChoice, WriteColor};

pub use termcolor::{ColorSpec, Color};

use rustc_hash::FxHashMap;

use compact_str::CompactString;

use parking_lot::Mutex;

use paste::paste;

use crate::*;

/// Environment variable read by [`init`].
pub const FILTER_ENV: &str = "RUST_LOG";

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {

    #[inline(always)]
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Level {

    type Err = ();

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("error") {
            Ok(Self::Error)
        } else if s.eq_ignore_ascii_case("warn") {
            Ok(Self::Warn)
        } else if s.eq_ignore_ascii_case("info") {
            Ok(Self::Info)
        } else if s.eq_ignore_ascii_case("debug") {
            Ok(Self::Debug)
        } else if s.eq_ignore_ascii_case("trace") {
            Ok(Self::Trace)
        } else {
            Err(())
        }
    }
}

/// Maximum level per target, parsed from a `RUST_LOG` style string.
///
/// The string is a comma separated list of `level` or `target=level` entries. A bare
/// level sets the base level, which starts at [`Level::Error`]. A target matches itself
/// and every module below it; the longest matching target wins. Unknown levels are
/// ignored, and a target listed twice keeps the less verbose level.
#[derive(Clone, Debug)]
pub struct Filters {
    targets: FxHashMap<CompactString, Level>,
    base: Level,
}

impl Default for Filters {

    fn default() -> Self {
        Self {
            targets: FxHashMap::default(),
            base: Level::Error,
        }
    }
}

impl Filters {

    pub fn parse(spec: &str) -> Self {
        let mut filters = Self::default();
        for arg in spec.split(',') {
            let (target, level) = match arg.find('=') {
                Some(j) => (Some(arg[..j].trim()), arg[j + 1..].trim()),
                None => (None, arg.trim()),
            };
            let Ok(level) = Level::from_str(level) else {
                continue
            };
            match target {
                Some(target) if !target.is_empty() => {
                    let entry = filters.targets
                        .entry(CompactString::new(target))
                        .or_insert(level);
                    *entry = (*entry).min(level);
                },
                _ => filters.base = level,
            }
        }
        filters
    }

    pub fn from_env() -> Self {
        match std::env::var(FILTER_ENV) {
            Ok(spec) => Self::parse(&spec),
            Err(_) => Self::default(),
        }
    }

    #[inline(always)]
    pub fn base_level(&self) -> Level {
        self.base
    }

    pub fn level_for(&self, target: &str) -> Level {
        let mut substr = target;
        if let Some(&level) = self.targets.get(substr) {
            return level
        }
        while let Some(i) = substr.rfind("::") {
            substr = &substr[0..i];
            if let Some(&level) = self.targets.get(substr) {
                return level
            }
        }
        self.base
    }

    #[inline(always)]
    pub fn enabled(&self, target: &str, level: Level) -> bool {
        level <= self.level_for(target)
    }
}

/// Filters plus one [`LogFmt`] per level.
pub struct LogConfig {
    filters: Filters,
    fmts: [LogFmt; 5],
}

impl LogConfig {

    pub fn new(filters: Filters) -> Result<Self> {
        Ok(Self {
            filters,
            fmts: [
                LogFmt::for_level(Level::Error)?,
                LogFmt::for_level(Level::Warn)?,
                LogFmt::for_level(Level::Info)?,
                LogFmt::for_level(Level::Debug)?,
                LogFmt::for_level(Level::Trace)?,
            ],
        })
    }

    #[inline(always)]
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    #[inline(always)]
    pub fn fmt_mut(&mut self, level: Level) -> LogFmtBuilder<'_> {
        LogFmtBuilder::new(&mut self.fmts[level.index()])
    }

    /// Writes the record if `target` lets `level` through, returning whether it did.
    pub fn write<W: WriteColor + ?Sized>(
        &self,
        out: &mut W,
        target: &str,
        level: Level,
        msg: core::fmt::Arguments,
    ) -> Result<bool>
    {
        if !self.filters.enabled(target, level) {
            return Ok(false)
        }
        self.fmts[level.index()].write(out, target, level, msg)?;
        Ok(true)
    }
}

struct Logger {
    out: Box<dyn WriteColor + Send>,
    config: LogConfig,
}

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

/// Installs the global logger, filtered by the [`FILTER_ENV`] variable.
///
/// Does nothing if a logger is already installed.
pub fn init() -> Result<()> {
    if LOGGER.get().is_some() { return Ok(()) }
    init_with_filters(Filters::from_env())
}

pub fn init_with_filters(filters: Filters) -> Result<()> {
    init_with_writer(filters, StandardStream::stderr(ColorChoice::Auto))
}

/// Installs the global logger writing to `out` instead of stderr.
pub fn init_with_writer(filters: Filters, out: impl WriteColor + Send + 'static) -> Result<()> {
    if LOGGER.get().is_some() { return Ok(()) }
    let logger = Logger {
        out: Box::new(out),
        config: LogConfig::new(filters)?,
    };
    let _ = LOGGER.set(Mutex::new(logger));
    Ok(())
}

#[inline(always)]
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

fn set_fmt(level: Level, f: impl FnOnce(&mut LogFmtBuilder) -> Result<()>) -> Result<()> {
    let mut logger = LOGGER
        .get()
        .ok_or(LogError::NotInitialized)?
        .lock();
    let mut builder = logger.config.fmt_mut(level);
    f(&mut builder)
}

macro_rules! level_fmt {
    ($($level:ident),+ $(,)?) => {
        paste! {
            $(
                #[inline(always)]
                pub fn [<$level:lower _fmt>](
                    f: impl FnOnce(&mut LogFmtBuilder) -> Result<()>,
                ) -> Result<()>
                {
                    set_fmt(Level::$level, f)
                }
            )+
        }
    };
}

level_fmt!(Error, Warn, Info, Debug, Trace);

/// Returns whether a record for `target` at `level` would be written.
pub fn enabled(target: &str, level: Level) -> bool {
    match LOGGER.get() {
        Some(logger) => logger.lock().config.filters.enabled(target, level),
        None => false,
    }
}

/// Writes a record through the global logger.
///
/// Before [`init`] this is a no-op returning `Ok(false)`. `args` is formatted before the
/// logger is locked, so `Display` impls may log themselves.
pub fn log(target: &str, level: Level, args: core::fmt::Arguments) -> Result<bool> {
    let Some(logger) = LOGGER.get() else {
        return Ok(false)
    };
    if !logger.lock().config.filters.enabled(target, level) {
        return Ok(false)
    }
    let mut msg = CompactString::default();
    msg.write_fmt(args)?;
    let mut logger = logger.lock();
    let Logger { out, config } = &mut *logger;
    config.write(&mut **out, target, level, format_args!("{}", msg))
}

#[macro_export]
macro_rules! error {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::log(module_path!(), $crate::Level::Error, format_args!($fmt, $($arg),*))
            .unwrap_or(false)
    };
}

#[macro_export]
macro_rules! warn {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::log(module_path!(), $crate::Level::Warn, format_args!($fmt, $($arg),*))
            .unwrap_or(false)
    };
}

#[macro_export]
macro_rules! info {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::log(module_path!(), $crate::Level::Info, format_args!($fmt, $($arg),*))
            .unwrap_or(false)
    };
}

#[macro_export]
macro_rules! debug {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::log(module_path!(), $crate::Level::Debug, format_args!($fmt, $($arg),*))
            .unwrap_or(false)
    };
}

#[macro_export]
macro_rules! trace {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::log(module_path!(), $crate::Level::Trace, format_args!($fmt, $($arg),*))
            .unwrap_or(false)
    };
}
