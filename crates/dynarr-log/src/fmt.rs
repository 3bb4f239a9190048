use std::io::Write;

use termcolor::{ColorSpec, Color, WriteColor};

use compact_str::CompactString;

use dynarr_mem::{DynamicArray, Iter};

use crate::{Level, Result};

/// Layout of one log record, as an ordered list of segments.
#[derive(Default)]
pub struct LogFmt {
    segments: DynamicArray<SegmentSpec>,
}

impl LogFmt {

    /// The format installed for `level` by [`init`](crate::init):
    /// `[level] target: message`, with the level tag colored.
    pub fn for_level(level: Level) -> Result<Self> {
        let color = match level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Blue,
            Level::Trace => Color::Cyan,
        };
        let mut fmt = Self::default();
        LogFmtBuilder::new(&mut fmt)
            .text("[", |spec| spec)?
            .level(|spec| spec.with_color_spec(|c| { c.set_fg(Some(color)).set_bold(true); }))?
            .text("] ", |spec| spec)?
            .target(|spec| spec.with_color_spec(|c| { c.set_dimmed(true); }))?
            .text(": ", |spec| spec)?
            .message(|spec| spec)?;
        Ok(fmt)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn clear(&mut self) {
        self.segments.clear();
    }

    /// Writes one record followed by a newline.
    ///
    /// A colored segment always resets the color, even when writing it fails.
    pub fn write<W: WriteColor + ?Sized>(
        &self,
        out: &mut W,
        target: &str,
        level: Level,
        msg: core::fmt::Arguments,
    ) -> Result<()>
    {
        for segment in self {
            let log_spec = segment.spec();
            if let Some(color_spec) = &log_spec.color_spec {
                out.set_color(color_spec)?;
            }
            let written = match segment {
                SegmentSpec::Message(_) => write!(out, "{}", msg),
                SegmentSpec::Text(text, _) => out.write_all(text.as_bytes()),
                SegmentSpec::Target(_) => out.write_all(target.as_bytes()),
                SegmentSpec::Level(_) => out.write_all(level.name().as_bytes()),
            };
            if log_spec.color_spec.is_some() {
                out.reset()?;
            }
            written?;
        }
        out.write_all(b"\n")?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a LogFmt {

    type Item = &'a SegmentSpec;
    type IntoIter = Iter<'a, SegmentSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[derive(Default, Clone)]
pub struct LogSpec {
    pub color_spec: Option<ColorSpec>,
}

impl LogSpec {

    #[inline(always)]
    pub fn with_color_spec(mut self, f: impl FnOnce(&mut ColorSpec)) -> Self {
        let color_spec = self.color_spec.insert(ColorSpec::new());
        f(color_spec);
        self
    }
}

pub enum SegmentSpec {
    Message(LogSpec),
    Text(CompactString, LogSpec),
    Target(LogSpec),
    Level(LogSpec),
}

impl SegmentSpec {

    #[inline(always)]
    fn spec(&self) -> &LogSpec {
        match self {
            Self::Message(spec) | Self::Target(spec) | Self::Level(spec) => spec,
            Self::Text(_, spec) => spec,
        }
    }
}

/// Rebuilds a [`LogFmt`] from scratch, segment by segment.
pub struct LogFmtBuilder<'a> {
    fmt: &'a mut LogFmt,
}

impl<'a> LogFmtBuilder<'a> {

    #[inline(always)]
    pub fn new(fmt: &'a mut LogFmt) -> Self {
        fmt.clear();
        Self {
            fmt,
        }
    }

    #[inline(always)]
    pub fn message(&mut self, f: impl FnOnce(LogSpec) -> LogSpec) -> Result<&mut Self> {
        self.push(SegmentSpec::Message(f(Default::default())))
    }

    #[inline(always)]
    pub fn text(&mut self, text: &str, f: impl FnOnce(LogSpec) -> LogSpec) -> Result<&mut Self> {
        self.push(SegmentSpec::Text(CompactString::new(text), f(Default::default())))
    }

    #[inline(always)]
    pub fn target(&mut self, f: impl FnOnce(LogSpec) -> LogSpec) -> Result<&mut Self> {
        self.push(SegmentSpec::Target(f(Default::default())))
    }

    #[inline(always)]
    pub fn level(&mut self, f: impl FnOnce(LogSpec) -> LogSpec) -> Result<&mut Self> {
        self.push(SegmentSpec::Level(f(Default::default())))
    }

    fn push(&mut self, segment: SegmentSpec) -> Result<&mut Self> {
        self.fmt.segments.push_back(segment)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {

    use termcolor::Buffer;

    use super::*;

    fn render(fmt: &LogFmt, target: &str, level: Level, msg: core::fmt::Arguments) -> String {
        let mut out = Buffer::no_color();
        fmt.write(&mut out, target, level, msg).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn level_format_layout() {
        let fmt = LogFmt::for_level(Level::Warn).unwrap();
        let line = render(&fmt, "dynarr_alloc::arena", Level::Warn, format_args!("{} bytes left", 12));
        assert_eq!(line, "[warn] dynarr_alloc::arena: 12 bytes left\n");
    }

    #[test]
    fn builder_replaces_previous_segments() {
        let mut fmt = LogFmt::for_level(Level::Info).unwrap();
        LogFmtBuilder::new(&mut fmt)
            .message(|spec| spec).unwrap()
            .text(" <- ", |spec| spec).unwrap()
            .target(|spec| spec).unwrap();
        let line = render(&fmt, "app", Level::Info, format_args!("ready"));
        assert_eq!(line, "ready <- app\n");
    }

    /// Colored stream whose writes all fail.
    #[derive(Default)]
    struct Broken {
        colored: bool,
        resets: usize,
    }

    impl Write for Broken {

        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("stream closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl WriteColor for Broken {

        fn supports_color(&self) -> bool {
            true
        }

        fn set_color(&mut self, _spec: &ColorSpec) -> std::io::Result<()> {
            self.colored = true;
            Ok(())
        }

        fn reset(&mut self) -> std::io::Result<()> {
            self.colored = false;
            self.resets += 1;
            Ok(())
        }
    }

    #[test]
    fn failed_write_still_resets_color() {
        let mut fmt = LogFmt::default();
        LogFmtBuilder::new(&mut fmt)
            .level(|spec| spec.with_color_spec(|c| { c.set_fg(Some(Color::Red)); })).unwrap()
            .message(|spec| spec).unwrap();
        let mut out = Broken::default();
        let err = fmt.write(&mut out, "app", Level::Error, format_args!("lost")).unwrap_err();
        assert!(matches!(err, crate::LogError::Io(_)));
        assert!(!out.colored);
        assert_eq!(out.resets, 1);
    }

    #[test]
    fn empty_format_writes_bare_newline() {
        let fmt = LogFmt::default();
        assert!(fmt.is_empty());
        assert_eq!(render(&fmt, "app", Level::Error, format_args!("lost")), "\n");
    }
}
