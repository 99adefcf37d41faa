#![forbid(unsafe_code)]

//! `tracing` output routed to the browser console.
//!
//! Each formatted event is buffered and handed to a [`ConsoleSink`] in one
//! piece when the writer drops, tagged with the console method matching its
//! level.

use std::io;

use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

/// Prefix on every console line.
pub const LOG_PREFIX: &str = "[panda-menu]";

/// Console method a line goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

impl ConsoleLevel {
    #[must_use]
    pub fn for_level(level: &Level) -> Self {
        if *level == Level::ERROR {
            Self::Error
        } else if *level == Level::WARN {
            Self::Warn
        } else {
            Self::Log
        }
    }
}

/// Destination for finished lines.
pub trait ConsoleSink {
    fn emit(&self, level: ConsoleLevel, line: &str);
}

/// [`MakeWriter`] producing one [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMakeWriter<S> {
    sink: S,
}

impl<S> ConsoleMakeWriter<S> {
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<'a, S: ConsoleSink + Clone + 'a> MakeWriter<'a> for ConsoleMakeWriter<S> {
    type Writer = ConsoleWriter<S>;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(self.sink.clone(), ConsoleLevel::Log)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(self.sink.clone(), ConsoleLevel::for_level(meta.level()))
    }
}

/// Buffers one event; emits on drop.
#[derive(Debug)]
pub struct ConsoleWriter<S: ConsoleSink> {
    sink: S,
    level: ConsoleLevel,
    buf: Vec<u8>,
}

impl<S: ConsoleSink> ConsoleWriter<S> {
    fn new(sink: S, level: ConsoleLevel) -> Self {
        Self {
            sink,
            level,
            buf: Vec::new(),
        }
    }
}

impl<S: ConsoleSink> io::Write for ConsoleWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ConsoleSink> Drop for ConsoleWriter<S> {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim_end();
        if text.is_empty() {
            return;
        }
        self.sink.emit(self.level, &format!("{LOG_PREFIX} {text}"));
    }
}

/// fmt subscriber writing to `sink`: no ANSI, no timestamps, no targets.
pub fn subscriber<S>(sink: S, max_level: Level) -> impl Subscriber + Send + Sync + 'static
where
    S: ConsoleSink + Clone + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter::new(sink))
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(max_level)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<(ConsoleLevel, String)>>>);

    impl ConsoleSink for Capture {
        fn emit(&self, level: ConsoleLevel, line: &str) {
            self.0.lock().unwrap().push((level, line.to_owned()));
        }
    }

    #[test]
    fn events_route_by_level_with_prefix() {
        let capture = Capture::default();
        tracing::subscriber::with_default(subscriber(capture.clone(), Level::INFO), || {
            tracing::info!("panda menu mounted");
            tracing::warn!(selector = "#logo", "could not find element");
            tracing::error!("mount failed");
            tracing::debug!("filtered out");
        });

        let lines = capture.0.lock().unwrap().clone();
        let levels: Vec<ConsoleLevel> = lines.iter().map(|(level, _)| *level).collect();
        assert_eq!(
            levels,
            vec![ConsoleLevel::Log, ConsoleLevel::Warn, ConsoleLevel::Error]
        );
        assert!(lines.iter().all(|(_, line)| line.starts_with("[panda-menu] ")));
        assert!(lines[1].1.contains("could not find element"));
        assert!(lines[1].1.contains("selector=\"#logo\""));
        assert!(!lines[0].1.contains('\u{1b}'));
    }

    #[test]
    fn empty_writes_emit_nothing() {
        let capture = Capture::default();
        drop(ConsoleMakeWriter::new(capture.clone()).make_writer());
        assert!(capture.0.lock().unwrap().is_empty());
    }
}
