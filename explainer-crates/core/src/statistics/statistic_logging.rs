//! The process-wide destination of statistics.
//!
//! Statistics are written as `{prefix} {name}={value}` lines, for example `c STAT numCalls=4`, so
//! that they can be told apart from the regular output of a program. Nothing is written until
//! [`configure_statistic_logging`] has been called.

use std::fmt::Display;
use std::io::Write;
use std::sync::Mutex;
use std::sync::OnceLock;

use convert_case::Case;
use convert_case::Casing;
use log::debug;
use log::warn;

struct StatisticSink {
    prefix: &'static str,
    /// Written by [`log_statistic_postfix`] after a block of statistics.
    postfix: Option<&'static str>,
    casing: Option<Case>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StatisticSink {
    fn write_line(&self, line: impl Display) {
        let Ok(mut writer) = self.writer.lock() else {
            debug!("The statistic writer is poisoned, dropping '{line}'");
            return;
        };

        if let Err(e) = writeln!(writer, "{line}") {
            debug!("Could not write statistic: {e}");
        }
    }
}

static SINK: OnceLock<StatisticSink> = OnceLock::new();

/// Enables statistic logging; statistics are written to `writer`, or to stdout if it is [`None`].
///
/// Only the first call has an effect.
pub fn configure_statistic_logging(
    prefix: &'static str,
    postfix: Option<&'static str>,
    casing: Option<Case>,
    writer: Option<Box<dyn Write + Send>>,
) {
    let sink = StatisticSink {
        prefix,
        postfix,
        casing,
        writer: Mutex::new(writer.unwrap_or_else(|| Box::new(std::io::stdout()))),
    };

    if SINK.set(sink).is_err() {
        warn!("Statistic logging was already configured");
    }
}

/// Writes the statistic `name` with the given value, if statistic logging is configured.
pub fn log_statistic(name: impl Display, value: impl Display) {
    let Some(sink) = SINK.get() else {
        return;
    };

    let name = match sink.casing {
        Some(casing) => name.to_string().to_case(casing),
        None => name.to_string(),
    };
    sink.write_line(format_args!("{} {name}={value}", sink.prefix));
}

/// Closes a block of statistics with the configured postfix line, if there is one.
pub fn log_statistic_postfix() {
    if let Some(sink) = SINK.get() {
        if let Some(postfix) = sink.postfix {
            sink.write_line(postfix);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::statistics::Statistic;
    use crate::statistics::StatisticLogger;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("not poisoned").write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn statistics_are_written_with_prefix_and_casing() {
        let buffer = SharedBuffer::default();
        configure_statistic_logging(
            "c STAT",
            Some("c END"),
            Some(Case::Camel),
            Some(Box::new(buffer.clone())),
        );

        crate::create_statistics_struct!(Counts { num_calls: usize });
        let counts = Counts { num_calls: 4 };
        counts.log(StatisticLogger::new(["unit"]).attach_to_prefix("test"));
        log_statistic_postfix();

        let written = String::from_utf8(buffer.0.lock().expect("not poisoned").clone())
            .expect("statistics are valid utf8");
        assert!(written.contains("c STAT unitTestNumCalls=4\n"));
        assert!(written.contains("c END\n"));
    }
}
