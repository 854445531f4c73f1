use std::fmt::Display;

use itertools::Itertools;

use super::statistic_logging::log_statistic;

/// Names statistics after the component which owns them.
///
/// A logger is a path of name segments, e.g. `explainer` → `extractor` → `num_oracle_calls`, which
/// is joined with underscores when a statistic is written.
#[derive(Debug, Default, Clone)]
pub struct StatisticLogger {
    segments: Vec<String>,
}

impl StatisticLogger {
    pub fn new(segments: impl IntoIterator<Item = impl Display>) -> Self {
        StatisticLogger {
            segments: segments.into_iter().map(|segment| segment.to_string()).collect(),
        }
    }

    /// A logger for the statistics of a part of this logger's component.
    pub fn attach_to_prefix(&self, segment: impl Display) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        StatisticLogger { segments }
    }

    pub fn log_statistic(&self, value: impl Display) {
        log_statistic(self.segments.iter().join("_"), value);
    }
}
