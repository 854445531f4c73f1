//! Counters kept by the explanation algorithms and the oracles.
//!
//! Every component keeps a small struct of counters (see [`create_statistics_struct!`]) and offers
//! a `log_statistics` method, which writes them through a [`StatisticLogger`] carrying the name of
//! the component. Nothing is written unless [`configure_statistic_logging`] has been called.
mod statistic_logger;
mod statistic_logging;

use std::fmt::Display;

pub use statistic_logger::StatisticLogger;
pub use statistic_logging::configure_statistic_logging;
pub use statistic_logging::log_statistic;
pub use statistic_logging::log_statistic_postfix;

/// Something which can be written out as one or more statistics.
///
/// Plain values are written under the name of the logger; structs created with
/// [`create_statistics_struct!`] write every field under its own name.
pub trait Statistic {
    fn log(&self, statistic_logger: StatisticLogger);
}

impl<Value: Display> Statistic for Value {
    fn log(&self, statistic_logger: StatisticLogger) {
        statistic_logger.log_statistic(self);
    }
}

/// Declares a struct of counters, which derives [`Default`] and implements [`Statistic`] by
/// logging every field under its own name.
///
/// # Example
/// ```rust
/// # use explainer_core::create_statistics_struct;
/// create_statistics_struct!(
///     /// Counts the work done by a search.
///     SearchStatistics {
///         num_nodes: usize,
///         /// Only counts failures below the root.
///         num_failures: u64,
///     }
/// );
///
/// let mut statistics = SearchStatistics::default();
/// statistics.num_nodes += 3;
///
/// assert_eq!((statistics.num_nodes, statistics.num_failures), (3, 0));
/// ```
#[macro_export]
macro_rules! create_statistics_struct {
    (
        $(#[$attribute:meta])*
        $name:ident {
            $($(#[$field_attribute:meta])* $field:ident : $type:ident),+ $(,)?
        }
    ) => {
        $(#[$attribute])*
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $name {
            $($(#[$field_attribute])* pub $field: $type,)+
        }

        impl $crate::statistics::Statistic for $name {
            fn log(&self, statistic_logger: $crate::statistics::StatisticLogger) {
                $(
                    $crate::statistics::Statistic::log(
                        &self.$field,
                        statistic_logger.attach_to_prefix(stringify!($field)),
                    );
                )+
            }
        }
    };
}
