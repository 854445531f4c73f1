//! The pairing of soft constraints with the [`Indicator`](crate::variables::Indicator)s which
//! switch them on and off.
mod indicator_model;

pub use indicator_model::IndicatorModel;
