//! The variables over which the explanation algorithms search: the [`Indicator`]s which switch
//! soft constraints on and off, and [`Literal`]s over them.
mod indicator;
mod literal;

pub use indicator::Indicator;
pub use literal::Literal;
