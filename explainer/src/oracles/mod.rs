//! Reference implementations of the oracle traits of [`explainer_core::oracle`].
mod clause_oracle;
mod finite_domain;

pub use clause_oracle::ClauseOracle;
pub use clause_oracle::ClauseOracleStatistics;
pub use finite_domain::FiniteDomainOracle;
pub use finite_domain::FiniteDomainStatistics;
