//! Containers which are indexed by strongly typed keys, such as
//! [`Indicator`](crate::variables::Indicator).
mod keyed_vec;

pub use keyed_vec::KeyedVec;
pub use keyed_vec::StorageKey;
