// Adapters layer: concrete implementations of the domain ports for external systems.

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod storage;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSink;
pub use storage::LocalStorage;
