//! Background loading of listing fixtures.

pub mod async_loader;

pub use async_loader::{AsyncLoader, LoadResult};
