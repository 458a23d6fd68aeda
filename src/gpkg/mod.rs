pub mod blob;
pub mod error;
#[cfg(test)]
pub(crate) mod fixture;
pub mod functions;
pub mod sqlite;

pub use sqlite::GpkgStorage;
