//! # Builtin Nodes
//!
//! Reusable nodes for file-checksumming pipelines. Every node implements the
//! [`Node`](crate::node::Node) trait and treats an unwired port as "nothing to
//! do" rather than an error.
//!
//! ## Node Categories
//!
//! - **Sources**: [`FileWalker`], [`PathSource`], [`StdinSource`]
//! - **Transforms**: [`Md5Hasher`]
//! - **Routers**: [`Tee`]
//! - **Sinks**: [`FileSink`], [`Printer`]
//!
//! Nodes that run several workers share the [`pool`] helpers.

pub mod file_sink;
pub mod file_walker;
pub mod md5_hasher;
pub mod path_source;
pub mod pool;
pub mod printer;
pub mod stdin_source;
pub mod tee;

#[cfg(test)]
mod file_walker_test;
#[cfg(test)]
mod pool_test;
#[cfg(test)]
mod printer_test;

pub use file_sink::FileSink;
pub use file_walker::FileWalker;
pub use md5_hasher::Md5Hasher;
pub use path_source::PathSource;
pub use printer::Printer;
pub use stdin_source::StdinSource;
pub use tee::Tee;
