pub mod cache;
pub mod cli;
pub mod color;
pub mod config;
pub mod index;
pub mod library;
pub mod media;
mod metrics;
mod server;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use index::{ColorIndex, IndexBuilder};
