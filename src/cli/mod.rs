mod build;
mod clear;
mod ingest;
mod lookup;
mod server;
mod slice;
mod stats;

pub use build::*;
pub use clear::*;
pub use ingest::*;
pub use lookup::*;
pub use server::*;
pub use slice::*;
pub use stats::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
