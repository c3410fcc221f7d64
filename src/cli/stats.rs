use anyhow::Result;
use clap::Parser;

use crate::Opts;
use crate::cache::CacheFacade;
use crate::cli::SubCommandExtend;

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let cache = CacheFacade::new(opts.store.open().await?);
        let stats = cache.stats().await?;
        println!("color: {}", stats.color);
        println!("media: {}", stats.media);
        println!("total: {}", stats.total);
        Ok(())
    }
}
