use anyhow::Result;
use clap::Parser;
use log::info;

use crate::Opts;
use crate::cache::CacheFacade;
use crate::cli::SubCommandExtend;

#[derive(Parser, Debug, Clone)]
pub struct LookupCommand {
    /// 6 位十六进制颜色，可以带 `#`
    pub color: String,
}

impl SubCommandExtend for LookupCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let cache = CacheFacade::new(opts.store.open().await?);
        match cache.lookup(&self.color).await? {
            Some(uri) => println!("{uri}"),
            None => info!("颜色 {} 还没有索引", self.color),
        }
        Ok(())
    }
}
