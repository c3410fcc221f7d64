use anyhow::Result;
use clap::Parser;
use log::info;

use crate::Opts;
use crate::cache::{CacheFacade, ClearTarget};
use crate::cli::SubCommandExtend;

#[derive(Parser, Debug, Clone)]
pub struct ClearCommand {
    /// 清理范围：all、color 或 media
    #[arg(long = "type", value_name = "TYPE", default_value = "all")]
    pub target: ClearTarget,
}

impl SubCommandExtend for ClearCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let cache = CacheFacade::new(opts.store.open().await?);
        let outcome = cache.clear(self.target).await?;
        match outcome.entries_cleared {
            Some(n) => info!("{}: 清理了 {n} 条缓存", outcome.message),
            None => info!("{}", outcome.message),
        }
        Ok(())
    }
}
