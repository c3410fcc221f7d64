use anyhow::Result;
use clap::Parser;

use crate::Opts;
use crate::cache::{CacheFacade, Namespace};
use crate::cli::SubCommandExtend;

#[derive(Parser, Debug, Clone)]
pub struct SliceCommand {
    /// 缓存类型：color 或 media
    #[arg(long = "type", value_name = "TYPE", default_value = "color")]
    pub namespace: Namespace,
    /// 跳过的数量
    #[arg(long, default_value_t = 0)]
    pub start: usize,
    /// 显示的数量
    #[arg(long, default_value_t = 10)]
    pub count: usize,
}

impl SubCommandExtend for SliceCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let cache = CacheFacade::new(opts.store.open().await?);
        for entry in cache.slice(self.namespace, self.start, self.count).await? {
            println!("{}\t{}", entry.key, entry.value);
        }
        Ok(())
    }
}
