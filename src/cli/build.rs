use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::BuildOptions;
use crate::index::IndexBuilder;
use crate::library::Library;
use crate::Opts;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    /// 图库文件，默认为配置目录下的 library.json
    pub library: Option<PathBuf>,
    #[command(flatten)]
    pub build: BuildOptions,
}

impl SubCommandExtend for BuildCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let library = Library::load(opts.conf_dir.library_or(self.library.as_deref())).await?;
        let store = opts.store.open().await?;
        let index = self.build.apply(IndexBuilder::new(store)).progress(true).open().await?;

        let summary = index.build_index(library.into_media()).await?;
        info!(
            "构建索引成功: {} 个 worker, 写入 {}, 跳过 {}, 耗时 {:.2}s",
            summary.workers, summary.written, summary.skipped, summary.elapsed
        );
        Ok(())
    }
}
