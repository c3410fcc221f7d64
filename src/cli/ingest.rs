use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use log::info;

use crate::Opts;
use crate::cache::CacheFacade;
use crate::cli::SubCommandExtend;
use crate::library::{AverageColor, Library, ingest};
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct IngestCommand {
    /// 图库文件，默认为配置目录下的 library.json
    pub library: Option<PathBuf>,
    /// 忽略缓存，重新计算所有照片的颜色
    #[arg(long)]
    pub overwrite: bool,
}

impl SubCommandExtend for IngestCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut library = Library::load(opts.conf_dir.library_or(self.library.as_deref())).await?;
        let cache = CacheFacade::new(opts.store.open().await?);

        let pb = ProgressBar::new(library.media().len() as u64).with_style(pb_style());
        let summary = ingest(&cache, &mut library, Arc::new(AverageColor), self.overwrite, &pb).await?;
        pb.finish_and_clear();

        library.save().await?;
        info!("共 {} 张照片带有颜色信息", summary.cached + summary.reused + summary.computed);
        Ok(())
    }
}
