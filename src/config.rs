use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::index::{IndexBuilder, MatchPolicy};
use crate::store::StoreBackend;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "colorindex", "colorindex").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct StoreOptions {
    /// 键值存储地址，支持 redis://、rediss:// 和 memory://
    #[arg(long = "store", value_name = "URL", global = true, env = "COLORINDEX_STORE", default_value = "redis://127.0.0.1:6379")]
    pub url: String,
}

impl StoreOptions {
    pub async fn open(&self) -> anyhow::Result<StoreBackend> {
        Ok(StoreBackend::open(&self.url).await?)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct BuildOptions {
    /// worker 数量，默认为 CPU 核心数，最多 256
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=256))]
    pub threads: Option<u64>,
    /// 颜色匹配策略
    #[arg(long, value_enum, default_value_t = MatchPolicy::Weighted)]
    pub policy: MatchPolicy,
    /// 单个 worker 的最长运行时间，单位为秒
    #[arg(long, value_name = "SECS")]
    pub unit_timeout: Option<u64>,
}

impl BuildOptions {
    /// 将选项应用到索引构建器
    pub fn apply(&self, mut builder: IndexBuilder<StoreBackend>) -> IndexBuilder<StoreBackend> {
        if let Some(threads) = self.threads {
            builder = builder.threads(threads as usize);
        }
        builder.policy(self.policy).unit_timeout(self.unit_timeout.map(Duration::from_secs))
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "colorindex", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 配置文件目录，默认的图库文件为其中的 library.json
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    #[command(flatten)]
    pub store: StoreOptions,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 计算图库中照片的平均色并写入缓存
    Ingest(IngestCommand),
    /// 为所有颜色建立索引
    Build(BuildCommand),
    /// 查找颜色对应的照片
    Lookup(LookupCommand),
    /// 显示缓存统计
    Stats(StatsCommand),
    /// 清理缓存
    Clear(ClearCommand),
    /// 查看部分缓存内容
    Slice(SliceCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回默认图库文件的路径
    pub fn library(&self) -> PathBuf {
        self.path.join("library.json")
    }

    /// 命令行指定了图库文件时使用它，否则使用默认路径
    pub fn library_or(&self, library: Option<&Path>) -> PathBuf {
        library.map(Path::to_path_buf).unwrap_or_else(|| self.library())
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_verify_cli() {
        Opts::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let opts = Opts::try_parse_from([
            "colorindex", "--store", "memory://", "-c", "/tmp/ci", "build", "--threads", "4", "--policy", "prioritized",
        ])
        .unwrap();
        assert_eq!(opts.store.url, "memory://");
        assert_eq!(opts.conf_dir.library(), PathBuf::from("/tmp/ci/library.json"));
        let SubCommand::Build(build) = opts.subcmd else { panic!("expected build") };
        assert_eq!(build.build.threads, Some(4));
        assert_eq!(build.build.policy, MatchPolicy::Prioritized);

        assert!(Opts::try_parse_from(["colorindex", "build", "--threads", "0"]).is_err());
        assert!(Opts::try_parse_from(["colorindex", "build", "--threads", "257"]).is_err());
    }
}
