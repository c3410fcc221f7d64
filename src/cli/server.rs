use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use rand::distr::{Alphanumeric, SampleString};
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use crate::cli::SubCommandExtend;
use crate::config::BuildOptions;
use crate::index::IndexBuilder;
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    /// 图库文件，默认为配置目录下的 library.json
    #[arg(long, value_name = "FILE")]
    pub library: Option<PathBuf>,
    #[command(flatten)]
    pub build: BuildOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
    /// 请求验证 token，不填则随机生成
    #[arg(long, default_value_t = String::new())]
    pub token: String,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH")]
    pub prometheus_auth: Option<String>,
}

impl ServerCommand {
    fn push_auth(&self) -> anyhow::Result<Option<BasicAuthentication>> {
        let Some(auth) = &self.prometheus_auth else {
            return Ok(None);
        };
        let (username, password) =
            auth.split_once(':').ok_or_else(|| anyhow::anyhow!("prometheus 认证信息格式错误: {auth}"))?;
        Ok(Some(BasicAuthentication { username: username.to_string(), password: password.to_string() }))
    }

    fn spawn_push(&self, url: String) -> anyhow::Result<()> {
        let instance = self.prometheus_instance.clone().unwrap_or_else(|| self.addr.clone());
        let auth = self.push_auth()?;
        tokio::spawn(async move {
            loop {
                let metric_families = prometheus::gather();
                let url = url.clone();
                let instance = instance.clone();
                let auth = auth.as_ref().map(|a| BasicAuthentication {
                    username: a.username.clone(),
                    password: a.password.clone(),
                });
                let r = spawn_blocking(move || {
                    prometheus::push_metrics(
                        "colorindex",
                        labels! { "instance".to_string() => instance },
                        &url,
                        metric_families,
                        auth,
                    )
                })
                .await;
                match r {
                    Ok(Err(e)) => error!("推送指标失败: {e}"),
                    Err(e) => error!("推送任务异常: {e}"),
                    Ok(Ok(())) => {}
                }
                sleep(Duration::from_secs(30)).await;
            }
        });
        Ok(())
    }
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let cancel = CancellationToken::new();
        let store = opts.store.open().await?;
        let index = self.build.apply(IndexBuilder::new(store)).cancel_token(cancel.clone()).open().await?;

        let mut token = self.token.clone();
        if token.is_empty() {
            token = Alphanumeric.sample_string(&mut rand::rng(), 32);
            info!("鉴权 token: {}", token);
        }

        let library = opts.conf_dir.library_or(self.library.as_deref());
        info!("图库文件: {}", library.display());

        // 创建应用状态
        let state = server::AppState::new(index, library, token);

        // 创建应用
        let app = server::create_app(state);

        if let Some(url) = self.prometheus_push.clone() {
            self.spawn_push(url)?;
        }

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("监听退出信号失败: {e}");
                }
                info!("正在关闭服务器");
                // 中断正在进行的索引构建
                cancel.cancel();
            })
            .await?;

        Ok(())
    }
}
