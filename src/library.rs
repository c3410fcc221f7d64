//! 照片图库
//!
//! 图库文件是一个帖子数组 `[{"media": [...]}]`，每个帖子的第一张照片参与索引。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{StreamExt, stream};
use image::ImageError;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::spawn_blocking;
use utoipa::{IntoParams, ToSchema};

use crate::cache::CacheFacade;
use crate::color::{Rgba, rgb_to_hsl};
use crate::media::{MediaColor, MediaRecord};
use crate::store::{KeyValueStore, StoreError};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("无法读写图库文件 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("图库文件格式错误 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("无法读取图片 {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("图片 {0} 没有任何像素")]
    EmptyImage(PathBuf),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
struct Post {
    media: Vec<MediaRecord>,
}

/// 计算照片的平均色
pub trait MediaColorCalculator: Send + Sync + 'static {
    fn calculate(&self, path: &Path) -> Result<MediaColor, LibraryError>;
}

/// 所有像素 RGBA 分量的算术平均值
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageColor;

impl MediaColorCalculator for AverageColor {
    fn calculate(&self, path: &Path) -> Result<MediaColor, LibraryError> {
        let image = image::open(path)
            .map_err(|source| LibraryError::Image { path: path.to_path_buf(), source })?
            .to_rgba8();

        let count = image.pixels().len() as u64;
        if count == 0 {
            return Err(LibraryError::EmptyImage(path.to_path_buf()));
        }

        let mut sum = [0u64; 4];
        for pixel in image.pixels() {
            for (total, &channel) in sum.iter_mut().zip(&pixel.0) {
                *total += channel as u64;
            }
        }
        let rgba: Rgba = sum.map(|total| ((total + count / 2) / count) as u8);

        Ok(MediaColor {
            hex: format!("#{:02x}{:02x}{:02x}", rgba[0], rgba[1], rgba[2]),
            rgba,
            hsl: rgb_to_hsl(rgba),
        })
    }
}

/// 照片列表的筛选条件
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MediaQuery {
    /// 页码，从 1 开始
    pub page: Option<usize>,
    /// 每页数量
    pub limit: Option<usize>,
    /// 最早创建时间
    pub start_date: Option<i64>,
    /// 最晚创建时间
    pub end_date: Option<i64>,
    /// 标题包含的文字，不区分大小写
    pub title: Option<String>,
    /// 路径包含的文字，不区分大小写
    pub uri: Option<String>,
}

/// 一页照片
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<MediaRecord>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

/// 已加载的图库
#[derive(Debug, Clone)]
pub struct Library {
    path: PathBuf,
    media: Vec<MediaRecord>,
}

impl Library {
    pub fn new(path: impl Into<PathBuf>, media: Vec<MediaRecord>) -> Self {
        Self { path: path.into(), media }
    }

    /// 读取图库文件，跳过视频，并将相对路径解析为相对于图库文件所在目录
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| LibraryError::Io { path: path.to_path_buf(), source })?;
        let posts: Vec<Post> = serde_json::from_slice(&data)
            .map_err(|source| LibraryError::Parse { path: path.to_path_buf(), source })?;

        let root = path.parent().unwrap_or(Path::new("."));
        let media = posts
            .into_iter()
            .filter_map(|post| post.media.into_iter().next())
            .filter(|media| {
                let video = media.uri.ends_with(".mp4");
                if video {
                    debug!("跳过视频: {}", media.uri);
                }
                !video
            })
            .map(|mut media| {
                if Path::new(&media.uri).is_relative() {
                    media.uri = root.join(&media.uri).to_string_lossy().into_owned();
                }
                media
            })
            .collect::<Vec<_>>();

        info!("从 {} 加载了 {} 张照片", path.display(), media.len());
        Ok(Self::new(path, media))
    }

    /// 以帖子格式写回图库文件
    pub async fn save(&self) -> Result<(), LibraryError> {
        // 还原为相对于图库文件所在目录的路径，与读取时的解析方式对应
        let root = self.path.parent().unwrap_or(Path::new("."));
        let posts = self
            .media
            .iter()
            .cloned()
            .map(|mut media| {
                if let Ok(relative) = Path::new(&media.uri).strip_prefix(root) {
                    media.uri = relative.to_string_lossy().into_owned();
                }
                Post { media: vec![media] }
            })
            .collect::<Vec<_>>();
        let data = serde_json::to_vec(&posts)
            .map_err(|source| LibraryError::Parse { path: self.path.clone(), source })?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|source| LibraryError::Io { path: self.path.clone(), source })?;
        info!("图库已写回 {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media(&self) -> &[MediaRecord] {
        &self.media
    }

    pub fn into_media(self) -> Vec<MediaRecord> {
        self.media
    }

    /// 按条件筛选并分页
    pub fn query(&self, query: &MediaQuery) -> MediaPage {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).max(1);
        let title = query.title.as_ref().map(|s| s.to_lowercase());
        let uri = query.uri.as_ref().map(|s| s.to_lowercase());

        let matched = self
            .media
            .iter()
            .filter(|m| query.start_date.is_none_or(|start| m.creation_timestamp >= start))
            .filter(|m| query.end_date.is_none_or(|end| m.creation_timestamp <= end))
            .filter(|m| title.as_ref().is_none_or(|t| m.title.to_lowercase().contains(t)))
            .filter(|m| uri.as_ref().is_none_or(|u| m.uri.to_lowercase().contains(u)))
            .collect::<Vec<_>>();

        let total = matched.len();
        let items = matched.into_iter().skip((page - 1) * limit).take(limit).cloned().collect();
        MediaPage { items, total, page, limit, total_pages: total.div_ceil(limit) }
    }
}

/// 一次导入的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// 使用 `media:` 缓存的照片
    pub cached: usize,
    /// 使用图库文件中已有颜色的照片
    pub reused: usize,
    /// 重新计算颜色的照片
    pub computed: usize,
    /// 无法计算颜色而跳过的照片
    pub failed: usize,
}

/// 为图库中的照片补全平均色并写入 `media:` 缓存
///
/// `overwrite` 为真时忽略缓存和已有颜色，全部重新计算
pub async fn ingest<S, C>(
    cache: &CacheFacade<S>,
    library: &mut Library,
    calculator: Arc<C>,
    overwrite: bool,
    pb: &ProgressBar,
) -> Result<IngestSummary, LibraryError>
where
    S: KeyValueStore,
    C: MediaColorCalculator,
{
    let mut summary = IngestSummary::default();
    let mut pending = vec![];

    for (i, media) in library.media.iter_mut().enumerate() {
        if !overwrite {
            if let Some(cached) = cache.get_media(media.file_name()).await? {
                if cached.has_color() {
                    media.copy_color_from(&cached);
                    summary.cached += 1;
                    pb.inc(1);
                    continue;
                }
            }
            if media.has_color() {
                cache.put_media(media.file_name(), media).await?;
                summary.reused += 1;
                pb.inc(1);
                continue;
            }
        }
        pending.push((i, PathBuf::from(&media.uri)));
    }

    let mut results = stream::iter(pending)
        .map(|(i, path)| {
            let calculator = calculator.clone();
            async move {
                let result = spawn_blocking(move || calculator.calculate(&path)).await;
                (i, result)
            }
        })
        .buffer_unordered(num_cpus::get());

    while let Some((i, result)) = results.next().await {
        pb.inc(1);
        let media = &mut library.media[i];
        match result {
            Ok(Ok(color)) => {
                pb.set_message(format!("{} -> {}", media.file_name(), color.hex));
                media.set_color(color);
                cache.put_media(media.file_name(), media).await?;
                summary.computed += 1;
            }
            Ok(Err(e)) => {
                warn!("{e}");
                summary.failed += 1;
            }
            Err(e) => {
                warn!("计算 {} 的平均色时任务异常: {e}", media.uri);
                summary.failed += 1;
            }
        }
    }

    info!(
        "导入完成: 缓存 {}, 复用 {}, 计算 {}, 失败 {}",
        summary.cached, summary.reused, summary.computed, summary.failed
    );
    Ok(summary)
}
