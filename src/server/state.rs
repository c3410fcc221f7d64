use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::index::ColorIndex;
use crate::store::StoreBackend;

/// 应用状态
pub struct AppState {
    /// 颜色索引
    pub index: ColorIndex<StoreBackend>,
    /// 默认的图库文件
    pub library: PathBuf,
    /// 鉴权 token
    pub token: String,
    /// 同一时间只允许一次索引构建
    pub building: Mutex<()>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(index: ColorIndex<StoreBackend>, library: PathBuf, token: String) -> Arc<Self> {
        Arc::new(AppState { index, library, token, building: Mutex::new(()) })
    }
}
