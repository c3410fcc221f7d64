use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::color::{Hsl, Rgba};

/// 图库中的一张照片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// 照片路径
    pub uri: String,
    /// 创建时间，Unix 时间戳
    #[serde(default)]
    pub creation_timestamp: i64,
    /// 标题
    #[serde(default)]
    pub title: String,
    /// 平均色，格式为 `#rrggbb`
    #[serde(rename = "average_color", default, skip_serializing_if = "Option::is_none")]
    pub average_color_hex: Option<String>,
    /// 平均色的 RGBA 分量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_color_rgba: Option<Rgba>,
    /// 平均色的 HSL 分量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_color_hsl: Option<Hsl>,
    /// 图库文件中的其他字段，写回时原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 照片的平均色
#[derive(Debug, Clone, PartialEq)]
pub struct MediaColor {
    pub hex: String,
    pub rgba: Rgba,
    pub hsl: Hsl,
}

impl MediaRecord {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            creation_timestamp: 0,
            title: String::new(),
            average_color_hex: None,
            average_color_rgba: None,
            average_color_hsl: None,
            extra: Map::new(),
        }
    }

    pub fn with_hsl(mut self, hsl: Hsl) -> Self {
        self.average_color_hsl = Some(hsl);
        self
    }

    pub fn set_color(&mut self, color: MediaColor) {
        self.average_color_hex = Some(color.hex);
        self.average_color_rgba = Some(color.rgba);
        self.average_color_hsl = Some(color.hsl);
    }

    pub fn has_color(&self) -> bool {
        self.average_color_hsl.is_some()
    }

    /// 复制另一条记录的颜色信息
    pub fn copy_color_from(&mut self, other: &MediaRecord) {
        self.average_color_hex.clone_from(&other.average_color_hex);
        self.average_color_rgba = other.average_color_rgba;
        self.average_color_hsl = other.average_color_hsl;
    }

    /// 不带扩展名的文件名，作为 `media:` 缓存的键
    pub fn file_name(&self) -> &str {
        Path::new(&self.uri).file_stem().and_then(|s| s.to_str()).unwrap_or(&self.uri)
    }

    /// 用于稳定排序的键：千分位取整后的 HSL，再按路径区分
    ///
    /// 取整避免浮点噪声让两次构建的候选顺序不同
    pub fn sort_key(&self) -> (Option<[i64; 3]>, &str) {
        let hsl = self.average_color_hsl.map(|hsl| {
            [hsl.hue, hsl.saturation, hsl.lightness].map(|x| (x * 1000.).round() as i64)
        });
        (hsl, &self.uri)
    }
}

/// 将照片列表排列为确定的顺序
pub fn sort_media(media: &mut [MediaRecord]) {
    media.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let media = MediaRecord::new("/data/posts/202401/photo_123.webp");
        assert_eq!(media.file_name(), "photo_123");
        let media = MediaRecord::new("plain");
        assert_eq!(media.file_name(), "plain");
    }

    #[test]
    fn test_sort_media_is_stable() {
        let mut a = vec![
            MediaRecord::new("b").with_hsl(Hsl::new(0.5, 0.5, 0.5)),
            MediaRecord::new("a").with_hsl(Hsl::new(0.5, 0.5, 0.5)),
            MediaRecord::new("c").with_hsl(Hsl::new(0.1, 0.9, 0.2)),
        ];
        let mut b = vec![a[2].clone(), a[0].clone(), a[1].clone()];
        sort_media(&mut a);
        sort_media(&mut b);
        assert_eq!(a, b);
        let uris = a.iter().map(|m| m.uri.as_str()).collect::<Vec<_>>();
        assert_eq!(uris, ["c", "a", "b"]);
    }

    #[test]
    fn test_keep_extra_fields() {
        let json = r#"{"uri":"a.jpg","creation_timestamp":1,"title":"","backup_uri":"b.jpg","cross_post_source":{"source_app":"FB"}}"#;
        let media: MediaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(media.extra["backup_uri"], "b.jpg");
        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(json).unwrap());
    }

    #[test]
    fn test_deserialize_library_record() {
        let json = r##"{
            "uri": "media/posts/1.webp",
            "creation_timestamp": 1700000000,
            "title": "sunset",
            "average_color": "#ff8000",
            "average_color_rgba": [255, 128, 0, 255],
            "average_color_hsl": [0.0836, 1.0, 0.5]
        }"##;
        let media: MediaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(media.average_color_hex.as_deref(), Some("#ff8000"));
        assert_eq!(media.average_color_rgba, Some([255, 128, 0, 255]));
        assert!(media.has_color());

        let bare: MediaRecord = serde_json::from_str(r#"{"uri": "x.jpg"}"#).unwrap();
        assert!(bare.extra.is_empty());
        assert!(!bare.has_color());
        assert_eq!(serde_json::to_string(&bare).unwrap(), r#"{"uri":"x.jpg","creation_timestamp":0,"title":""}"#);
    }
}
