use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 缓存键的命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// 颜色 -> 照片路径
    Color,
    /// 照片文件名 -> 照片信息
    Media,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Media => "media",
        }
    }

    /// 匹配该命名空间下所有键的模式
    pub fn pattern(&self) -> String {
        format!("{}:*", self.as_str())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "color" => Ok(Self::Color),
            "media" => Ok(Self::Media),
            _ => Err(format!("未知的缓存类型: {s}")),
        }
    }
}

/// 清理缓存的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClearTarget {
    #[default]
    All,
    Color,
    Media,
}

impl ClearTarget {
    pub fn namespace(&self) -> Option<Namespace> {
        match self {
            Self::All => None,
            Self::Color => Some(Namespace::Color),
            Self::Media => Some(Namespace::Media),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self.namespace() {
            Some(namespace) => namespace.as_str(),
            None => "all",
        }
    }
}

impl fmt::Display for ClearTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClearTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            _ => Ok(match s.parse::<Namespace>()? {
                Namespace::Color => Self::Color,
                Namespace::Media => Self::Media,
            }),
        }
    }
}

/// 生成带命名空间的缓存键，如 `color:ff0000`
pub fn prefix(namespace: Namespace, key: &str) -> String {
    format!("{}:{key}", namespace.as_str())
}
