use serde::{Deserialize, Serialize};

/// 比较色差时使用的默认精度
pub const DEFAULT_PRECISION: f64 = 0.01;

/// RGBA 颜色，各分量范围为 [0, 255]
pub type Rgba = [u8; 4];

/// HSL 颜色，三个分量均归一化到 [0, 1]
///
/// 序列化格式为 `[h, s, l]` 数组，与图库文件保持一致
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Hsl {
    pub fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self { hue, saturation, lightness }
    }
}

impl From<[f64; 3]> for Hsl {
    fn from([hue, saturation, lightness]: [f64; 3]) -> Self {
        Self { hue, saturation, lightness }
    }
}

impl From<Hsl> for [f64; 3] {
    fn from(hsl: Hsl) -> Self {
        [hsl.hue, hsl.saturation, hsl.lightness]
    }
}

/// 将 RGB(A) 颜色转换到 HSL 空间，alpha 通道不参与计算
pub fn rgb_to_hsl([r, g, b, _]: Rgba) -> Hsl {
    let r = r as f64 / 255.;
    let g = g as f64 / 255.;
    let b = b as f64 / 255.;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.;

    // 灰度色
    if max == min {
        return Hsl::new(0., 0., lightness);
    }

    let delta = max - min;
    let saturation =
        if lightness > 0.5 { delta / (2. - max - min) } else { delta / (max + min) };

    // NOTE: 多个通道同为最大值时，按 r -> g -> b 的顺序取主导通道
    let hue = if max == r {
        (g - b) / delta + if g < b { 6. } else { 0. }
    } else if max == g {
        (b - r) / delta + 2.
    } else {
        (r - g) / delta + 4.
    };

    Hsl::new(hue / 6., saturation, lightness)
}

/// 将 RGB 转换为 6 位小写十六进制字符串，不带 `#`
pub fn rgb_to_hex(red: u8, green: u8, blue: u8) -> String {
    format!("{red:02x}{green:02x}{blue:02x}")
}

/// 规范化用户输入的颜色：允许 `#` 前缀和大写字母
///
/// 不是合法的 6 位十六进制颜色时返回 `None`
pub fn normalize_hex(color: &str) -> Option<String> {
    let color = color.strip_prefix('#').unwrap_or(color);
    if color.len() != 6 || !color.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(color.to_ascii_lowercase())
}

/// 计算两个色相之间的最小距离，考虑色相在 1.0 处回绕到 0.0
pub fn hue_difference(a: f64, b: f64) -> f64 {
    (a - b).abs().min((1. + a - b).abs()).min((a - (1. + b)).abs())
}

/// 判断两个数在给定精度内是否相等
pub fn is_equal_with_precision(a: f64, b: f64, precision: f64) -> bool {
    (a - b).abs() <= precision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn test_rgb_to_hsl_primary() {
        let red = rgb_to_hsl([255, 0, 0, 255]);
        assert_close(red.hue, 0.);
        assert_close(red.saturation, 1.);
        assert_close(red.lightness, 0.5);

        let green = rgb_to_hsl([0, 255, 0, 255]);
        assert_close(green.hue, 1. / 3.);
        assert_close(green.saturation, 1.);

        let blue = rgb_to_hsl([0, 0, 255, 255]);
        assert_close(blue.hue, 2. / 3.);
        assert_close(blue.lightness, 0.5);
    }

    #[test]
    fn test_rgb_to_hsl_achromatic() {
        let gray = rgb_to_hsl([128, 128, 128, 255]);
        assert_close(gray.hue, 0.);
        assert_close(gray.saturation, 0.);
        assert_close(gray.lightness, 128. / 255.);
        assert!(is_equal_with_precision(gray.lightness, 0.5, DEFAULT_PRECISION));

        let white = rgb_to_hsl([255, 255, 255, 255]);
        assert_close(white.lightness, 1.);
        let black = rgb_to_hsl([0, 0, 0, 255]);
        assert_close(black.lightness, 0.);
    }

    #[test]
    fn test_rgb_to_hsl_range() {
        // 品红：红色为主导通道且 g < b，色相应落在 [0, 1) 内
        let magenta = rgb_to_hsl([255, 0, 128, 255]);
        assert!(magenta.hue > 0.8 && magenta.hue < 1.);
        // 亮色走另一条饱和度公式
        let light = rgb_to_hsl([255, 200, 200, 255]);
        assert!(light.lightness > 0.5);
        assert_close(light.saturation, 1.);
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex(255, 0, 0), "ff0000");
        assert_eq!(rgb_to_hex(0, 0, 0), "000000");
        assert_eq!(rgb_to_hex(1, 1, 1), "010101");
        assert_eq!(rgb_to_hex(128, 64, 32), "804020");
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("#FF00aa").as_deref(), Some("ff00aa"));
        assert_eq!(normalize_hex("804020").as_deref(), Some("804020"));
        assert_eq!(normalize_hex("fff"), None);
        assert_eq!(normalize_hex("gg0000"), None);
    }

    #[test]
    fn test_hue_difference() {
        assert_close(hue_difference(0., 1.), 0.);
        assert_close(hue_difference(0.1, 0.9), 0.2);
        assert_close(hue_difference(0.9, 0.1), 0.2);
        assert_close(hue_difference(0.2, 0.4), 0.2);
        assert_eq!(hue_difference(0.37, 0.37), 0.);
    }

    #[test]
    fn test_is_equal_with_precision() {
        assert!(is_equal_with_precision(1., 1., DEFAULT_PRECISION));
        assert!(is_equal_with_precision(1., 1.009, DEFAULT_PRECISION));
        assert!(!is_equal_with_precision(1., 1.02, DEFAULT_PRECISION));
        assert!(is_equal_with_precision(1., 1.02, 0.03));
        assert!(!is_equal_with_precision(1., f64::INFINITY, DEFAULT_PRECISION));
    }

    #[test]
    fn test_hsl_serde() {
        let hsl: Hsl = serde_json::from_str("[0.5, 0.25, 0.75]").unwrap();
        assert_eq!(hsl, Hsl::new(0.5, 0.25, 0.75));
        assert_eq!(serde_json::to_string(&hsl).unwrap(), "[0.5,0.25,0.75]");
    }
}
