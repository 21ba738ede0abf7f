//! 运行时配置.

use serde::{Deserialize, Serialize};

/// 混合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// 块足够大时使用多分辨率混合, 否则双线性
    #[default]
    Auto,
    /// 总是使用双线性混合
    Plain,
}

/// 内核选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelChoice {
    /// 按 CPU 能力自动选择
    #[default]
    Auto,
    /// 强制标量内核
    Scalar,
    /// 强制分块内核
    Accelerated,
}

/// 运动补偿配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McConfig {
    /// 混合方式
    pub blend: BlendMode,
    /// 内核选择
    pub kernels: KernelChoice,
    /// 帧级驱动是否按宏块行并行
    pub parallel: bool,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            blend: BlendMode::Auto,
            kernels: KernelChoice::Auto,
            parallel: true,
        }
    }
}

impl McConfig {
    /// 给定块尺寸是否使用多分辨率混合
    pub fn use_multires(&self, log_xblk_sz: u32, log_yblk_sz: u32) -> bool {
        self.blend == BlendMode::Auto
            && log_xblk_sz >= obmc_core::consts::MULTIRES_MIN_LOG
            && log_yblk_sz >= obmc_core::consts::MULTIRES_MIN_LOG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_往返() {
        let cfg = McConfig {
            blend: BlendMode::Plain,
            kernels: KernelChoice::Accelerated,
            parallel: false,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"plain\""));
        assert!(json.contains("\"accelerated\""));
        let back: McConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_缺省字段使用默认值() {
        let cfg: McConfig = serde_json::from_str(r#"{"blend":"plain"}"#).unwrap();
        assert_eq!(cfg.blend, BlendMode::Plain);
        assert_eq!(cfg.kernels, KernelChoice::Auto);
        assert!(cfg.parallel);
    }

    #[test]
    fn test_多分辨率门限() {
        let cfg = McConfig::default();
        assert!(cfg.use_multires(2, 2));
        assert!(!cfg.use_multires(1, 2));
        let plain = McConfig {
            blend: BlendMode::Plain,
            ..McConfig::default()
        };
        assert!(!plain.use_multires(4, 4));
    }
}
