//! CPU 能力探测.
//!
//! 每个会话只探测一次, 结果用于选择运动补偿内核.

use bitflags::bitflags;
use std::fmt;
use std::sync::OnceLock;

bitflags! {
    /// CPU 指令集能力位掩码
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CpuFlags: u32 {
        /// x86 SSE2
        const SSE2   = 1 << 0;
        /// x86 SSSE3
        const SSSE3  = 1 << 1;
        /// x86 SSE4.1
        const SSE4_1 = 1 << 2;
        /// x86 AVX2
        const AVX2   = 1 << 3;
        /// ARM NEON
        const NEON   = 1 << 4;
    }
}

impl CpuFlags {
    /// 探测当前 CPU 支持的指令集
    pub fn detect() -> Self {
        #[allow(unused_mut)]
        let mut flags = CpuFlags::empty();
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if is_x86_feature_detected!("sse2") {
                flags |= CpuFlags::SSE2;
            }
            if is_x86_feature_detected!("ssse3") {
                flags |= CpuFlags::SSSE3;
            }
            if is_x86_feature_detected!("sse4.1") {
                flags |= CpuFlags::SSE4_1;
            }
            if is_x86_feature_detected!("avx2") {
                flags |= CpuFlags::AVX2;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                flags |= CpuFlags::NEON;
            }
        }
        log::debug!("CPU 能力探测结果: {flags}");
        flags
    }

    /// 进程内缓存的探测结果, 首次调用时探测
    pub fn cached() -> Self {
        static FLAGS: OnceLock<CpuFlags> = OnceLock::new();
        *FLAGS.get_or_init(Self::detect)
    }

    /// 是否具备宽向量单元 (按 8 通道分块的内核可被自动向量化)
    pub fn has_wide_lanes(self) -> bool {
        self.intersects(CpuFlags::SSE4_1 | CpuFlags::AVX2 | CpuFlags::NEON)
    }
}

impl fmt::Display for CpuFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CpuFlags::empty().to_string(), "none");
        assert_eq!((CpuFlags::SSE2 | CpuFlags::AVX2).to_string(), "SSE2|AVX2");
    }

    #[test]
    fn test_has_wide_lanes() {
        assert!(!CpuFlags::SSE2.has_wide_lanes());
        assert!(CpuFlags::NEON.has_wide_lanes());
        // 探测结果在任意平台上都应可用
        let _ = CpuFlags::detect().has_wide_lanes();
        assert_eq!(CpuFlags::cached(), CpuFlags::cached());
    }
}
