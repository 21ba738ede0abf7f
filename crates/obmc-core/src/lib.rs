//! # obmc-core
//!
//! OBMC 运动补偿引擎核心库, 提供基础类型定义、错误处理和工具函数.
//!
//! 本 crate 为上层的网格、插值与混合模块提供底层基础设施:
//! 精度常量, 样本类型, 带填充的参考平面, 运动向量, CPU 能力探测与校验和.

pub mod consts;
pub mod cpu;
pub mod crc;
pub mod error;
pub mod mv;
pub mod pixel;
pub mod plane;

// 重导出常用类型
pub use cpu::CpuFlags;
pub use error::{ObmcError, ObmcResult};
pub use mv::{MotionVector, RefFrame};
pub use pixel::Pixel;
pub use plane::{Plane, PlaneConfig};
