//! # OBMC
//!
//! 纯 Rust 实现的重叠块运动补偿 (Overlapped Block Motion Compensation) 预测器.
//!
//! 给定一个运动向量网格和已解码的参考平面, 逐块生成运动补偿预测:
//! - **分数像素插值**: 6 抽头水平/垂直滤波, 精度到 1/8 像素
//! - **重叠混合**: 四角向量的双线性混合, 以及大块上的多分辨率 (Haar) 混合
//! - **自适应细分**: 按网格中的有效点与边标志递归拆分块
//! - **向量预测**: 邻居向量的几何中值, 参考帧投票与拆分上下文
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use obmc::core::{MotionVector, Plane, RefFrame};
//! use obmc::mc::{McConfig, McContext, MvGrid, predict_plane};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut grid = MvGrid::new(2, 2)?;
//! for vy in 0..grid.rows() {
//!     for vx in 0..grid.cols() {
//!         grid.set_mv(vx, vy, MotionVector::new(3, -5), RefFrame::Prev);
//!     }
//! }
//! let mut reference = Plane::<u8>::new(32, 32, 0, 0, 32, 8)?;
//! reference.fill_with(|x, y| (x * 4 + y) as u8);
//! reference.extend_borders();
//!
//! let ctx = McContext::new(&grid, &reference, McConfig::default())?;
//! let mut prediction = Plane::<u8>::new(32, 32, 0, 0, 0, 8)?;
//! predict_plane(&ctx, &mut prediction)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `obmc-core` | 像素, 平面, 运动向量, 错误类型 |
//! | `obmc-mc` | 网格, 插值, 混合内核与块遍历 |

/// 核心类型与工具
pub use obmc_core as core;

/// 运动补偿预测
pub use obmc_mc as mc;

pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
