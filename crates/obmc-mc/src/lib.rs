//! # obmc-mc
//!
//! 重叠块运动补偿 (OBMC) 预测引擎.
//!
//! 运动向量锚定在规则网格的顶点上, 按四叉树细分. 每个叶子块的四个
//! 角点向量先按边拓扑解析 (向量插值或像素域混合), 再经 6 抽头子像素
//! 滤波取出 1~4 个预测块, 最后由接缝混合器合成无块效应的输出.
//!
//! 数据流: [`walker`] -> [`topology`] -> [`interp`] (经 [`dsp`] 分派)
//! -> [`blend`]. [`predictor`] 独立地读取同一网格, 为熵编码提供向量
//! 预测与上下文.

pub mod blend;
pub mod config;
pub mod dsp;
pub mod frame;
pub mod geometry;
pub mod grid;
pub mod interp;
pub mod predictor;
pub mod setup;
pub mod topology;
pub mod walker;

pub use config::{BlendMode, KernelChoice, McConfig};
pub use dsp::{LaneKernels, McKernels, ScalarKernels, select_kernels};
pub use frame::predict_plane;
pub use grid::{GridPoint, MvGrid};
pub use predictor::{predict_mv, predict_reference, split_flag_context};
pub use setup::VectorField;
pub use topology::{BlockPlan, CornerSource, Shape, Topology};
pub use walker::McContext;
