//! 运动补偿内核分派.
//!
//! [`McKernels`] 汇集插值与混合的全部内核, 默认方法即标量实现.
//! 加速内核集只覆盖能够从分块中获益的方法, 其余继承默认实现;
//! 任意内核集的输出必须与标量实现逐位一致.
//!
//! 内核集在会话开始时按 CPU 能力选择一次, 之后以 `&'static dyn` 共享.

mod lane;

pub use lane::LaneKernels;

use obmc_core::{CpuFlags, Pixel, Plane};

use crate::blend;
use crate::config::KernelChoice;
use crate::interp;
use crate::setup::VectorField;

/// 运动补偿内核集
///
/// 所有块缓冲区的行跨度都等于块宽, 只有输出使用 `dst_stride`.
#[allow(clippy::too_many_arguments)]
pub trait McKernels<T: Pixel>: Send + Sync {
    /// 内核集名称
    fn name(&self) -> &'static str;

    /// 固定向量的子像素预测
    fn predict_fixed(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: &Plane<T>,
        x0: isize,
        y0: isize,
        mvx: i32,
        mvy: i32,
        log_xblk_sz: u32,
        log_yblk_sz: u32,
    ) {
        interp::predict_fixed(
            dst,
            dst_stride,
            src,
            x0,
            y0,
            mvx,
            mvy,
            log_xblk_sz,
            log_yblk_sz,
        );
    }

    /// 逐像素变化向量的子像素预测
    fn predict_interp(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: &Plane<T>,
        x0: isize,
        y0: isize,
        field: &VectorField,
        log_xblk_sz: u32,
        log_yblk_sz: u32,
    ) {
        interp::predict_interp(
            dst,
            dst_stride,
            src,
            x0,
            y0,
            field,
            log_xblk_sz,
            log_yblk_sz,
        );
    }

    /// 双线性混合
    fn blend_full(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: [&[T]; 4],
        log_xblk_sz: u32,
        log_yblk_sz: u32,
    ) {
        blend::blend_full(dst, dst_stride, src, log_xblk_sz, log_yblk_sz);
    }

    /// 带细分修正的双线性混合
    fn blend_full_split(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: [&[T]; 4],
        c: usize,
        s: u8,
        log_xblk_sz: u32,
        log_yblk_sz: u32,
    ) {
        blend::blend_full_split(dst, dst_stride, src, c, s, log_xblk_sz, log_yblk_sz);
    }

    /// 多分辨率混合
    fn blend_multi(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: [&[T]; 4],
        log_xblk_sz: u32,
        log_yblk_sz: u32,
        bit_depth: u32,
    ) {
        blend::blend_multi(dst, dst_stride, src, log_xblk_sz, log_yblk_sz, bit_depth);
    }

    /// 带细分修正的多分辨率混合
    fn blend_multi_split(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: [&[T]; 4],
        c: usize,
        s: u8,
        log_xblk_sz: u32,
        log_yblk_sz: u32,
        bit_depth: u32,
    ) {
        blend::blend_multi_split(
            dst,
            dst_stride,
            src,
            c,
            s,
            log_xblk_sz,
            log_yblk_sz,
            bit_depth,
        );
    }
}

/// 标量内核集
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernels;

impl<T: Pixel> McKernels<T> for ScalarKernels {
    fn name(&self) -> &'static str {
        "scalar"
    }
}

static SCALAR: ScalarKernels = ScalarKernels;
static LANE: LaneKernels = LaneKernels;

/// 选择内核集
///
/// `Auto` 在具备宽向量单元时选择分块内核, 否则选择标量内核.
pub fn select_kernels<T: Pixel>(flags: CpuFlags, choice: KernelChoice) -> &'static dyn McKernels<T> {
    let kernels: &'static dyn McKernels<T> = match choice {
        KernelChoice::Scalar => &SCALAR,
        KernelChoice::Accelerated => &LANE,
        KernelChoice::Auto if flags.has_wide_lanes() => &LANE,
        KernelChoice::Auto => &SCALAR,
    };
    log::debug!(
        "运动补偿内核: {} (CPU: {flags}, 选择: {choice:?})",
        kernels.name()
    );
    kernels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_kernels() {
        let k: &dyn McKernels<u8> = select_kernels(CpuFlags::empty(), KernelChoice::Auto);
        assert_eq!(k.name(), "scalar");
        let k: &dyn McKernels<u8> = select_kernels(CpuFlags::AVX2, KernelChoice::Auto);
        assert_eq!(k.name(), "lane");
        let k: &dyn McKernels<u16> = select_kernels(CpuFlags::AVX2, KernelChoice::Scalar);
        assert_eq!(k.name(), "scalar");
        let k: &dyn McKernels<u16> = select_kernels(CpuFlags::empty(), KernelChoice::Accelerated);
        assert_eq!(k.name(), "lane");
    }
}
