//! 子像素插值 (标量实现).
//!
//! 8 相位 6 抽头可分离滤波: 先水平后垂直. 中间结果去掉 `bias`
//! (半满量程) 后以 7 位定点保存, 垂直滤波后右移 14 位, 加回 `bias`
//! 并饱和到样本范围.
//!
//! 某一轴相位为 0 时该轴的滤波退化为纯移位, 与用第 0 行系数
//! 执行通用滤波的结果逐位相同.

use obmc_core::consts::{
    FILTER_BITS, FILTER_OUT_SHIFT, FILTER_TAPS, FILTER_TOP_APRON, MAX_BLOCK_SIZE, MV_FRAC_BITS,
    MV_POS_BITS, MV_SCALE_SHIFT, SUBPEL_FILTERS,
};
use obmc_core::{Pixel, Plane};

use crate::setup::VectorField;

/// 中间缓冲区容量: 最大块宽 x (最大块高 + 滤波器保护带)
pub(crate) const TMP_CAPACITY: usize = MAX_BLOCK_SIZE * (MAX_BLOCK_SIZE + FILTER_TAPS - 1);

const PHASE_MASK: i32 = (1 << MV_FRAC_BITS) - 1;

/// 定点滤波参数
#[derive(Debug, Clone, Copy)]
pub(crate) struct FilterRange {
    pub bias: i32,
    pub max: i32,
}

impl FilterRange {
    pub fn new(bit_depth: u32) -> Self {
        Self {
            bias: 1 << (bit_depth - 1),
            max: (1 << bit_depth) - 1,
        }
    }

    /// 水平滤波去偏移后的常数项
    #[inline(always)]
    pub fn h_offset(&self) -> i32 {
        self.bias << FILTER_BITS
    }

    /// 垂直滤波的最终舍入与饱和
    #[inline(always)]
    pub fn finish(&self, acc: i32) -> i32 {
        (((acc + (1 << (FILTER_OUT_SHIFT - 1))) >> FILTER_OUT_SHIFT) + self.bias).clamp(0, self.max)
    }

    /// 垂直相位为 0 时的退化形式
    #[inline(always)]
    pub fn finish_copy(&self, t: i32) -> i32 {
        (((t + (1 << (FILTER_BITS - 1))) >> FILTER_BITS) + self.bias).clamp(0, self.max)
    }
}

/// 固定向量的子像素预测
///
/// `(x0, y0)` 为块在平面中的原点, `mvx`/`mvy` 以 1/8 平面像素为单位.
#[allow(clippy::too_many_arguments)]
pub fn predict_fixed<T: Pixel>(
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
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let bx = x0 + (mvx >> MV_FRAC_BITS) as isize;
    let by = y0 + (mvy >> MV_FRAC_BITS) as isize;
    let fx = (mvx & PHASE_MASK) as usize;
    let fy = (mvy & PHASE_MASK) as usize;

    if fx == 0 && fy == 0 {
        for j in 0..h {
            let row = src.row_slice(bx, by + j as isize, w);
            dst[j * dst_stride..j * dst_stride + w].copy_from_slice(row);
        }
        return;
    }

    let range = FilterRange::new(src.cfg.bit_depth);
    let mut tmp = [0i32; TMP_CAPACITY];
    // 垂直相位为 0 时不需要上下保护带
    let (top, rows) = if fy == 0 {
        (0, h)
    } else {
        (FILTER_TOP_APRON, h + FILTER_TAPS - 1)
    };

    for r in 0..rows {
        let y = by + r as isize - top as isize;
        let out = &mut tmp[r * w..(r + 1) * w];
        if fx == 0 {
            let row = src.row_slice(bx, y, w);
            for (t, &p) in out.iter_mut().zip(row) {
                *t = (p.to_i32() - range.bias) << FILTER_BITS;
            }
        } else {
            let taps = &SUBPEL_FILTERS[fx];
            let row = src.row_slice(bx - FILTER_TOP_APRON as isize, y, w + FILTER_TAPS - 1);
            for (i, t) in out.iter_mut().enumerate() {
                let mut acc = 0;
                for k in 0..FILTER_TAPS {
                    acc += taps[k] * row[i + k].to_i32();
                }
                *t = acc - range.h_offset();
            }
        }
    }

    for j in 0..h {
        let out = &mut dst[j * dst_stride..j * dst_stride + w];
        if fy == 0 {
            for (i, px) in out.iter_mut().enumerate() {
                *px = T::from_i32(range.finish_copy(tmp[j * w + i]));
            }
        } else {
            let taps = &SUBPEL_FILTERS[fy];
            for (i, px) in out.iter_mut().enumerate() {
                let mut acc = 0;
                for k in 0..FILTER_TAPS {
                    acc += taps[k] * tmp[(j + k) * w + i];
                }
                *px = T::from_i32(range.finish(acc));
            }
        }
    }
}

/// 在一个高精度坐标上做完整的 6x6 可分离滤波
#[inline(always)]
pub(crate) fn sample_point<T: Pixel>(
    src: &Plane<T>,
    x0: isize,
    y0: isize,
    x: i32,
    y: i32,
    range: FilterRange,
) -> T {
    let px = x0 + (x >> MV_POS_BITS) as isize;
    let py = y0 + (y >> MV_POS_BITS) as isize;
    let fx = &SUBPEL_FILTERS[((x >> MV_SCALE_SHIFT) & PHASE_MASK) as usize];
    let fy = &SUBPEL_FILTERS[((y >> MV_SCALE_SHIFT) & PHASE_MASK) as usize];
    let mut acc = 0;
    for (r, &wy) in fy.iter().enumerate() {
        let row = src.row_slice(
            px - FILTER_TOP_APRON as isize,
            py + r as isize - FILTER_TOP_APRON as isize,
            FILTER_TAPS,
        );
        let mut t = 0;
        for k in 0..FILTER_TAPS {
            t += fx[k] * row[k].to_i32();
        }
        acc += wy * (t - range.h_offset());
    }
    T::from_i32(range.finish(acc))
}

/// 逐像素变化向量的子像素预测
///
/// 每个像素按 [`VectorField`] 计算自己的采样坐标, 滤波运算与
/// [`predict_fixed`] 完全一致.
#[allow(clippy::too_many_arguments)]
pub fn predict_interp<T: Pixel>(
    dst: &mut [T],
    dst_stride: usize,
    src: &Plane<T>,
    x0: isize,
    y0: isize,
    field: &VectorField,
    log_xblk_sz: u32,
    log_yblk_sz: u32,
) {
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let range = FilterRange::new(src.cfg.bit_depth);
    let (mut px, mut py) = field.positions();
    for j in 0..h {
        let out = &mut dst[j * dst_stride..j * dst_stride + w];
        let mut x = px[0];
        let mut y = py[0];
        for v in out.iter_mut() {
            *v = sample_point(src, x0, y0, x, y, range);
            x += px[1];
            y += py[1];
        }
        px[0] += px[2];
        py[0] += py[2];
        px[1] += px[3];
        py[1] += py[3];
    }
}
