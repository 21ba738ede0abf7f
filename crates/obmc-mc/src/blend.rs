//! 接缝混合 (标量实现).
//!
//! 四个角的预测块 (步长等于块宽) 按双线性权重合成一个块.
//! 全部运算为整数定点: 加上最终移位量一半的舍入偏移后算术右移.
//!
//! - [`blend_full`]: 标准双线性混合
//! - [`blend_full_split`]: 未细分边的权重折半并入外角
//! - [`blend_multi`]: 半分辨率低频子带上混合, 高频取本象限角点
//! - [`blend_multi_split`]: 先在像素域与配对图像求和, 再做多分辨率混合
//!
//! 四个输入完全相同时所有路径都是恒等变换.

use obmc_core::consts::{MAX_BLOCK_AREA, MAX_BLOCK_SIZE};
use obmc_core::Pixel;

use crate::geometry::{detail_partner, quadrant_corner, rot};

// ============================================================
// 双线性混合
// ============================================================

/// 标准双线性混合
pub fn blend_full<T: Pixel>(
    dst: &mut [T],
    dst_stride: usize,
    src: [&[T]; 4],
    log_xblk_sz: u32,
    log_yblk_sz: u32,
) {
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let shift = log_xblk_sz + log_yblk_sz;
    let round = 1 << (shift - 1);
    for j in 0..h {
        let out = &mut dst[j * dst_stride..j * dst_stride + w];
        let o = j * w;
        for (i, px) in out.iter_mut().enumerate() {
            let p0 = src[0][o + i].to_i32();
            let p1 = src[1][o + i].to_i32();
            let p2 = src[2][o + i].to_i32();
            let p3 = src[3][o + i].to_i32();
            let a = (p0 << log_xblk_sz) + (p1 - p0) * i as i32;
            let b = (p3 << log_xblk_sz) + (p2 - p3) * i as i32;
            *px = T::from_i32(((a << log_yblk_sz) + (b - a) * j as i32 + round) >> shift);
        }
    }
}

/// 带细分修正的双线性权重
///
/// 权重放大 `2 << (lx + ly)` 倍, 像素 `(i, j)` 处角 `k` 的权重为
/// `s0[k] + dsdi[k] * i + dsdj[k] * j + dd[k] * i * j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitWeights {
    /// 原点权重
    pub s0: [i32; 4],
    /// 沿 i 的增量
    pub dsdi: [i32; 4],
    /// 沿 j 的增量
    pub dsdj: [i32; 4],
    /// 交叉项
    pub dd: [i32; 4],
}

impl SplitWeights {
    /// 生成外角 `c`, 细分状态 `s` 下的权重
    ///
    /// 未细分边的远端角只保留一半权重, 另一半并入外角, 与向量域中
    /// 对该角取平均的做法相互抵消.
    pub fn new(c: usize, s: u8, log_xblk_sz: u32, log_yblk_sz: u32) -> Self {
        let l = log_xblk_sz + log_yblk_sz;
        let mut w = Self {
            s0: [2 << l, 0, 0, 0],
            dsdi: [-2 << log_yblk_sz, 2 << log_yblk_sz, 0, 0],
            dsdj: [-2 << log_xblk_sz, 0, 0, 2 << log_xblk_sz],
            dd: [2, -2, 2, -2],
        };
        if s & 1 == 0 {
            w.fold_into(rot(c, 1), c);
        }
        if s & 2 == 0 {
            w.fold_into(rot(c, 3), c);
        }
        w
    }

    fn fold_into(&mut self, k: usize, c: usize) {
        for arr in [&mut self.s0, &mut self.dsdi, &mut self.dsdj, &mut self.dd] {
            arr[k] >>= 1;
            arr[c] += arr[k];
        }
    }

    /// 像素 `(i, j)` 处角 `k` 的权重
    #[inline(always)]
    pub fn at(&self, k: usize, i: i32, j: i32) -> i32 {
        self.s0[k] + self.dsdi[k] * i + self.dsdj[k] * j + self.dd[k] * i * j
    }
}

/// 带细分修正的双线性混合
#[allow(clippy::too_many_arguments)]
pub fn blend_full_split<T: Pixel>(
    dst: &mut [T],
    dst_stride: usize,
    src: [&[T]; 4],
    c: usize,
    s: u8,
    log_xblk_sz: u32,
    log_yblk_sz: u32,
) {
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let shift = log_xblk_sz + log_yblk_sz + 1;
    let round = 1 << (shift - 1);
    let weights = SplitWeights::new(c, s, log_xblk_sz, log_yblk_sz);
    for j in 0..h {
        let out = &mut dst[j * dst_stride..j * dst_stride + w];
        let o = j * w;
        for (i, px) in out.iter_mut().enumerate() {
            let p0 = src[0][o + i].to_i32();
            let mut acc = p0 << shift;
            for k in 1..4 {
                acc += (src[k][o + i].to_i32() - p0) * weights.at(k, i as i32, j as i32);
            }
            *px = T::from_i32((acc + round) >> shift);
        }
    }
}

// ============================================================
// 多分辨率混合
// ============================================================

/// 低频子带一边的最大采样数
const MAX_LL_SIZE: usize = MAX_BLOCK_SIZE / 2;

/// 一行 (或一列) 上 `[1 2 1]` 分析滤波, 结果放大 4 倍
///
/// 低频采样位于偶数坐标; 首个采样没有左邻, 直接取该像素.
#[inline(always)]
fn analysis_121<F: Fn(usize) -> i32>(at: F, i: usize) -> i32 {
    if i == 0 {
        at(0) << 2
    } else {
        at(2 * i - 1) + 2 * at(2 * i) + at(2 * i + 1)
    }
}

/// 半分辨率到全分辨率的线性上采样抽头, 权重和为 2
///
/// 偶数坐标直接落在低频采样上, 奇数坐标取左右平均;
/// 最后一列没有右邻, 用 `3a - b` 单侧外推.
#[inline(always)]
fn upsample_taps(x: usize, n: usize) -> [(usize, i32); 2] {
    let i = x >> 1;
    if x & 1 == 0 || n == 1 {
        [(i, 2), (i, 0)]
    } else if i + 1 < n {
        [(i, 1), (i + 1, 1)]
    } else {
        [(i, 3), (i - 1, -1)]
    }
}

/// 在 `(x, y)` 处上采样低频子带, 结果放大 4 倍
#[inline(always)]
fn upsample(ll: &[i32], n: usize, tx: [(usize, i32); 2], ty: [(usize, i32); 2]) -> i32 {
    let mut acc = 0;
    for (jy, wy) in ty {
        for (ix, wx) in tx {
            acc += wy * wx * ll[jy * n + ix];
        }
    }
    acc
}

/// 多分辨率混合核心
///
/// `sample(k, x, y)` 给出角 `k` 图像在 `(x, y)` 处放大 `1 << extra`
/// 倍的值. 每个角先求低频子带 (半分辨率, 重叠的 `[1 2 1]` 滤波),
/// 低频子带在半分辨率上做双线性混合, 再线性上采样; 高频取本象限角点:
/// `src_q + up(混合低频) - up(低频_q)`. 结果写入 `out` (步长为块宽,
/// 未饱和).
pub(crate) fn multires_core<F>(
    out: &mut [i32],
    sample: F,
    extra: u32,
    log_xblk_sz: u32,
    log_yblk_sz: u32,
) where
    F: Fn(usize, usize, usize) -> i32,
{
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let (nx, ny) = (w >> 1, h >> 1);
    let l = log_xblk_sz + log_yblk_sz;
    let round = 1 << (l - 1);

    let mut src_ll = [[0i32; MAX_LL_SIZE * MAX_LL_SIZE]; 4];
    for (k, ll) in src_ll.iter_mut().enumerate() {
        let row = |y: usize, i: usize| analysis_121(|x| sample(k, x, y), i);
        let ll_round = 8 << extra;
        for j in 0..ny {
            for i in 0..nx {
                let v = analysis_121(|y| row(y, i), j);
                ll[j * nx + i] = (v + ll_round) >> (4 + extra);
            }
        }
    }

    // 混合后的低频放大 1 << (l - 2) 倍
    let mut dst_ll = [0i32; MAX_LL_SIZE * MAX_LL_SIZE];
    for j in 0..ny {
        for i in 0..nx {
            let o = j * nx + i;
            let (fi, fj) = (i as i32, j as i32);
            let a = (src_ll[0][o] << (log_xblk_sz - 1)) + (src_ll[1][o] - src_ll[0][o]) * fi;
            let b = (src_ll[3][o] << (log_xblk_sz - 1)) + (src_ll[2][o] - src_ll[3][o]) * fi;
            dst_ll[o] = (a << (log_yblk_sz - 1)) + (b - a) * fj;
        }
    }

    for y in 0..h {
        let ty = upsample_taps(y, ny);
        for x in 0..w {
            let tx = upsample_taps(x, nx);
            let q = quadrant_corner(x >= nx, y >= ny);
            let base = sample(q, x, y) << (l - extra);
            let low = upsample(&dst_ll, nx, tx, ty);
            let own = upsample(&src_ll[q], nx, tx, ty) << (l - 2);
            out[y * w + x] = (base + low - own + round) >> l;
        }
    }
}

/// 多分辨率混合
#[allow(clippy::too_many_arguments)]
pub fn blend_multi<T: Pixel>(
    dst: &mut [T],
    dst_stride: usize,
    src: [&[T]; 4],
    log_xblk_sz: u32,
    log_yblk_sz: u32,
    bit_depth: u32,
) {
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let max = (1 << bit_depth) - 1;
    let mut out = [0i32; MAX_BLOCK_AREA];
    multires_core(
        &mut out,
        |k, x, y| src[k][y * w + x].to_i32(),
        0,
        log_xblk_sz,
        log_yblk_sz,
    );
    for j in 0..h {
        for i in 0..w {
            dst[j * dst_stride + i] = T::from_i32(out[j * w + i].clamp(0, max));
        }
    }
}

/// 带细分修正的多分辨率混合
///
/// 未细分边远端角的图像先与外角图像在像素域相加 (其余角与自身相加),
/// 低频与高频都取这对图像的平均.
#[allow(clippy::too_many_arguments)]
pub fn blend_multi_split<T: Pixel>(
    dst: &mut [T],
    dst_stride: usize,
    src: [&[T]; 4],
    c: usize,
    s: u8,
    log_xblk_sz: u32,
    log_yblk_sz: u32,
    bit_depth: u32,
) {
    let w = 1usize << log_xblk_sz;
    let h = 1usize << log_yblk_sz;
    let max = (1 << bit_depth) - 1;
    let partner = [
        detail_partner(c, s, 0),
        detail_partner(c, s, 1),
        detail_partner(c, s, 2),
        detail_partner(c, s, 3),
    ];
    let mut out = [0i32; MAX_BLOCK_AREA];
    multires_core(
        &mut out,
        |k, x, y| {
            let o = y * w + x;
            src[k][o].to_i32() + src[partner[k]][o].to_i32()
        },
        1,
        log_xblk_sz,
        log_yblk_sz,
    );
    for j in 0..h {
        for i in 0..w {
            dst[j * dst_stride + i] = T::from_i32(out[j * w + i].clamp(0, max));
        }
    }
}
