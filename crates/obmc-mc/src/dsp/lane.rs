//! 8 通道分块内核.
//!
//! 把一行拆成 8 个样本一组, 组内运算写成定长数组上的逐通道循环,
//! 便于编译器生成向量指令. 块宽小于 8 时回退到标量实现.

use obmc_core::consts::{FILTER_BITS, FILTER_TAPS, FILTER_TOP_APRON, MV_FRAC_BITS, SUBPEL_FILTERS};
use obmc_core::{Pixel, Plane};

use super::McKernels;
use crate::blend::{self, SplitWeights};
use crate::interp::{self, FilterRange, TMP_CAPACITY};

const LANES: usize = 8;

/// 分块内核集
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneKernels;

#[inline(always)]
fn load<T: Pixel>(src: &[T]) -> [i32; LANES] {
    std::array::from_fn(|l| src[l].to_i32())
}

#[allow(clippy::too_many_arguments)]
impl<T: Pixel> McKernels<T> for LaneKernels {
    fn name(&self) -> &'static str {
        "lane"
    }

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
        let w = 1usize << log_xblk_sz;
        let h = 1usize << log_yblk_sz;
        let fx = (mvx & ((1 << MV_FRAC_BITS) - 1)) as usize;
        let fy = (mvy & ((1 << MV_FRAC_BITS) - 1)) as usize;
        if w < LANES || (fx == 0 && fy == 0) {
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
            return;
        }

        let bx = x0 + (mvx >> MV_FRAC_BITS) as isize;
        let by = y0 + (mvy >> MV_FRAC_BITS) as isize;
        let range = FilterRange::new(src.cfg.bit_depth);
        let mut tmp = [0i32; TMP_CAPACITY];
        let (top, rows) = if fy == 0 {
            (0, h)
        } else {
            (FILTER_TOP_APRON, h + FILTER_TAPS - 1)
        };

        let htaps = &SUBPEL_FILTERS[fx];
        for r in 0..rows {
            let y = by + r as isize - top as isize;
            let out = &mut tmp[r * w..(r + 1) * w];
            if fx == 0 {
                let row = src.row_slice(bx, y, w);
                for (o, seg) in out.chunks_exact_mut(LANES).zip(row.chunks_exact(LANES)) {
                    let p = load(seg);
                    for l in 0..LANES {
                        o[l] = (p[l] - range.bias) << FILTER_BITS;
                    }
                }
            } else {
                let row = src.row_slice(bx - FILTER_TOP_APRON as isize, y, w + FILTER_TAPS - 1);
                for (c, o) in out.chunks_exact_mut(LANES).enumerate() {
                    let base = c * LANES;
                    let mut acc = [-range.h_offset(); LANES];
                    for (k, &tap) in htaps.iter().enumerate() {
                        let p = load(&row[base + k..]);
                        for l in 0..LANES {
                            acc[l] += tap * p[l];
                        }
                    }
                    o.copy_from_slice(&acc);
                }
            }
        }

        let vtaps = &SUBPEL_FILTERS[fy];
        for j in 0..h {
            let out = &mut dst[j * dst_stride..j * dst_stride + w];
            for (c, o) in out.chunks_exact_mut(LANES).enumerate() {
                let base = c * LANES;
                if fy == 0 {
                    let t = &tmp[j * w + base..j * w + base + LANES];
                    for l in 0..LANES {
                        o[l] = T::from_i32(range.finish_copy(t[l]));
                    }
                } else {
                    let mut acc = [0i32; LANES];
                    for (k, &tap) in vtaps.iter().enumerate() {
                        let t = &tmp[(j + k) * w + base..(j + k) * w + base + LANES];
                        for l in 0..LANES {
                            acc[l] += tap * t[l];
                        }
                    }
                    for l in 0..LANES {
                        o[l] = T::from_i32(range.finish(acc[l]));
                    }
                }
            }
        }
    }

    fn blend_full(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        src: [&[T]; 4],
        log_xblk_sz: u32,
        log_yblk_sz: u32,
    ) {
        let w = 1usize << log_xblk_sz;
        if w < LANES {
            blend::blend_full(dst, dst_stride, src, log_xblk_sz, log_yblk_sz);
            return;
        }
        let h = 1usize << log_yblk_sz;
        let shift = log_xblk_sz + log_yblk_sz;
        let round = 1 << (shift - 1);
        for j in 0..h {
            let out = &mut dst[j * dst_stride..j * dst_stride + w];
            for (c, o) in out.chunks_exact_mut(LANES).enumerate() {
                let off = j * w + c * LANES;
                let p0 = load(&src[0][off..]);
                let p1 = load(&src[1][off..]);
                let p2 = load(&src[2][off..]);
                let p3 = load(&src[3][off..]);
                for l in 0..LANES {
                    let i = (c * LANES + l) as i32;
                    let a = (p0[l] << log_xblk_sz) + (p1[l] - p0[l]) * i;
                    let b = (p3[l] << log_xblk_sz) + (p2[l] - p3[l]) * i;
                    o[l] = T::from_i32(((a << log_yblk_sz) + (b - a) * j as i32 + round) >> shift);
                }
            }
        }
    }

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
        let w = 1usize << log_xblk_sz;
        if w < LANES {
            blend::blend_full_split(dst, dst_stride, src, c, s, log_xblk_sz, log_yblk_sz);
            return;
        }
        let h = 1usize << log_yblk_sz;
        let shift = log_xblk_sz + log_yblk_sz + 1;
        let round = 1 << (shift - 1);
        let wt = SplitWeights::new(c, s, log_xblk_sz, log_yblk_sz);
        for j in 0..h {
            let jj = j as i32;
            // 行内权重关于 i 线性: w = row0 + step * i
            let row0: [i32; 4] = std::array::from_fn(|k| wt.s0[k] + wt.dsdj[k] * jj);
            let step: [i32; 4] = std::array::from_fn(|k| wt.dsdi[k] + wt.dd[k] * jj);
            let out = &mut dst[j * dst_stride..j * dst_stride + w];
            for (ci, o) in out.chunks_exact_mut(LANES).enumerate() {
                let off = j * w + ci * LANES;
                let p0 = load(&src[0][off..]);
                let mut acc: [i32; LANES] = std::array::from_fn(|l| p0[l] << shift);
                for k in 1..4 {
                    let pk = load(&src[k][off..]);
                    for l in 0..LANES {
                        let i = (ci * LANES + l) as i32;
                        acc[l] += (pk[l] - p0[l]) * (row0[k] + step[k] * i);
                    }
                }
                for l in 0..LANES {
                    o[l] = T::from_i32((acc[l] + round) >> shift);
                }
            }
        }
    }
}
