//! 块内运动向量场的有限差分表示.
//!
//! 向量以 2^-17 平面像素为单位. 对块内像素 `(i, j)`:
//!
//! ```text
//! v(i, j) = (d[0] + j * d[2]) + i * (d[1] + j * d[3])
//! ```
//!
//! `d` 在建立时已经前移到像素中心 `(0.5, 0.5)`.

use obmc_core::consts::{MV_POS_BITS, MV_SCALE_SHIFT};

use crate::geometry::{MIDXS, rot};

/// 双分量向量场
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorField {
    /// 水平分量的差分
    pub dx: [i32; 4],
    /// 垂直分量的差分
    pub dy: [i32; 4],
}

impl VectorField {
    /// 整块使用同一个向量
    pub const fn fixed(mvx: i32, mvy: i32) -> Self {
        Self {
            dx: [mvx, 0, 0, 0],
            dy: [mvy, 0, 0, 0],
        }
    }

    /// 由四个角点向量建立插值向量场
    ///
    /// `m` 为 [`MIDXS`] 的行号, `r` 为旋转量.
    pub fn interpolated(
        mvx: &[i32; 4],
        mvy: &[i32; 4],
        m: usize,
        r: usize,
        log_xblk_sz: u32,
        log_yblk_sz: u32,
    ) -> Self {
        Self {
            dx: setup_component(mvx, &MIDXS[m], r, log_xblk_sz, log_yblk_sz),
            dy: setup_component(mvy, &MIDXS[m], r, log_xblk_sz, log_yblk_sz),
        }
    }

    /// 向量场是否退化为常量
    pub fn is_fixed(&self) -> bool {
        self.dx[1..] == [0; 3] && self.dy[1..] == [0; 3]
    }

    /// 常量向量场对应的 1/8 平面像素向量
    pub fn fixed_eighth_pel(&self) -> (i32, i32) {
        (self.dx[0] >> MV_SCALE_SHIFT, self.dy[0] >> MV_SCALE_SHIFT)
    }

    /// 加上逐像素步进, 得到采样坐标的差分
    ///
    /// 返回值的 `[0]` 为 `(0, 0)` 像素的位置, 单位 2^-17 平面像素.
    pub fn positions(&self) -> ([i32; 4], [i32; 4]) {
        let mut px = self.dx;
        let mut py = self.dy;
        px[1] += 1 << MV_POS_BITS;
        py[2] += 1 << MV_POS_BITS;
        (px, py)
    }
}

/// 建立单个分量的有限差分
///
/// 先按旋转后的角点取值, 再把起点移到第一个像素的中心:
/// 半个行步进, 半个列步进, 以及交叉项带来的修正.
fn setup_component(mvs: &[i32; 4], m: &[usize; 4], r: usize, lx: u32, ly: u32) -> [i32; 4] {
    let corner = |k: usize| mvs[rot(m[(k + 4 - r) & 3], r)];
    let (m0, m1, m2, m3) = (corner(0), corner(1), corner(2), corner(3));
    let mut d = [
        m0,
        (m1 - m0) >> lx,
        (m3 - m0) >> ly,
        (m0 + m2 - m1 - m3) >> (lx + ly),
    ];
    d[0] += d[2] >> 1;
    d[1] += d[3] >> 1;
    d[0] += d[1] >> 1;
    d[2] += d[3] >> 1;
    d
}
