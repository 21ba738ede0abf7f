//! 几何表.
//!
//! 块顶点编号: 0 = 左上, 1 = 右上, 2 = 右下, 3 = 左下 (顺时针).
//! 边 `k` 从顶点 `k` 指向顶点 `k + 1`. 所有表都对旋转 `k -> k + r (mod 4)`
//! 对称, 因此大部分由公式生成而不是逐项列出.

/// 顶点相对块左上角的水平偏移 (块边长为单位)
pub const VERT_DX: [i32; 4] = [0, 1, 1, 0];

/// 顶点相对块左上角的垂直偏移
pub const VERT_DY: [i32; 4] = [0, 0, 1, 1];

/// 顶点层级, 按 `(vy & 3, vx & 3)` 索引
///
/// 0 级为宏块角点, 1 级为宏块中心, 2 级为宏块边中点,
/// 3/4 级为下一层的中心与边中点.
pub const MC_LEVEL: [[u32; 4]; 4] = [[0, 4, 2, 4], [4, 3, 4, 3], [2, 4, 1, 4], [4, 3, 4, 3]];

/// 旋转后的向量插值公式使用的角点下标
///
/// 每行给出基准方向下四个角各取哪个角点的向量, 实际下标为
/// `(MIDXS[m][(k - r) & 3] + r) & 3`.
pub const MIDXS: [[usize; 4]; 8] = [
    [0, 1, 2, 3],
    [0, 0, 2, 3],
    [1, 1, 2, 3],
    [0, 0, 3, 3],
    [1, 1, 2, 2],
    [0, 1, 0, 0],
    [2, 1, 2, 2],
    [0, 1, 1, 1],
];

/// 顶点 `k` 旋转 `r` 步
#[inline(always)]
pub const fn rot(k: usize, r: usize) -> usize {
    (k + r) & 3
}

/// 网格点的顶点层级
#[inline]
pub fn vertex_level(vx: usize, vy: usize) -> u32 {
    MC_LEVEL[vy & 3][vx & 3]
}

/// 给定顶点层级下相邻同级顶点的距离 (网格单位)
#[inline]
pub fn level_step(level: u32) -> usize {
    1 << ((4 - level) >> 1)
}

/// 叶子块四个角点对应的网格偏移 (以块边长为单位)
///
/// `c` 为外角, `s` 的第 0/1 位分别表示边 `c -> c+1`, `c+3 -> c`
/// 所在的父块边已被细分. 未细分时该角取父块上的远端顶点,
/// 即关于外角的镜像 `2 * v_k - v_c`.
pub fn vertex_offsets(c: usize, s: u8) -> [(i32, i32); 4] {
    let mut offsets = [(0, 0); 4];
    for (k, off) in offsets.iter_mut().enumerate() {
        let base = (VERT_DX[k], VERT_DY[k]);
        let unsplit = (k == rot(c, 1) && s & 1 == 0) || (k == rot(c, 3) && s & 2 == 0);
        *off = if unsplit {
            (2 * base.0 - VERT_DX[c], 2 * base.1 - VERT_DY[c])
        } else {
            base
        };
    }
    offsets
}

/// 像素域平均时角点 `k` 所配对的图像
///
/// 未细分边上远端角点的图像与外角图像取平均, 其余角点与自身配对.
/// 多分辨率混合中象限 `k` 的高频细节也来自这一对图像.
#[inline]
pub fn detail_partner(c: usize, s: u8, k: usize) -> usize {
    if (k == rot(c, 1) && s & 1 == 0) || (k == rot(c, 3) && s & 2 == 0) {
        c
    } else {
        k
    }
}

/// 块内像素所在象限对应的角点
#[inline(always)]
pub const fn quadrant_corner(right: bool, bottom: bool) -> usize {
    match (right, bottom) {
        (false, false) => 0,
        (true, false) => 1,
        (true, true) => 2,
        (false, true) => 3,
    }
}
