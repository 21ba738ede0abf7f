//! 邻域运动向量预测.
//!
//! 为尚未编码的网格顶点给出预测向量, 参考帧投票以及分裂标志的
//! 熵编码上下文. 邻域几何由顶点层级决定:
//!
//! - 0 级: 左上, 上, 右上, 左 (宏块间距)
//! - 奇数级: 四个对角, 间距为本级块长 (菱形)
//! - 偶数级: 上, 左, 右, 下 (方形), 越过宏块边界的右/下邻居被排除
//!
//! 网格外的邻居视为有效的零向量哨兵, 可匹配任何参考帧.

use obmc_core::consts::MB_GRID_UNITS;
use obmc_core::{MotionVector, RefFrame};

use crate::geometry::level_step;
use crate::grid::MvGrid;

/// 邻居最大个数
const MAX_NEIGHBORS: usize = 4;

/// 一个邻居的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Neighbor {
    /// 网格外的零向量哨兵
    Sentinel,
    /// 网格内尚未赋值的点
    Invalid,
    /// 网格内的有效点
    Valid(MotionVector, RefFrame),
}

impl Neighbor {
    fn vector(self) -> Option<MotionVector> {
        match self {
            Neighbor::Sentinel => Some(MotionVector::ZERO),
            Neighbor::Valid(mv, _) => Some(mv),
            Neighbor::Invalid => None,
        }
    }
}

/// 邻居网格偏移, 返回 `(偏移表, 个数)`
fn neighbor_offsets(vx: usize, vy: usize, level: u32) -> ([(isize, isize); MAX_NEIGHBORS], usize) {
    let mut offs = [(0, 0); MAX_NEIGHBORS];
    if level == 0 {
        let d = MB_GRID_UNITS as isize;
        offs = [(-d, -d), (0, -d), (d, -d), (-d, 0)];
        return (offs, MAX_NEIGHBORS);
    }
    let m = level_step(level) as isize;
    if level & 1 != 0 {
        offs = [(-m, -m), (m, -m), (-m, m), (m, m)];
        return (offs, MAX_NEIGHBORS);
    }
    offs[0] = (0, -m);
    offs[1] = (-m, 0);
    let mut n = 2;
    // 右/下邻居不能越过所在宏块的下一条边界
    if vx + (m as usize) <= (vx + 3) & !3 {
        offs[n] = (m, 0);
        n += 1;
    }
    if vy + (m as usize) <= (vy + 3) & !3 {
        offs[n] = (0, m);
        n += 1;
    }
    (offs, n)
}

/// 收集邻居
fn gather(grid: &MvGrid, vx: usize, vy: usize, level: u32) -> ([Neighbor; MAX_NEIGHBORS], usize) {
    let (offs, n) = neighbor_offsets(vx, vy, level);
    let mut out = [Neighbor::Invalid; MAX_NEIGHBORS];
    for (slot, &(dx, dy)) in out.iter_mut().zip(&offs[..n]) {
        *slot = match grid.try_get(vx as isize + dx, vy as isize + dy) {
            None => Neighbor::Sentinel,
            Some(pt) if pt.valid => Neighbor::Valid(pt.mv, pt.reference),
            Some(_) => Neighbor::Invalid,
        };
    }
    (out, n)
}

/// 除以 2 的幂, 舍入到最近值, 恰为一半时舍入到偶数
#[inline]
pub fn div_pow2_round_even(x: i32, shift: u32) -> i32 {
    if shift == 0 {
        return x;
    }
    (x + ((x >> shift) & 1) + (((1 << shift) - 1) >> 1)) >> shift
}

/// 几何中值: L1 距离和最小者, 相同时取下标最小者
fn geometric_median(cands: &[MotionVector]) -> Option<MotionVector> {
    let mut best: Option<(i64, MotionVector)> = None;
    for &a in cands {
        let cost: i64 = cands.iter().map(|&b| a.l1_distance(b)).sum();
        if best.is_none_or(|(c, _)| cost < c) {
            best = Some((cost, a));
        }
    }
    best.map(|(_, mv)| mv)
}

/// 预测顶点 `(vx, vy)` 的运动向量
///
/// 只使用参考帧为 `reference` 的邻居 (哨兵总是匹配). 返回缩放到
/// `mv_res` 精度的预测值, 以及同精度下与预测值相等的候选个数.
/// 没有候选时返回零向量与 0.
pub fn predict_mv(
    grid: &MvGrid,
    vx: usize,
    vy: usize,
    level: u32,
    mv_res: u32,
    reference: RefFrame,
) -> (MotionVector, usize) {
    let (neighbors, n) = gather(grid, vx, vy, level);
    let mut cands = [MotionVector::ZERO; MAX_NEIGHBORS];
    let mut count = 0;
    for nb in &neighbors[..n] {
        let mv = match *nb {
            Neighbor::Sentinel => MotionVector::ZERO,
            Neighbor::Valid(mv, r) if r == reference => mv,
            _ => continue,
        };
        cands[count] = mv;
        count += 1;
    }
    let cands = &cands[..count];
    let Some(median) = geometric_median(cands) else {
        return (MotionVector::ZERO, 0);
    };
    let scale = |mv: MotionVector| mv.map(|c| div_pow2_round_even(c, mv_res));
    let pred = scale(median);
    let equal = cands.iter().filter(|&&c| scale(c) == pred).count();
    (pred, equal)
}

/// 邻居参考帧的多数投票, 票数相同时取先出现者, 无有效邻居时为 `Prev`
pub fn predict_reference(grid: &MvGrid, vx: usize, vy: usize, level: u32) -> RefFrame {
    let (neighbors, n) = gather(grid, vx, vy, level);
    let mut votes = [0usize; RefFrame::ALL.len()];
    let voters = neighbors[..n].iter().filter_map(|nb| match *nb {
        Neighbor::Valid(_, r) => Some(r),
        _ => None,
    });
    for r in voters.clone() {
        votes[r.index()] += 1;
    }
    let mut best = RefFrame::Prev;
    let mut best_votes = 0;
    for r in voters {
        if votes[r.index()] > best_votes {
            best = r;
            best_votes = votes[r.index()];
        }
    }
    best
}

/// 分裂标志的熵编码上下文, 取值 `0..SPLIT_CTXS`
///
/// `3 * (左侧同级顶点有效 + 上方同级顶点有效) + (邻居 0/3 相等) + (邻居 1/2 相等)`.
pub fn split_flag_context(grid: &MvGrid, vx: usize, vy: usize, level: u32) -> u8 {
    let step = 2 * level_step(level) as isize;
    let valid_at = |x: isize, y: isize| grid.try_get(x, y).is_some_and(|pt| pt.valid);
    let long_a = valid_at(vx as isize - step, vy as isize);
    let long_b = valid_at(vx as isize, vy as isize - step);

    let (neighbors, n) = gather(grid, vx, vy, level);
    let same = |a: usize, b: usize| {
        a < n
            && b < n
            && matches!(
                (neighbors[a].vector(), neighbors[b].vector()),
                (Some(u), Some(v)) if u == v
            )
    };
    3 * (u8::from(long_a) + u8::from(long_b)) + u8::from(same(0, 3)) + u8::from(same(1, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use obmc_core::consts::SPLIT_CTXS;

    #[test]
    fn test_div_pow2_round_even() {
        assert_eq!(div_pow2_round_even(7, 0), 7);
        assert_eq!(div_pow2_round_even(3, 1), 2);
        assert_eq!(div_pow2_round_even(5, 1), 2);
        assert_eq!(div_pow2_round_even(7, 1), 4);
        assert_eq!(div_pow2_round_even(-3, 1), -2);
        assert_eq!(div_pow2_round_even(-1, 1), 0);
        assert_eq!(div_pow2_round_even(12, 2), 3);
        assert_eq!(div_pow2_round_even(-6, 2), -2);
    }

    #[test]
    fn test_邻居几何() {
        let (offs, n) = neighbor_offsets(4, 4, 0);
        assert_eq!(n, 4);
        assert_eq!(offs, [(-4, -4), (0, -4), (4, -4), (-4, 0)]);
        let (offs, n) = neighbor_offsets(6, 6, 1);
        assert_eq!(n, 4);
        assert_eq!(offs[3], (2, 2));
        // 宏块边中点 (6, 4): 下邻居越过宏块边界? (4+2) <= (4+3)&!3 = 4 不成立
        let (offs, n) = neighbor_offsets(6, 4, 2);
        assert_eq!(n, 3);
        assert_eq!(&offs[..3], &[(0, -2), (-2, 0), (2, 0)]);
        let (_, n) = neighbor_offsets(5, 5, 4);
        assert_eq!(n, 4);
    }

    #[test]
    fn test_对称两对取先出现者() {
        let mut grid = MvGrid::new(1, 1).unwrap();
        let a = MotionVector::new(8, 0);
        let b = MotionVector::new(0, 8);
        grid.set_mv(4, 4, a, RefFrame::Prev);
        grid.set_mv(8, 4, b, RefFrame::Prev);
        grid.set_mv(4, 8, b, RefFrame::Prev);
        grid.set_mv(8, 8, a, RefFrame::Prev);
        assert_eq!(predict_mv(&grid, 6, 6, 1, 0, RefFrame::Prev), (a, 2));
        // 交换后结果跟随下标顺序
        grid.set_mv(4, 4, b, RefFrame::Prev);
        grid.set_mv(8, 8, b, RefFrame::Prev);
        grid.set_mv(8, 4, a, RefFrame::Prev);
        grid.set_mv(4, 8, a, RefFrame::Prev);
        assert_eq!(predict_mv(&grid, 6, 6, 1, 0, RefFrame::Prev), (b, 2));
    }

    #[test]
    fn test_中值与精度缩放() {
        let mut grid = MvGrid::new(1, 1).unwrap();
        grid.set_mv(4, 4, MotionVector::new(11, 2), RefFrame::Prev);
        grid.set_mv(8, 4, MotionVector::new(12, 2), RefFrame::Prev);
        grid.set_mv(4, 8, MotionVector::new(40, -30), RefFrame::Prev);
        grid.set_mv(8, 8, MotionVector::new(9, 2), RefFrame::Golden);
        // Golden 被过滤, 剩余三者中 (12, 2) 距离和最小
        let (pred, equal) = predict_mv(&grid, 6, 6, 1, 0, RefFrame::Prev);
        assert_eq!(pred, MotionVector::new(12, 2));
        assert_eq!(equal, 1);
        // 降低精度后 (11, 2) 与 (12, 2) 都变为 (6, 1)
        let (pred, equal) = predict_mv(&grid, 6, 6, 1, 1, RefFrame::Prev);
        assert_eq!(pred, MotionVector::new(6, 1));
        assert_eq!(equal, 2);
    }

    #[test]
    fn test_网格外哨兵() {
        let grid = MvGrid::new(1, 1).unwrap();
        assert_eq!(
            predict_mv(&grid, 0, 0, 0, 0, RefFrame::Golden),
            (MotionVector::ZERO, 4)
        );
        // 网格内全部无效: 没有候选
        assert_eq!(
            predict_mv(&grid, 6, 6, 1, 0, RefFrame::Prev),
            (MotionVector::ZERO, 0)
        );
    }

    #[test]
    fn test_参考帧投票() {
        let mut grid = MvGrid::new(1, 1).unwrap();
        assert_eq!(predict_reference(&grid, 6, 6, 1), RefFrame::Prev);
        grid.set_mv(4, 4, MotionVector::ZERO, RefFrame::Golden);
        grid.set_mv(8, 4, MotionVector::ZERO, RefFrame::Next);
        assert_eq!(predict_reference(&grid, 6, 6, 1), RefFrame::Golden);
        grid.set_mv(8, 8, MotionVector::ZERO, RefFrame::Next);
        assert_eq!(predict_reference(&grid, 6, 6, 1), RefFrame::Next);
    }

    #[test]
    fn test_分裂上下文() {
        let mut grid = MvGrid::new(2, 2).unwrap();
        // (6, 6) 为 1 级, 同级顶点间距 4, 长程顶点在 (2, 6) 与 (6, 2)
        assert_eq!(split_flag_context(&grid, 6, 6, 1), 0);
        grid.set_mv(2, 6, MotionVector::ZERO, RefFrame::Prev);
        assert_eq!(split_flag_context(&grid, 6, 6, 1), 3);
        grid.set_mv(6, 2, MotionVector::ZERO, RefFrame::Prev);
        assert_eq!(split_flag_context(&grid, 6, 6, 1), 6);
        // 对角邻居 0/3 相等, 1/2 一个无效
        grid.set_mv(4, 4, MotionVector::new(1, 1), RefFrame::Prev);
        grid.set_mv(8, 8, MotionVector::new(1, 1), RefFrame::Prev);
        grid.set_mv(8, 4, MotionVector::new(2, 2), RefFrame::Prev);
        assert_eq!(split_flag_context(&grid, 6, 6, 1), 7);
        grid.set_mv(4, 8, MotionVector::new(2, 2), RefFrame::Prev);
        assert_eq!(split_flag_context(&grid, 6, 6, 1), 8);
        assert!((split_flag_context(&grid, 6, 6, 1) as usize) < SPLIT_CTXS);
    }
}
