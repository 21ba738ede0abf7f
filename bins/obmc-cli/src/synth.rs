//! 确定性的合成素材: 参考帧与运动向量网格.
//!
//! 网格按顶点层级从 0 到 4 依次生成, 与解码器的赋值顺序一致.
//! 每个新顶点赋值之前先用已有的邻居做一次向量预测, 统计预测命中率
//! 与分裂标志上下文的分布.

use obmc_core::consts::{LOG_MB_GRID_UNITS, MC_LEVEL_MAX, SPLIT_CTXS};
use obmc_core::{MotionVector, ObmcResult, Pixel, Plane, RefFrame};
use obmc_mc::geometry::vertex_level;
use obmc_mc::{MvGrid, predict_mv, predict_reference, split_flag_context};

/// xorshift32 伪随机数
pub struct Rng(u32);

impl Rng {
    pub fn new(seed: u64) -> Self {
        let mixed = (seed as u32) ^ ((seed >> 32) as u32) ^ 0x9E37_79B9;
        Self(mixed | 1)
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// 概率 `num / den` 为真
    pub fn chance(&mut self, num: u32, den: u32) -> bool {
        self.next_u32() % den < num
    }

    /// `[lo, hi]` 内均匀取值
    pub fn range(&mut self, lo: i32, hi: i32) -> i32 {
        let span = (hi - lo + 1).max(1) as u32;
        lo + (self.next_u32() % span) as i32
    }
}

/// 生成网格时的向量预测统计
#[derive(Debug, Clone, Default)]
pub struct GridStats {
    /// 有效顶点数
    pub points: usize,
    /// 预测向量与实际向量完全相同的顶点数
    pub hits: usize,
    /// 预测残差的 L1 范数之和
    pub residual_l1: i64,
    /// 参考帧预测命中数
    pub reference_hits: usize,
    /// 分裂标志上下文直方图
    pub split_contexts: [usize; SPLIT_CTXS],
}

impl GridStats {
    pub fn mean_residual(&self) -> f64 {
        if self.points == 0 {
            0.0
        } else {
            self.residual_l1 as f64 / self.points as f64
        }
    }
}

/// 全局平移加缩放的运动模型, 叠加局部扰动
struct MotionModel {
    pan: (i32, i32),
    zoom: i32,
    noise: i32,
    max_mv: i32,
    center: (i32, i32),
}

impl MotionModel {
    fn new(rng: &mut Rng, grid: &MvGrid, max_mv: i32) -> Self {
        let half = max_mv / 2;
        Self {
            pan: (rng.range(-half, half), rng.range(-half, half)),
            zoom: rng.range(-2, 2),
            noise: (max_mv / 8).max(1),
            max_mv,
            center: (grid.cols() as i32 / 2, grid.rows() as i32 / 2),
        }
    }

    fn sample(&self, rng: &mut Rng, vx: usize, vy: usize) -> MotionVector {
        let dx = (vx as i32 - self.center.0) * self.zoom;
        let dy = (vy as i32 - self.center.1) * self.zoom;
        let x = self.pan.0 + dx + rng.range(-self.noise, self.noise);
        let y = self.pan.1 + dy + rng.range(-self.noise, self.noise);
        MotionVector::new(x, y).map(|c| c.clamp(-self.max_mv, self.max_mv))
    }
}

fn is_valid(grid: &MvGrid, vx: isize, vy: isize) -> bool {
    grid.try_get(vx, vy).is_some_and(|pt| pt.valid)
}

/// 顶点能否有效: 依赖的上一级顶点必须先有效
///
/// 1/3 级是块中心, 3 级还要求所在子块的四个角有效;
/// 2/4 级是边中点, 至少一侧的块已细分才有意义.
fn parents_valid(grid: &MvGrid, vx: usize, vy: usize, level: u32) -> bool {
    let (x, y) = (vx as isize, vy as isize);
    match level {
        0 | 1 => true,
        3 => [(-1, -1), (1, -1), (-1, 1), (1, 1)]
            .iter()
            .all(|&(dx, dy)| is_valid(grid, x + dx, y + dy)),
        _ => {
            let d = if level == 2 { 2 } else { 1 };
            // 水平边的中点看上下两个中心, 竖直边看左右
            let horizontal_edge = vy % (2 * d as usize) == 0;
            let (ax, ay, bx, by) = if horizontal_edge {
                (x, y - d, x, y + d)
            } else {
                (x - d, y, x + d, y)
            };
            is_valid(grid, ax, ay) || is_valid(grid, bx, by)
        }
    }
}

/// 生成覆盖 `width x height` 亮度帧的运动向量网格
///
/// 大部分顶点使用 `reference`, 约八分之一随机改用其它参考帧.
pub fn motion_grid(
    width: usize,
    height: usize,
    seed: u64,
    max_mv: i32,
    reference: RefFrame,
) -> ObmcResult<(MvGrid, GridStats)> {
    let mut grid = MvGrid::for_frame(width, height)?;
    let mut rng = Rng::new(seed);
    let model = MotionModel::new(&mut rng, &grid, max_mv);
    let mut stats = GridStats::default();

    for level in 0..=MC_LEVEL_MAX {
        for vy in 0..grid.rows() {
            for vx in 0..grid.cols() {
                if vertex_level(vx, vy) != level || !parents_valid(&grid, vx, vy, level) {
                    continue;
                }
                let keep = match level {
                    0 => true,
                    1 | 3 => {
                        let ctx = split_flag_context(&grid, vx, vy, level);
                        stats.split_contexts[usize::from(ctx)] += 1;
                        rng.chance(1, 2)
                    }
                    _ => rng.chance(2, 3),
                };
                if !keep {
                    continue;
                }

                let tag = if rng.chance(1, 8) {
                    RefFrame::ALL[rng.next_u32() as usize % RefFrame::ALL.len()]
                } else {
                    reference
                };
                let mv = model.sample(&mut rng, vx, vy);

                let predicted_ref = predict_reference(&grid, vx, vy, level);
                let (pred, _) = predict_mv(&grid, vx, vy, level, 0, tag);
                stats.points += 1;
                stats.hits += usize::from(pred == mv);
                stats.residual_l1 += pred.l1_distance(mv);
                stats.reference_hits += usize::from(predicted_ref == tag);

                grid.set_mv(vx, vy, mv, tag);
                grid.set_edges(vx, vy, rng.chance(1, 2), rng.chance(1, 2));
            }
        }
    }
    log::debug!(
        "合成网格: {}x{} 个顶点, {} 个有效, 宏块 {}x{}",
        grid.cols(),
        grid.rows(),
        stats.points,
        grid.cols() >> LOG_MB_GRID_UNITS,
        grid.rows() >> LOG_MB_GRID_UNITS
    );
    Ok((grid, stats))
}

/// 生成一个参考平面并扩展边界
///
/// 图案由渐变, 8x8 棋盘与细纹理组成, 不同参考帧水平错开若干像素,
/// 不同平面使用不同的相位.
#[allow(clippy::too_many_arguments)]
pub fn reference_plane<T: Pixel>(
    width: usize,
    height: usize,
    dec: u32,
    padding: usize,
    bit_depth: u32,
    plane_index: usize,
    reference: RefFrame,
    seed: u64,
) -> ObmcResult<Plane<T>> {
    let mut plane = Plane::<T>::new(width, height, dec, dec, padding, bit_depth)?;
    let shift = 3 * reference.index();
    let phase = (seed as usize).wrapping_mul(31) + plane_index * 85;
    let up = bit_depth - 8;
    plane.fill_with(|x, y| {
        let xs = x + shift;
        let checker = if (xs / 8 + y / 8) % 2 == 0 { 40 } else { 0 };
        let texture = (xs * 7 + y * 13 + (xs * y) % 11) % 32;
        let v = (xs * 2 + y + checker + texture + phase) % 256;
        T::from_i32((v as i32) << up)
    });
    plane.extend_borders();
    Ok(plane)
}
