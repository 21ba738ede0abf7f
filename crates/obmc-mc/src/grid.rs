//! 运动向量网格.
//!
//! 每 4 个亮度像素一个网格点, 覆盖 `(nhmbs + 1) * 4 + 1` 列 x
//! `(nvmbs + 1) * 4 + 1` 行. 网格在左/上各有 2 个单位的边界,
//! 网格坐标 `v` 对应平面像素 `(v - 2) << (2 - dec)`.

use obmc_core::consts::{LOG_GRID_UNIT, LOG_MB_GRID_UNITS};
use obmc_core::{MotionVector, ObmcError, ObmcResult, RefFrame};

/// 网格点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridPoint {
    /// 运动向量 (1/8 亮度像素)
    pub mv: MotionVector,
    /// 向量是否已解码/赋值
    pub valid: bool,
    /// 参考帧
    pub reference: RefFrame,
    /// 右侧边采用向量插值 (否则为混合)
    pub edge_right: bool,
    /// 下方边采用向量插值 (否则为混合)
    pub edge_down: bool,
}

/// 运动向量网格
#[derive(Debug, Clone)]
pub struct MvGrid {
    nhmbs: usize,
    nvmbs: usize,
    cols: usize,
    rows: usize,
    points: Vec<GridPoint>,
}

impl MvGrid {
    /// 按宏块数创建网格, 所有点为无效零向量
    pub fn new(nhmbs: usize, nvmbs: usize) -> ObmcResult<Self> {
        if nhmbs == 0 || nvmbs == 0 {
            return Err(ObmcError::InvalidArgument(format!(
                "宏块数不能为 0: {nhmbs}x{nvmbs}"
            )));
        }
        let cols = ((nhmbs + 1) << LOG_MB_GRID_UNITS) + 1;
        let rows = ((nvmbs + 1) << LOG_MB_GRID_UNITS) + 1;
        Ok(Self {
            nhmbs,
            nvmbs,
            cols,
            rows,
            points: vec![GridPoint::default(); cols * rows],
        })
    }

    /// 为给定亮度帧尺寸创建网格 (宏块数向上取整)
    pub fn for_frame(width: usize, height: usize) -> ObmcResult<Self> {
        let mb = 1usize << (LOG_MB_GRID_UNITS + LOG_GRID_UNIT);
        Self::new(width.div_ceil(mb), height.div_ceil(mb))
    }

    /// 水平宏块数
    pub fn nhmbs(&self) -> usize {
        self.nhmbs
    }

    /// 垂直宏块数
    pub fn nvmbs(&self) -> usize {
        self.nvmbs
    }

    /// 网格列数
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 网格行数
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 帧驱动遍历的顶层块数 (水平, 垂直)
    pub fn top_blocks(&self) -> (usize, usize) {
        (self.nhmbs + 1, self.nvmbs + 1)
    }

    /// 清空为帧起始状态
    pub fn reset(&mut self) {
        self.points.fill(GridPoint::default());
    }

    /// 坐标是否位于网格内
    pub fn contains(&self, vx: isize, vy: isize) -> bool {
        vx >= 0 && vy >= 0 && (vx as usize) < self.cols && (vy as usize) < self.rows
    }

    /// 读取网格点
    ///
    /// 越界访问是调用方的逻辑错误, 直接 panic.
    #[inline]
    pub fn get(&self, vx: usize, vy: usize) -> &GridPoint {
        assert!(
            vx < self.cols && vy < self.rows,
            "网格访问越界: ({vx}, {vy}), 网格 {}x{}",
            self.cols,
            self.rows
        );
        &self.points[vy * self.cols + vx]
    }

    /// 读取网格点 (可变)
    #[inline]
    pub fn get_mut(&mut self, vx: usize, vy: usize) -> &mut GridPoint {
        assert!(
            vx < self.cols && vy < self.rows,
            "网格访问越界: ({vx}, {vy}), 网格 {}x{}",
            self.cols,
            self.rows
        );
        &mut self.points[vy * self.cols + vx]
    }

    /// 带符号坐标读取, 网格外返回 `None`
    pub fn try_get(&self, vx: isize, vy: isize) -> Option<&GridPoint> {
        if self.contains(vx, vy) {
            Some(&self.points[vy as usize * self.cols + vx as usize])
        } else {
            None
        }
    }

    /// 赋值并标记为有效
    pub fn set_mv(&mut self, vx: usize, vy: usize, mv: MotionVector, reference: RefFrame) {
        let pt = self.get_mut(vx, vy);
        pt.mv = mv;
        pt.reference = reference;
        pt.valid = true;
    }

    /// 设置右/下边的插值方式
    pub fn set_edges(&mut self, vx: usize, vy: usize, edge_right: bool, edge_down: bool) {
        let pt = self.get_mut(vx, vy);
        pt.edge_right = edge_right;
        pt.edge_down = edge_down;
    }

    /// 将所有点的边标记为向量插值或混合
    pub fn set_all_edges(&mut self, vector_interpolated: bool) {
        for pt in &mut self.points {
            pt.edge_right = vector_interpolated;
            pt.edge_down = vector_interpolated;
        }
    }

    /// 块中心点是否有效, 即该块是否继续细分
    ///
    /// `log_mvb_sz == 0` 的块没有中心点, 总是叶子.
    #[inline]
    pub fn is_midpoint_valid(&self, vx: usize, vy: usize, log_mvb_sz: u32) -> bool {
        if log_mvb_sz == 0 {
            return false;
        }
        let half = 1usize << (log_mvb_sz - 1);
        self.get(vx + half, vy + half).valid
    }

    /// 所有有效点中最大的向量分量绝对值
    pub fn max_abs_mv(&self) -> i32 {
        self.points
            .iter()
            .filter(|pt| pt.valid)
            .map(|pt| pt.mv.max_abs())
            .max()
            .unwrap_or(0)
    }

    /// 按行优先遍历 `(vx, vy, point)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &GridPoint)> {
        let cols = self.cols;
        self.points
            .iter()
            .enumerate()
            .map(move |(i, pt)| (i % cols, i / cols, pt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions() {
        let grid = MvGrid::new(2, 1).unwrap();
        assert_eq!(grid.cols(), 13);
        assert_eq!(grid.rows(), 9);
        assert_eq!(grid.top_blocks(), (3, 2));

        let grid = MvGrid::for_frame(33, 16).unwrap();
        assert_eq!(grid.nhmbs(), 3);
        assert_eq!(grid.nvmbs(), 1);
        assert!(MvGrid::new(0, 1).is_err());
    }

    #[test]
    fn test_midpoint_and_reset() {
        let mut grid = MvGrid::new(1, 1).unwrap();
        assert!(!grid.is_midpoint_valid(0, 0, 2));
        grid.set_mv(2, 2, MotionVector::new(3, -1), RefFrame::Golden);
        assert!(grid.is_midpoint_valid(0, 0, 2));
        assert!(!grid.is_midpoint_valid(0, 0, 0));
        assert_eq!(grid.max_abs_mv(), 3);

        grid.reset();
        assert_eq!(*grid.get(2, 2), GridPoint::default());
    }

    #[test]
    fn test_try_get_网格外() {
        let grid = MvGrid::new(1, 1).unwrap();
        assert!(grid.try_get(-1, 0).is_none());
        assert!(grid.try_get(0, 9).is_none());
        assert!(grid.try_get(8, 8).is_some());
    }

    #[test]
    #[should_panic]
    fn test_get_越界_panic() {
        let grid = MvGrid::new(1, 1).unwrap();
        let _ = grid.get(9, 0);
    }
}
