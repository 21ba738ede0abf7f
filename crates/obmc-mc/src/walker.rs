//! 四叉树遍历与叶子块预测.
//!
//! [`McContext`] 把只读的运动向量网格, 参考平面, 内核集与配置绑定在
//! 一起. 遍历从顶层块开始, 中心点有效就继续细分; 叶子块先解析外角
//! 与细分状态, 再按边拓扑生成预测计划, 执行 1~4 次插值并混合.

use log::trace;
use obmc_core::consts::{
    GRID_BORDER, LOG_GRID_UNIT, LOG_MB_GRID_UNITS, MAX_BLOCK_AREA, MV_ABS_LIMIT, MV_SCALE_SHIFT,
};
use obmc_core::{CpuFlags, ObmcError, ObmcResult, Pixel, Plane};

use crate::config::McConfig;
use crate::dsp::{McKernels, select_kernels};
use crate::geometry::{VERT_DX, VERT_DY, rot, vertex_offsets};
use crate::grid::{GridPoint, MvGrid};
use crate::setup::VectorField;
use crate::topology::{BlockPlan, CornerSource, TopologyName, plan_block, resolve_edges};

/// 运动补偿上下文
///
/// 预测期间网格与参考平面只读, 上下文可以在线程间共享.
pub struct McContext<'a, T: Pixel> {
    grid: &'a MvGrid,
    reference: &'a Plane<T>,
    kernels: &'static dyn McKernels<T>,
    config: McConfig,
}

impl<'a, T: Pixel> McContext<'a, T> {
    /// 创建上下文, 内核集按 CPU 能力与配置选择
    pub fn new(grid: &'a MvGrid, reference: &'a Plane<T>, config: McConfig) -> ObmcResult<Self> {
        let kernels = select_kernels(CpuFlags::cached(), config.kernels);
        Self::with_kernels(grid, reference, config, kernels)
    }

    /// 使用指定内核集创建上下文
    ///
    /// 校验参考平面尺寸与网格一致, 填充足以覆盖网格中最大的向量.
    pub fn with_kernels(
        grid: &'a MvGrid,
        reference: &'a Plane<T>,
        config: McConfig,
        kernels: &'static dyn McKernels<T>,
    ) -> ObmcResult<Self> {
        let cfg = &reference.cfg;
        let mb = 1usize << (LOG_MB_GRID_UNITS + LOG_GRID_UNIT);
        let expect_w = (grid.nhmbs() * mb) >> cfg.xdec;
        let expect_h = (grid.nvmbs() * mb) >> cfg.ydec;
        if cfg.width != expect_w || cfg.height != expect_h {
            return Err(ObmcError::InvalidArgument(format!(
                "参考平面尺寸 {}x{} 与网格不符, 期望 {expect_w}x{expect_h}",
                cfg.width, cfg.height
            )));
        }
        let max_mv = grid.max_abs_mv();
        if max_mv >= MV_ABS_LIMIT {
            return Err(ObmcError::InvalidData(format!(
                "运动向量分量超出范围: {max_mv}, 上限 {MV_ABS_LIMIT}"
            )));
        }
        let need_x = Plane::<T>::required_padding(max_mv, cfg.xdec);
        let need_y = Plane::<T>::required_padding(max_mv, cfg.ydec);
        if cfg.xpad < need_x || cfg.ypad < need_y {
            return Err(ObmcError::InvalidArgument(format!(
                "参考平面填充不足: {}x{}, 需要 {need_x}x{need_y} (最大向量 {max_mv})",
                cfg.xpad, cfg.ypad
            )));
        }
        trace!(
            "运动补偿上下文: 网格 {}x{}, 平面 {}x{} (dec {}/{}), 内核 {}",
            grid.cols(),
            grid.rows(),
            cfg.width,
            cfg.height,
            cfg.xdec,
            cfg.ydec,
            kernels.name()
        );
        Ok(Self {
            grid,
            reference,
            kernels,
            config,
        })
    }

    /// 运动向量网格
    pub fn grid(&self) -> &MvGrid {
        self.grid
    }

    /// 参考平面
    pub fn reference(&self) -> &Plane<T> {
        self.reference
    }

    /// 配置
    pub fn config(&self) -> &McConfig {
        &self.config
    }

    /// 当前内核集
    pub fn kernels(&self) -> &'static dyn McKernels<T> {
        self.kernels
    }

    /// `log_mvb_sz` 块在本平面上的像素尺寸 (log2)
    pub fn block_log_size(&self, log_mvb_sz: u32) -> (u32, u32) {
        (
            log_mvb_sz + LOG_GRID_UNIT - self.reference.cfg.xdec,
            log_mvb_sz + LOG_GRID_UNIT - self.reference.cfg.ydec,
        )
    }

    /// 网格坐标对应的平面像素坐标
    pub fn block_origin(&self, vx: usize, vy: usize) -> (isize, isize) {
        let cfg = &self.reference.cfg;
        (
            (vx as isize - GRID_BORDER as isize) << (LOG_GRID_UNIT - cfg.xdec),
            (vy as isize - GRID_BORDER as isize) << (LOG_GRID_UNIT - cfg.ydec),
        )
    }

    /// 预测以 `(vx, vy)` 为左上角, 边长 `1 << log_mvb_sz` 网格单位的块
    ///
    /// 中心点有效时递归预测四个子块, 写入输出的对应象限.
    pub fn predict_block(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        vx: usize,
        vy: usize,
        log_mvb_sz: u32,
    ) {
        if self.grid.is_midpoint_valid(vx, vy, log_mvb_sz) {
            let half = 1usize << (log_mvb_sz - 1);
            let (lx, ly) = self.block_log_size(log_mvb_sz - 1);
            for (qx, qy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let off = (qy << ly) * dst_stride + (qx << lx);
                self.predict_block(
                    &mut dst[off..],
                    dst_stride,
                    vx + qx * half,
                    vy + qy * half,
                    log_mvb_sz - 1,
                );
            }
        } else {
            let (c, s) = self.resolve_corner(vx, vy, log_mvb_sz);
            self.predict_block_from_setup(dst, dst_stride, vx, vy, log_mvb_sz, c, s);
        }
    }

    /// 解析叶子块的外角 `c` 与细分状态 `s`
    ///
    /// `s` 的第 0/1 位表示边 `c -> c+1` / `c+3 -> c` 的中点有效,
    /// 即父块对应的边已经细分. 顶层尺寸的块总是 `(0, 3)`.
    pub fn resolve_corner(&self, vx: usize, vy: usize, log_mvb_sz: u32) -> (usize, u8) {
        if log_mvb_sz >= 2 {
            return (0, 3);
        }
        let mask = (1usize << (log_mvb_sz + 1)) - 1;
        let mut c = usize::from(vx & mask != 0);
        if vy & mask != 0 {
            c = 3 - c;
        }
        let vertex_valid = |k: usize| {
            let x = vx + ((VERT_DX[k] as usize) << log_mvb_sz);
            let y = vy + ((VERT_DY[k] as usize) << log_mvb_sz);
            self.grid.get(x, y).valid
        };
        let s = u8::from(vertex_valid(rot(c, 1))) | u8::from(vertex_valid(rot(c, 3))) << 1;
        (c, s)
    }

    /// 按给定外角与细分状态预测叶子块
    #[allow(clippy::too_many_arguments)]
    pub fn predict_block_from_setup(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        vx: usize,
        vy: usize,
        log_mvb_sz: u32,
        c: usize,
        s: u8,
    ) {
        let (lx, ly) = self.block_log_size(log_mvb_sz);
        let (x0, y0) = self.block_origin(vx, vy);
        let offsets = vertex_offsets(c, s);
        let pts: [&GridPoint; 4] = std::array::from_fn(|k| {
            let (dx, dy) = offsets[k];
            let x = vx as isize + (dx << log_mvb_sz) as isize;
            let y = vy as isize + (dy << log_mvb_sz) as isize;
            self.grid.get(x as usize, y as usize)
        });

        let cfg = &self.reference.cfg;
        let mut mvx: [i32; 4] = std::array::from_fn(|k| pts[k].mv.x << (MV_SCALE_SHIFT - cfg.xdec));
        let mut mvy: [i32; 4] = std::array::from_fn(|k| pts[k].mv.y << (MV_SCALE_SHIFT - cfg.ydec));
        let raw = u8::from(pts[0].edge_right)
            | u8::from(pts[1].edge_down) << 1
            | u8::from(pts[3].edge_right) << 2
            | u8::from(pts[0].edge_down) << 3;
        let etype = resolve_edges(raw, c, s, &mut mvx, &mut mvy);
        let plan = plan_block(etype, c, s);
        trace!(
            "叶子块 ({vx}, {vy}) log={log_mvb_sz} c={c} s={s} 拓扑 {} -> {:?}/{} s'={}",
            TopologyName(etype),
            plan.shape,
            plan.r,
            plan.blend_s
        );
        self.execute_plan(dst, dst_stride, x0, y0, &plan, c, &mvx, &mvy, lx, ly);
    }

    /// 执行预测计划: 去重, 插值, 混合
    #[allow(clippy::too_many_arguments)]
    fn execute_plan(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        x0: isize,
        y0: isize,
        plan: &BlockPlan,
        c: usize,
        mvx: &[i32; 4],
        mvy: &[i32; 4],
        lx: u32,
        ly: u32,
    ) {
        let fields: [VectorField; 4] = std::array::from_fn(|k| match plan.sources[k] {
            CornerSource::Interp { m, r } => VectorField::interpolated(mvx, mvy, m, r, lx, ly),
            CornerSource::Fixed(corner) => VectorField::fixed(mvx[corner], mvy[corner]),
        });

        // 相同向量场只插值一次
        let mut unique = [VectorField::fixed(0, 0); 4];
        let mut nunique = 0;
        let mut slot = [0usize; 4];
        for (k, field) in fields.iter().enumerate() {
            slot[k] = match unique[..nunique].iter().position(|f| f == field) {
                Some(idx) => idx,
                None => {
                    unique[nunique] = *field;
                    nunique += 1;
                    nunique - 1
                }
            };
        }

        if nunique == 1 {
            self.predict_field(dst, dst_stride, x0, y0, &unique[0], lx, ly);
            return;
        }

        let w = 1usize << lx;
        let area = w << ly;
        let mut scratch = [[T::default(); MAX_BLOCK_AREA]; 4];
        for (buf, field) in scratch.iter_mut().zip(&unique[..nunique]) {
            self.predict_field(&mut buf[..area], w, x0, y0, field, lx, ly);
        }
        let src: [&[T]; 4] = std::array::from_fn(|k| &scratch[slot[k]][..area]);

        let bit_depth = self.reference.cfg.bit_depth;
        let s = plan.blend_s;
        match (self.config.use_multires(lx, ly), s == 3) {
            (true, true) => self.kernels.blend_multi(dst, dst_stride, src, lx, ly, bit_depth),
            (true, false) => {
                self.kernels
                    .blend_multi_split(dst, dst_stride, src, c, s, lx, ly, bit_depth)
            }
            (false, true) => self.kernels.blend_full(dst, dst_stride, src, lx, ly),
            (false, false) => self.kernels.blend_full_split(dst, dst_stride, src, c, s, lx, ly),
        }
    }

    /// 常量场走固定向量插值, 其余逐像素插值
    #[allow(clippy::too_many_arguments)]
    fn predict_field(
        &self,
        dst: &mut [T],
        dst_stride: usize,
        x0: isize,
        y0: isize,
        field: &VectorField,
        lx: u32,
        ly: u32,
    ) {
        if field.is_fixed() {
            let (mx, my) = field.fixed_eighth_pel();
            self.kernels
                .predict_fixed(dst, dst_stride, self.reference, x0, y0, mx, my, lx, ly);
        } else {
            self.kernels
                .predict_interp(dst, dst_stride, self.reference, x0, y0, field, lx, ly);
        }
    }
}
