//! 帧级预测驱动.
//!
//! 以顶层块 (宏块) 为单位遍历整个网格, 网格边界上的块部分落在可见
//! 区域之外, 写回时按可见区域裁剪. 宏块行之间互不依赖, 可以并行.

use log::debug;
use obmc_core::consts::{LOG_MB_GRID_UNITS, LOG_MVB_SZ_MAX, MB_GRID_UNITS};
use obmc_core::{ObmcError, ObmcResult, Pixel, Plane};
use rayon::prelude::*;

use crate::walker::McContext;

/// 预测整个平面
///
/// 输出平面与参考平面的可见尺寸, 降采样和位深必须一致.
pub fn predict_plane<T: Pixel>(ctx: &McContext<'_, T>, dst: &mut Plane<T>) -> ObmcResult<()> {
    let src = &ctx.reference().cfg;
    let out = &dst.cfg;
    if (out.width, out.height, out.xdec, out.ydec, out.bit_depth)
        != (src.width, src.height, src.xdec, src.ydec, src.bit_depth)
    {
        return Err(ObmcError::InvalidArgument(format!(
            "输出平面 {}x{} (dec {}/{}, {} bit) 与参考平面 {}x{} (dec {}/{}, {} bit) 不一致",
            out.width,
            out.height,
            out.xdec,
            out.ydec,
            out.bit_depth,
            src.width,
            src.height,
            src.xdec,
            src.ydec,
            src.bit_depth
        )));
    }

    let (nbx, nby) = ctx.grid().top_blocks();
    let (lx, ly) = ctx.block_log_size(LOG_MVB_SZ_MAX);
    let (bw, bh) = (1usize << lx, 1usize << ly);
    let strip_stride = nbx * bw;

    let predict_row = |row: usize| -> Vec<T> {
        let mut strip = vec![T::default(); strip_stride * bh];
        let vy = row << LOG_MB_GRID_UNITS;
        for col in 0..nbx {
            ctx.predict_block(
                &mut strip[col * bw..],
                strip_stride,
                col * MB_GRID_UNITS,
                vy,
                LOG_MVB_SZ_MAX,
            );
        }
        strip
    };

    let strips: Vec<Vec<T>> = if ctx.config().parallel {
        (0..nby).into_par_iter().map(predict_row).collect()
    } else {
        (0..nby).map(predict_row).collect()
    };

    for (row, strip) in strips.iter().enumerate() {
        let (x, y) = ctx.block_origin(0, row << LOG_MB_GRID_UNITS);
        dst.write_block_clipped(x, y, strip, strip_stride, strip_stride, bh);
    }
    debug!(
        "帧预测完成: {}x{} 平面, {nbx}x{nby} 个顶层块, 内核 {}, 并行 {}",
        dst.cfg.width,
        dst.cfg.height,
        ctx.kernels().name(),
        ctx.config().parallel
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KernelChoice, McConfig};
    use crate::grid::MvGrid;
    use obmc_core::{MotionVector, RefFrame};

    fn scene(nmbs: usize) -> (MvGrid, Plane<u8>) {
        let mut grid = MvGrid::new(nmbs, nmbs).unwrap();
        let mut seed = 12345u32;
        let mut next = move || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            seed >> 16
        };
        for vy in 0..grid.rows() {
            for vx in 0..grid.cols() {
                // 顶层角点总是有效, 其余点随机有效
                if (vx % 4 == 0 && vy % 4 == 0) || next() % 3 == 0 {
                    let mv = MotionVector::new((next() % 33) as i32 - 16, (next() % 33) as i32 - 16);
                    grid.set_mv(vx, vy, mv, RefFrame::Prev);
                }
                grid.set_edges(vx, vy, next() % 2 == 0, next() % 2 == 0);
            }
        }
        let size = nmbs * 16;
        let mut plane = Plane::<u8>::new(size, size, 0, 0, 32, 8).unwrap();
        plane.fill_with(|x, y| ((x * 7 + y * 13 + (x * y) % 31) & 0xFF) as u8);
        plane.extend_borders();
        (grid, plane)
    }

    #[test]
    fn test_并行与串行一致() {
        let (grid, plane) = scene(3);
        let mut outs = Vec::new();
        for parallel in [true, false] {
            let cfg = McConfig {
                parallel,
                kernels: KernelChoice::Scalar,
                ..McConfig::default()
            };
            let ctx = McContext::new(&grid, &plane, cfg).unwrap();
            let mut dst = Plane::<u8>::new(48, 48, 0, 0, 0, 8).unwrap();
            predict_plane(&ctx, &mut dst).unwrap();
            outs.push(dst.data);
        }
        assert_eq!(outs[0], outs[1]);
    }

    #[test]
    fn test_零向量帧等于参考() {
        let mut grid = MvGrid::new(2, 1).unwrap();
        for vy in 0..grid.rows() {
            for vx in 0..grid.cols() {
                grid.set_mv(vx, vy, MotionVector::ZERO, RefFrame::Prev);
            }
        }
        let mut plane = Plane::<u8>::new(32, 16, 0, 0, 16, 8).unwrap();
        plane.fill_with(|x, y| (x * 5 + y * 3) as u8);
        plane.extend_borders();
        let ctx = McContext::new(&grid, &plane, McConfig::default()).unwrap();
        let mut dst = Plane::<u8>::new(32, 16, 0, 0, 0, 8).unwrap();
        predict_plane(&ctx, &mut dst).unwrap();
        assert!(dst.visible_pixels().eq(plane.visible_pixels()));
    }

    #[test]
    fn test_输出尺寸不符() {
        let (grid, plane) = scene(1);
        let ctx = McContext::new(&grid, &plane, McConfig::default()).unwrap();
        let mut dst = Plane::<u8>::new(8, 8, 0, 0, 0, 8).unwrap();
        assert!(predict_plane(&ctx, &mut dst).is_err());
    }
}
