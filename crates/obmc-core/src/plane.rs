//! 带边界扩展的图像平面.
//!
//! 参考帧平面在四周预留对称的填充区, 子像素滤波器的支撑区域
//! 永远落在已分配的内存中, 因此插值内核本身不做边界检查.
//!
//! 坐标系: `(0, 0)` 为可见区域左上角, 负坐标与超出宽高的坐标
//! 落在填充区内.

use crate::consts::{
    FILTER_BOTTOM_APRON, GRID_BORDER, LOG_GRID_UNIT, MAX_BIT_DEPTH, MV_FRAC_BITS,
};
use crate::error::{ObmcError, ObmcResult};
use crate::pixel::Pixel;

/// 平面几何参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneConfig {
    /// 可见宽度
    pub width: usize,
    /// 可见高度
    pub height: usize,
    /// 行跨度 (含左右填充)
    pub stride: usize,
    /// 分配的总行数 (含上下填充)
    pub alloc_height: usize,
    /// 水平填充像素数
    pub xpad: usize,
    /// 垂直填充像素数
    pub ypad: usize,
    /// 水平降采样 (log2, 色度 4:2:0 为 1)
    pub xdec: u32,
    /// 垂直降采样 (log2)
    pub ydec: u32,
    /// 样本位深
    pub bit_depth: u32,
}

impl PlaneConfig {
    /// 最大样本值
    pub const fn max_value(&self) -> i32 {
        (1 << self.bit_depth) - 1
    }
}

/// 图像平面
#[derive(Debug, Clone)]
pub struct Plane<T: Pixel> {
    /// 样本数据 (行优先, 含填充)
    pub data: Vec<T>,
    /// 几何参数
    pub cfg: PlaneConfig,
}

impl<T: Pixel> Plane<T> {
    /// 创建全零平面
    ///
    /// `padding` 为四周对称的填充像素数 (本平面坐标).
    pub fn new(
        width: usize,
        height: usize,
        xdec: u32,
        ydec: u32,
        padding: usize,
        bit_depth: u32,
    ) -> ObmcResult<Self> {
        if width == 0 || height == 0 {
            return Err(ObmcError::InvalidArgument(format!(
                "平面尺寸不能为 0: {width}x{height}"
            )));
        }
        if xdec > 1 || ydec > 1 {
            return Err(ObmcError::Unsupported(format!(
                "降采样因子超出范围: xdec={xdec}, ydec={ydec}"
            )));
        }
        if bit_depth < 8 || bit_depth > MAX_BIT_DEPTH || bit_depth > T::MAX_BIT_DEPTH {
            return Err(ObmcError::Unsupported(format!(
                "样本类型不支持该位深: {bit_depth}"
            )));
        }
        let stride = width + 2 * padding;
        let alloc_height = height + 2 * padding;
        Ok(Self {
            data: vec![T::default(); stride * alloc_height],
            cfg: PlaneConfig {
                width,
                height,
                stride,
                alloc_height,
                xpad: padding,
                ypad: padding,
                xdec,
                ydec,
                bit_depth,
            },
        })
    }

    /// 按坐标函数填充可见区域
    pub fn fill_with<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize) -> T,
    {
        for y in 0..self.cfg.height {
            let row = self.visible_row_mut(y);
            for (x, px) in row.iter_mut().enumerate() {
                *px = f(x, y);
            }
        }
    }

    /// 坐标对应的数据下标
    #[inline(always)]
    pub fn index(&self, x: isize, y: isize) -> usize {
        debug_assert!(
            x >= -(self.cfg.xpad as isize)
                && x < (self.cfg.width + self.cfg.xpad) as isize
                && y >= -(self.cfg.ypad as isize)
                && y < (self.cfg.height + self.cfg.ypad) as isize,
            "读取越过填充区: ({x}, {y})"
        );
        (y + self.cfg.ypad as isize) as usize * self.cfg.stride
            + (x + self.cfg.xpad as isize) as usize
    }

    /// 从 `(x, y)` 开始的 `len` 个连续样本
    ///
    /// 调试构建下断言整段都位于填充区之内.
    #[inline(always)]
    pub fn row_slice(&self, x: isize, y: isize, len: usize) -> &[T] {
        debug_assert!(
            x + len as isize <= (self.cfg.width + self.cfg.xpad) as isize,
            "行读取越过右填充区: x={x}, len={len}"
        );
        let start = self.index(x, y);
        &self.data[start..start + len]
    }

    /// 读取单个样本
    #[inline(always)]
    pub fn get(&self, x: isize, y: isize) -> T {
        self.data[self.index(x, y)]
    }

    /// 写入单个样本
    #[inline(always)]
    pub fn set(&mut self, x: isize, y: isize, v: T) {
        let idx = self.index(x, y);
        self.data[idx] = v;
    }

    /// 可见区域的一行
    pub fn visible_row(&self, y: usize) -> &[T] {
        let start = self.index(0, y as isize);
        &self.data[start..start + self.cfg.width]
    }

    /// 可见区域的一行 (可变)
    pub fn visible_row_mut(&mut self, y: usize) -> &mut [T] {
        let start = self.index(0, y as isize);
        let width = self.cfg.width;
        &mut self.data[start..start + width]
    }

    /// 按可见区域行序遍历所有样本
    pub fn visible_pixels(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.cfg.height).flat_map(move |y| self.visible_row(y).iter().copied())
    }

    /// 用边缘样本复制填满填充区
    pub fn extend_borders(&mut self) {
        let PlaneConfig {
            width,
            height,
            stride,
            xpad,
            ypad,
            ..
        } = self.cfg;
        for y in 0..height {
            let row = (y + ypad) * stride;
            let left = self.data[row + xpad];
            let right = self.data[row + xpad + width - 1];
            self.data[row..row + xpad].fill(left);
            self.data[row + xpad + width..row + stride].fill(right);
        }
        let first = ypad * stride;
        let last = (ypad + height - 1) * stride;
        for y in 0..ypad {
            self.data.copy_within(first..first + stride, y * stride);
            let dst = (ypad + height + y) * stride;
            self.data.copy_within(last..last + stride, dst);
        }
    }

    /// 将一个块复制到平面, 按可见区域裁剪
    ///
    /// `(x, y)` 可以为负, 超出可见区域的部分被丢弃.
    #[allow(clippy::too_many_arguments)]
    pub fn write_block_clipped(
        &mut self,
        x: isize,
        y: isize,
        block: &[T],
        block_stride: usize,
        w: usize,
        h: usize,
    ) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w as isize).min(self.cfg.width as isize);
        let y1 = (y + h as isize).min(self.cfg.height as isize);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let cols = (x1 - x0) as usize;
        for yy in y0..y1 {
            let src = (yy - y) as usize * block_stride + (x0 - x) as usize;
            let dst = self.index(x0, yy);
            self.data[dst..dst + cols].copy_from_slice(&block[src..src + cols]);
        }
    }

    /// 给定最大运动向量幅度 (1/8 亮度像素) 时参考平面所需的最小填充
    ///
    /// 帧级驱动输出的块越过可见区域 `GRID_BORDER` 个网格单位, 再加上
    /// 向量位移与滤波器保护带, 外加向下取整可能多出的一个像素.
    pub fn required_padding(max_mv: i32, dec: u32) -> usize {
        let overhang = (GRID_BORDER as usize) << (LOG_GRID_UNIT - dec);
        let unit = 1i64 << (MV_FRAC_BITS + dec);
        let mv_px = ((i64::from(max_mv.unsigned_abs()) + unit - 1) / unit) as usize;
        overhang + mv_px + FILTER_BOTTOM_APRON + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_geometry() {
        assert!(Plane::<u8>::new(0, 8, 0, 0, 4, 8).is_err());
        assert!(Plane::<u8>::new(8, 8, 2, 0, 4, 8).is_err());
        assert!(Plane::<u8>::new(8, 8, 0, 0, 4, 10).is_err());
        assert!(Plane::<u16>::new(8, 8, 1, 1, 4, 10).is_ok());
    }

    #[test]
    fn test_extend_borders_replicates_edges() {
        let mut plane = Plane::<u8>::new(4, 3, 0, 0, 2, 8).unwrap();
        plane.fill_with(|x, y| (y * 10 + x) as u8);
        plane.extend_borders();
        assert_eq!(plane.get(-2, -2), 0);
        assert_eq!(plane.get(5, -1), 3);
        assert_eq!(plane.get(-1, 4), 20);
        assert_eq!(plane.get(5, 4), 23);
        assert_eq!(plane.get(1, 3), 21);
    }

    #[test]
    fn test_write_block_clipped_负坐标() {
        let mut plane = Plane::<u8>::new(4, 4, 0, 0, 0, 8).unwrap();
        let block: Vec<u8> = (0..16).collect();
        plane.write_block_clipped(-2, -1, &block, 4, 4, 4);
        assert_eq!(plane.visible_row(0), &[6, 7, 0, 0]);
        assert_eq!(plane.visible_row(2), &[14, 15, 0, 0]);
        assert_eq!(plane.visible_row(3), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_required_padding() {
        // 亮度: 8 像素外伸 + 0 + 3 + 1
        assert_eq!(Plane::<u8>::required_padding(0, 0), 12);
        // 色度: 4 像素外伸, 17/16 向上取整为 2
        assert_eq!(Plane::<u8>::required_padding(17, 1), 4 + 2 + 3 + 1);
        assert_eq!(Plane::<u8>::required_padding(-64, 0), 8 + 8 + 3 + 1);
    }
}
