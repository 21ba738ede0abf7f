//! 像素样本类型.
//!
//! 8 位内部位深使用 `u8`, 10/12 位使用 `u16`. 所有滤波与混合运算在 `i32`
//! 中进行, 写回时由调用方保证取值已饱和到合法范围.

use std::fmt;

/// 像素样本
pub trait Pixel:
    Copy + Clone + Default + PartialEq + Eq + fmt::Debug + Send + Sync + 'static
{
    /// 该样本类型能承载的最大位深
    const MAX_BIT_DEPTH: u32;

    /// 转为 i32 参与运算
    fn to_i32(self) -> i32;

    /// 由 i32 构造, 取值必须已在 `0..(1 << bit_depth)` 内
    fn from_i32(v: i32) -> Self;
}

impl Pixel for u8 {
    const MAX_BIT_DEPTH: u32 = 8;

    #[inline(always)]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }

    #[inline(always)]
    fn from_i32(v: i32) -> Self {
        debug_assert!((0..=255).contains(&v), "样本越界: {v}");
        v as u8
    }
}

impl Pixel for u16 {
    const MAX_BIT_DEPTH: u32 = 16;

    #[inline(always)]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }

    #[inline(always)]
    fn from_i32(v: i32) -> Self {
        debug_assert!((0..=65535).contains(&v), "样本越界: {v}");
        v as u16
    }
}

/// 给定位深的最大样本值
#[inline(always)]
pub const fn max_sample(bit_depth: u32) -> i32 {
    (1 << bit_depth) - 1
}

/// 饱和到 `[0, max]`
#[inline(always)]
pub fn clamp_sample(v: i32, max: i32) -> i32 {
    v.clamp(0, max)
}
