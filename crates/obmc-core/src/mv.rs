//! 运动向量与参考帧标识.

use std::fmt;
use std::ops::{Add, Sub};

/// 运动向量 (1/8 亮度像素)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MotionVector {
    /// 水平分量
    pub x: i32,
    /// 垂直分量
    pub y: i32,
}

impl MotionVector {
    /// 零向量
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// 创建运动向量
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 与另一个向量的 L1 (曼哈顿) 距离
    pub fn l1_distance(self, other: Self) -> i64 {
        i64::from((self.x - other.x).unsigned_abs()) + i64::from((self.y - other.y).unsigned_abs())
    }

    /// 各分量绝对值的最大者
    pub fn max_abs(self) -> i32 {
        self.x.abs().max(self.y.abs())
    }

    /// 对两个分量分别执行同一变换
    pub fn map(self, f: impl Fn(i32) -> i32) -> Self {
        Self::new(f(self.x), f(self.y))
    }
}

impl Add for MotionVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for MotionVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for MotionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 参考帧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefFrame {
    /// 长期参考 (黄金帧)
    Golden,
    /// 前一帧
    #[default]
    Prev,
    /// 后一帧 (双向预测)
    Next,
}

impl RefFrame {
    /// 全部参考帧, 按投票表的下标顺序
    pub const ALL: [RefFrame; 3] = [RefFrame::Golden, RefFrame::Prev, RefFrame::Next];

    /// 在投票表中的下标
    pub const fn index(self) -> usize {
        match self {
            Self::Golden => 0,
            Self::Prev => 1,
            Self::Next => 2,
        }
    }

    /// 名称
    pub const fn name(self) -> &'static str {
        match self {
            Self::Golden => "golden",
            Self::Prev => "prev",
            Self::Next => "next",
        }
    }
}

impl fmt::Display for RefFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
