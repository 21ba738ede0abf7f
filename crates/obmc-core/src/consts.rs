//! 精度与尺度常量.
//!
//! 运动向量单位, 滤波器系数尺度, 中间缓冲区移位量之间必须互相一致,
//! 因此集中定义在这里, 并用编译期断言约束它们的关系.

// ============================================================
// 运动向量单位
// ============================================================

/// 运动向量小数位数 (1/8 像素)
pub const MV_FRAC_BITS: u32 = 3;

/// 子像素相位数
pub const SUBPEL_PHASES: usize = 1 << MV_FRAC_BITS;

/// 网格向量放大到高精度坐标时的基础左移量 (亮度平面, 再减去降采样因子)
pub const MV_SCALE_SHIFT: u32 = 14;

/// 高精度坐标的小数位数 (单位 2^-17 平面像素)
pub const MV_POS_BITS: u32 = MV_SCALE_SHIFT + MV_FRAC_BITS;

/// 运动向量分量绝对值上限 (不含, 1/8 亮度像素)
///
/// 放大到高精度坐标后, 四个角点的和差仍在 i32 范围内.
pub const MV_ABS_LIMIT: i32 = 1 << 14;

// ============================================================
// 子像素滤波器
// ============================================================

/// 滤波器抽头数
pub const FILTER_TAPS: usize = 6;

/// 滤波器系数精度 (系数和为 128)
pub const FILTER_BITS: u32 = 7;

/// 第一个抽头相对采样点的偏移 (上/左保护带宽度)
pub const FILTER_TOP_APRON: usize = 2;

/// 下/右保护带宽度
pub const FILTER_BOTTOM_APRON: usize = FILTER_TAPS - 1 - FILTER_TOP_APRON;

/// 垂直滤波后的总右移量 (两次滤波的系数尺度之和)
pub const FILTER_OUT_SHIFT: u32 = 2 * FILTER_BITS;

/// 8 相位 6 抽头可分离滤波器, 每行系数和为 `1 << FILTER_BITS`
pub const SUBPEL_FILTERS: [[i32; FILTER_TAPS]; SUBPEL_PHASES] = [
    [0, 0, 128, 0, 0, 0],
    [2, -10, 123, 15, -3, 1],
    [4, -17, 112, 35, -8, 2],
    [4, -19, 97, 55, -12, 3],
    [4, -18, 78, 78, -18, 4],
    [3, -12, 55, 97, -19, 4],
    [2, -8, 35, 112, -17, 4],
    [1, -3, 15, 123, -10, 2],
];

// ============================================================
// 网格几何
// ============================================================

/// 每个网格单位对应的亮度像素数 (log2)
pub const LOG_GRID_UNIT: u32 = 2;

/// 每个宏块包含的网格单位数 (log2)
pub const LOG_MB_GRID_UNITS: u32 = 2;

/// 宏块的网格单位数
pub const MB_GRID_UNITS: usize = 1 << LOG_MB_GRID_UNITS;

/// 网格左/上边界 (网格单位)
pub const GRID_BORDER: i32 = 2;

/// 最大块尺寸 (网格单位 log2)
pub const LOG_MVB_SZ_MAX: u32 = 2;

/// 最大块尺寸 (亮度像素 log2)
pub const LOG_BLOCK_SZ_MAX: u32 = LOG_MVB_SZ_MAX + LOG_GRID_UNIT;

/// 最大块边长 (亮度像素)
pub const MAX_BLOCK_SIZE: usize = 1 << LOG_BLOCK_SZ_MAX;

/// 最大块面积
pub const MAX_BLOCK_AREA: usize = MAX_BLOCK_SIZE * MAX_BLOCK_SIZE;

/// 顶点层级上限
pub const MC_LEVEL_MAX: u32 = 4;

/// 分裂标志上下文数
pub const SPLIT_CTXS: usize = 9;

// ============================================================
// 混合
// ============================================================

/// 多分辨率混合的最小块尺寸 (像素 log2)
pub const MULTIRES_MIN_LOG: u32 = 2;

// ============================================================
// 参考平面
// ============================================================

/// 默认参考平面边界扩展 (亮度像素)
pub const UMV_PADDING: usize = 16;

/// 支持的最大位深
pub const MAX_BIT_DEPTH: u32 = 12;

const _: () = {
    let mut p = 0;
    while p < SUBPEL_PHASES {
        let mut sum = 0;
        let mut k = 0;
        while k < FILTER_TAPS {
            sum += SUBPEL_FILTERS[p][k];
            k += 1;
        }
        assert!(sum == 1 << FILTER_BITS);
        p += 1;
    }
    assert!(SUBPEL_FILTERS[0][FILTER_TOP_APRON] == 1 << FILTER_BITS);
    assert!(MV_POS_BITS - MV_FRAC_BITS == MV_SCALE_SHIFT);
    assert!(((MV_ABS_LIMIT as i64) << MV_SCALE_SHIFT) * 4 <= i32::MAX as i64 + 1);
    // 12 位样本经两次滤波后仍在 i32 范围内
    assert!((1i64 << MAX_BIT_DEPTH) * 256 * 256 < i32::MAX as i64);
};
