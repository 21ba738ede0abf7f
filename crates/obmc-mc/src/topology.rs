//! 边拓扑解析与角点预测计划.
//!
//! 叶子块的每条边或者沿用向量插值 (V), 或者在像素域混合 (B).
//! 4 条边共 16 种拓扑, 按旋转对称归并为 6 种处理形状, 每种形状
//! 给出四个角槽位各自的预测来源以及混合时使用的细分状态.

use std::fmt;

use crate::geometry::rot;

/// 插值拓扑: 第 k 位对应边 k (顶点 k 到 k+1), 置位为向量插值
pub type Topology = u8;

/// 处理形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// 四条边都是向量插值, 单次插值直接输出
    AllVector,
    /// 一条边混合
    OneBlend,
    /// 两条相对的边混合
    OppositeBlend,
    /// 两条相邻的边混合
    AdjacentBlend,
    /// 三条边混合
    ThreeBlend,
    /// 四条边都混合
    AllBlend,
}

impl Shape {
    /// 全部形状
    pub const ALL: [Shape; 6] = [
        Shape::AllVector,
        Shape::OneBlend,
        Shape::OppositeBlend,
        Shape::AdjacentBlend,
        Shape::ThreeBlend,
        Shape::AllBlend,
    ];
}

/// 拓扑的字母表示, 依次为边 0..3
pub struct TopologyName(pub Topology);

impl fmt::Display for TopologyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for k in 0..4 {
            f.write_str(if self.0 >> k & 1 != 0 { "V" } else { "B" })?;
        }
        Ok(())
    }
}

/// 将拓扑归并为 `(形状, 旋转量)`
pub fn classify(etype: Topology) -> (Shape, usize) {
    let etype = etype & 0xF;
    match etype.count_ones() {
        4 => (Shape::AllVector, 0),
        0 => (Shape::AllBlend, 0),
        // 唯一的 B 边即旋转量
        3 => (Shape::OneBlend, (!etype & 0xF).trailing_zeros() as usize),
        // 唯一的 V 边即旋转量
        1 => (Shape::ThreeBlend, etype.trailing_zeros() as usize),
        _ => match etype {
            0b1010 => (Shape::OppositeBlend, 0),
            0b0101 => (Shape::OppositeBlend, 1),
            // 两条相邻 V 边 r, r+1
            _ => {
                let r = (0..4)
                    .find(|&r| etype >> r & 1 != 0 && etype >> rot(r, 1) & 1 != 0)
                    .unwrap_or(0);
                (Shape::AdjacentBlend, r)
            }
        },
    }
}

/// 角槽位的预测来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CornerSource {
    /// 由 `MIDXS[m]` 旋转 `r` 步选出的角点向量双线性插值
    Interp {
        /// `MIDXS` 行号
        m: usize,
        /// 旋转量
        r: usize,
    },
    /// 整块使用角点 `k` 的向量
    Fixed(usize),
}

/// 叶子块的预测计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    /// 处理形状
    pub shape: Shape,
    /// 旋转量
    pub r: usize,
    /// 四个角槽位的预测来源
    pub sources: [CornerSource; 4],
    /// 混合时使用的细分状态
    pub blend_s: u8,
}

impl BlockPlan {
    /// 不同预测来源的个数
    pub fn distinct_sources(&self) -> usize {
        (0..4)
            .filter(|&k| !self.sources[..k].contains(&self.sources[k]))
            .count()
    }
}

/// 为拓扑, 外角与细分状态生成预测计划
pub fn plan_block(etype: Topology, c: usize, s: u8) -> BlockPlan {
    use CornerSource::{Fixed, Interp};

    let (shape, r) = classify(etype);
    let mut sources = [Fixed(0); 4];
    let cr = (c + 4 - r) & 3;
    let blend_s = match shape {
        Shape::AllVector => {
            sources = [Interp { m: 0, r: 0 }; 4];
            3
        }
        Shape::OneBlend => {
            sources[rot(r, 0)] = Interp { m: 1, r };
            sources[rot(r, 1)] = Interp { m: 2, r };
            sources[rot(r, 2)] = Interp { m: 0, r };
            sources[rot(r, 3)] = Interp { m: 0, r };
            s | u8::from(cr != 0) | u8::from(cr != 1) << 1
        }
        Shape::OppositeBlend => {
            sources[rot(r, 3)] = Interp { m: 3, r };
            sources[rot(r, 0)] = Interp { m: 3, r };
            sources[rot(r, 1)] = Interp { m: 4, r };
            sources[rot(r, 2)] = Interp { m: 4, r };
            s | (cr & 1) as u8 | u8::from(cr & 1 == 0) << 1
        }
        Shape::AdjacentBlend => {
            sources[rot(r, 0)] = Interp { m: 5, r };
            sources[rot(r, 1)] = Interp { m: 0, r };
            sources[rot(r, 2)] = Interp { m: 6, r };
            sources[rot(r, 3)] = Fixed(rot(r, 3));
            s | (((c + 6 - r) & 2) >> 1) as u8 | ((c + 5 - r) & 2) as u8
        }
        Shape::ThreeBlend => {
            sources[rot(r, 0)] = Interp { m: 5, r };
            sources[rot(r, 1)] = Interp { m: 7, r };
            sources[rot(r, 2)] = Fixed(rot(r, 2));
            sources[rot(r, 3)] = Fixed(rot(r, 3));
            s | u8::from(cr == 0) | u8::from(cr == 1) << 1
        }
        Shape::AllBlend => {
            sources = [Fixed(0), Fixed(1), Fixed(2), Fixed(3)];
            s
        }
    };
    BlockPlan {
        shape,
        r,
        sources,
        blend_s,
    }
}

/// 对未细分的边做向量平均, 并修正拓扑
///
/// `raw` 为从偏移后的网格点读出的原始拓扑. 边 `c -> c+1` 未细分时
/// 边 `c+1` 跟随边 `c`, 若边 `c` 为向量插值则角点 `c+1` 取与外角的平均;
/// 另一侧对称处理.
pub fn resolve_edges(
    raw: Topology,
    c: usize,
    s: u8,
    mvx: &mut [i32; 4],
    mvy: &mut [i32; 4],
) -> Topology {
    let bit = |e: Topology, k: usize| e >> k & 1;
    let mut etype = raw & 0xF;
    if s & 1 == 0 {
        let k = rot(c, 1);
        etype = (etype & !(1 << k)) | bit(etype, c) << k;
        if bit(etype, c) != 0 {
            mvx[k] = (mvx[c] + mvx[k]) >> 1;
            mvy[k] = (mvy[c] + mvy[k]) >> 1;
        }
    }
    if s & 2 == 0 {
        let k = rot(c, 2);
        let far = rot(c, 3);
        etype = (etype & !(1 << k)) | bit(etype, far) << k;
        if bit(etype, far) != 0 {
            mvx[far] = (mvx[c] + mvx[far]) >> 1;
            mvy[far] = (mvy[c] + mvy[far]) >> 1;
        }
    }
    etype
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::SplitWeights;

    #[test]
    fn test_classify_16_种拓扑归并为_6_种形状() {
        let mut counts = std::collections::HashMap::new();
        for etype in 0..16u8 {
            let (shape, r) = classify(etype);
            assert!(r < 4);
            *counts.entry(shape).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[&Shape::AllVector], 1);
        assert_eq!(counts[&Shape::OneBlend], 4);
        assert_eq!(counts[&Shape::OppositeBlend], 2);
        assert_eq!(counts[&Shape::AdjacentBlend], 4);
        assert_eq!(counts[&Shape::ThreeBlend], 4);
        assert_eq!(counts[&Shape::AllBlend], 1);
    }

    #[test]
    fn test_classify_旋转量() {
        assert_eq!(classify(0b1110), (Shape::OneBlend, 0));
        assert_eq!(classify(0b0111), (Shape::OneBlend, 3));
        assert_eq!(classify(0b0011), (Shape::AdjacentBlend, 0));
        assert_eq!(classify(0b0110), (Shape::AdjacentBlend, 1));
        assert_eq!(classify(0b1100), (Shape::AdjacentBlend, 2));
        assert_eq!(classify(0b1001), (Shape::AdjacentBlend, 3));
        assert_eq!(classify(0b0100), (Shape::ThreeBlend, 2));
        assert_eq!(TopologyName(0b1001).to_string(), "VBBV");
    }

    #[test]
    fn test_plan_来源个数() {
        for etype in 0..16u8 {
            for c in 0..4 {
                for s in 0..4u8 {
                    let plan = plan_block(etype, c, s);
                    let expect = match plan.shape {
                        Shape::AllVector => 1,
                        Shape::OppositeBlend => 2,
                        Shape::OneBlend => 3,
                        _ => 4,
                    };
                    assert_eq!(plan.distinct_sources(), expect, "{}", TopologyName(etype));
                    assert!(plan.blend_s <= 3);
                    assert_eq!(plan.blend_s & s, s);
                }
            }
        }
    }

    #[test]
    fn test_plan_采样角点权重非零() {
        for (lx, ly) in [(2u32, 2u32), (3, 2), (4, 4)] {
            for etype in 0..16u8 {
                for c in 0..4 {
                    for s in 0..4u8 {
                        let plan = plan_block(etype, c, s);
                        let w = SplitWeights::new(c, plan.blend_s, lx, ly);
                        let positive_somewhere = |weight: &dyn Fn(i32, i32) -> i32| {
                            (0..1 << ly).any(|j| (0..1 << lx).any(|i| weight(i, j) > 0))
                        };
                        for k in 0..4 {
                            assert!(
                                positive_somewhere(&|i, j| w.at(k, i, j)),
                                "{} c={c} s={s} 槽位 {k}",
                                TopologyName(etype)
                            );
                            // 同一来源的槽位合计权重也必须为正
                            let src = plan.sources[k];
                            let total = |i: i32, j: i32| -> i32 {
                                (0..4)
                                    .filter(|&m| plan.sources[m] == src)
                                    .map(|m| w.at(m, i, j))
                                    .sum()
                            };
                            assert!(positive_somewhere(&total));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_edges_未细分边取平均() {
        let mut mvx = [0, 100, 60, 40];
        let mut mvy = [8, 0, 0, -8];
        // 全部为向量插值, 两条边都未细分
        let etype = resolve_edges(0xF, 0, 0, &mut mvx, &mut mvy);
        assert_eq!(etype, 0xF);
        assert_eq!(mvx, [0, 50, 60, 20]);
        assert_eq!(mvy, [8, 4, 0, 0]);
    }

    #[test]
    fn test_resolve_edges_混合边不平均() {
        let mut mvx = [0, 100, 60, 40];
        let mut mvy = [0; 4];
        let etype = resolve_edges(0b1010, 1, 0, &mut mvx, &mut mvy);
        // 边 2 跟随边 1 (V), 角点 2 取平均; 边 3 跟随边 0 (B), 角点 0 不变
        assert_eq!(etype, 0b0110);
        assert_eq!(mvx, [0, 100, 80, 40]);
        assert_eq!(mvy, [0; 4]);
    }

    #[test]
    fn test_resolve_edges_已细分不变() {
        let mut mvx = [1, 2, 3, 4];
        let mut mvy = [5, 6, 7, 8];
        assert_eq!(resolve_edges(0b0110, 2, 3, &mut mvx, &mut mvy), 0b0110);
        assert_eq!(mvx, [1, 2, 3, 4]);
        assert_eq!(mvy, [5, 6, 7, 8]);
    }
}
