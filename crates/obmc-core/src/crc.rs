//! CRC 校验和计算.
//!
//! 提供 CRC-32 (IEEE, 反射多项式 0xEDB88320), 用于比对预测平面的输出.

use crate::pixel::Pixel;

/// CRC-32 查找表
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// 增量 CRC-32 计算器
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// 创建计算器
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// 输入字节
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state = CRC32_TABLE[((self.state ^ u32::from(byte)) & 0xFF) as usize]
                ^ (self.state >> 8);
        }
    }

    /// 输入像素样本 (按小端字节序, 8 位样本为单字节)
    pub fn update_pixels<T: Pixel>(&mut self, pixels: impl IntoIterator<Item = T>) {
        for px in pixels {
            let v = px.to_i32() as u32;
            if T::MAX_BIT_DEPTH <= 8 {
                self.update(&[v as u8]);
            } else {
                self.update(&(v as u16).to_le_bytes());
            }
        }
    }

    /// 结束计算
    pub const fn finish(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

/// 计算一段字节的 CRC-32
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_标准校验值() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_update_pixels_u8_等价字节() {
        let mut crc = Crc32::new();
        crc.update_pixels(b"123456789".iter().copied());
        assert_eq!(crc.finish(), 0xCBF4_3926);
    }

    #[test]
    fn test_update_pixels_u16_小端() {
        let mut a = Crc32::new();
        a.update_pixels([0x0201u16, 0x0403u16]);
        assert_eq!(a.finish(), crc32(&[1, 2, 3, 4]));
    }
}
