//! 统一错误类型定义.
//!
//! 所有 OBMC crate 共用的错误类型. 预测热路径上的不变量由断言保证,
//! 这里只覆盖构造期与帧级驱动的参数校验.

use thiserror::Error;

/// OBMC 引擎统一错误类型
#[derive(Debug, Error)]
pub enum ObmcError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作 (如超出范围的位深或降采样因子)
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 无效数据 (如运动向量网格与平面尺寸不匹配)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// OBMC 引擎统一 Result 类型
pub type ObmcResult<T> = Result<T, ObmcError>;
