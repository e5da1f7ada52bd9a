//! Ingestion 错误类型

use thiserror::Error;

/// 入口校验拒绝原因
///
/// 校验失败的事件不会进入后续流水线，也不会进入死信队列。
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IngestionError {
    /// 字段为空（trim 之后）
    #[error("{field} must not be empty")]
    EmptyField {
        /// 字段名
        field: &'static str,
    },

    /// 字段超长
    #[error("{field} exceeds {max} characters (got {len})")]
    FieldTooLong {
        /// 字段名
        field: &'static str,
        /// 实际长度
        len: usize,
        /// 上限
        max: usize,
    },

    /// 字段含非法字符
    #[error("{field} contains disallowed character {ch:?}")]
    InvalidCharacter {
        /// 字段名
        field: &'static str,
        /// 第一个非法字符
        ch: char,
    },

    /// 嵌套过深
    #[error("{field} nested deeper than {max} levels")]
    TooDeep {
        /// 字段名
        field: &'static str,
        /// 最大深度
        max: usize,
    },

    /// 非有限数值 (NaN / ±inf)
    #[error("{field} contains a non-finite number")]
    NonFiniteNumber {
        /// 字段名
        field: &'static str,
    },

    /// 字符串超长
    #[error("{field} contains a string of {len} characters (max {max})")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// 列表过大
    #[error("{field} contains a list of {len} items (max {max})")]
    ListTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// 映射键过多
    #[error("{field} contains a mapping with {len} keys (max {max})")]
    MapTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// 映射键无法转换为字符串
    #[error("{field} contains an unsupported {kind} mapping key")]
    InvalidKey {
        field: &'static str,
        kind: &'static str,
    },

    /// metadata 不是映射
    #[error("metadata must be a mapping, got {kind}")]
    MetadataNotMapping {
        /// 实际类型
        kind: &'static str,
    },
}

impl IngestionError {
    /// Stable label for metrics
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::EmptyField { .. } => "empty_field",
            Self::FieldTooLong { .. } => "field_too_long",
            Self::InvalidCharacter { .. } => "invalid_character",
            Self::TooDeep { .. } => "too_deep",
            Self::NonFiniteNumber { .. } => "non_finite",
            Self::StringTooLong { .. } => "string_too_long",
            Self::ListTooLarge { .. } => "list_too_large",
            Self::MapTooLarge { .. } => "map_too_large",
            Self::InvalidKey { .. } => "invalid_key",
            Self::MetadataNotMapping { .. } => "metadata_not_mapping",
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
