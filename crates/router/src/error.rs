//! Router 错误类型

use thiserror::Error;

/// Router 错误
///
/// 只在构建和重新加载路由规则时出现；`route` 本身从不返回错误。
#[derive(Debug, Error)]
pub enum RouterError {
    /// 路由规则不完整
    #[error("route '{id}' is invalid: {message}")]
    InvalidRoute {
        /// 路由 ID（未设置时为位置编号）
        id: String,
        /// 原因
        message: String,
    },

    /// 路由 ID 重复
    #[error("duplicate route id '{0}'")]
    DuplicateRoute(String),
}

impl RouterError {
    /// 创建 InvalidRoute 错误
    pub fn invalid_route(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRoute {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Router Result 类型别名
pub type Result<T> = std::result::Result<T, RouterError>;
