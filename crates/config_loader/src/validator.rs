//! 配置校验模块
//!
//! 校验规则：
//! - 各段数值上限合法（`validator` derive 规则）
//! - route id 唯一（空 id 由路由器按位置补齐，不参与比较）
//! - route 的 from / to 非空
//! - 未知目标类型只告警：分发时进入死信队列

use std::collections::HashSet;

use contracts::{ContractError, RouterConfig, TargetClass, TargetSpec};
use tracing::warn;
use validator::{Validate, ValidationErrors};

/// 校验 RouterConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RouterConfig) -> Result<(), ContractError> {
    config.validate().map_err(limits_error)?;
    validate_route_ids(config)?;
    validate_route_fields(config)?;
    warn_unknown_targets(config);
    Ok(())
}

/// 把 validator 的错误折叠成第一条可读信息
fn limits_error(errors: ValidationErrors) -> ContractError {
    let message = errors.to_string();
    let field = message
        .split(':')
        .next()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("config")
        .to_string();
    ContractError::config_validation(field, message)
}

/// 校验 route id 唯一性
fn validate_route_ids(config: &RouterConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for route in config.routes.iter().filter(|r| !r.id.trim().is_empty()) {
        if !seen.insert(route.id.trim()) {
            return Err(ContractError::config_validation(
                format!("routes[id={}]", route.id),
                "duplicate route id",
            ));
        }
    }
    Ok(())
}

/// 校验 from / to 必填
fn validate_route_fields(config: &RouterConfig) -> Result<(), ContractError> {
    for (idx, route) in config.routes.iter().enumerate() {
        if route.from.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("routes[{idx}].from"),
                "route 'from' cannot be empty",
            ));
        }
        if route.to.iter().all(|t| t.trim().is_empty()) {
            return Err(ContractError::config_validation(
                format!("routes[{idx}].to"),
                "route 'to' cannot be empty",
            ));
        }
    }
    Ok(())
}

fn warn_unknown_targets(config: &RouterConfig) {
    for route in &config.routes {
        for target in route.to.iter() {
            if TargetSpec::parse(target).class() == TargetClass::Unknown {
                warn!(route_id = %route.id, to = %target, "unknown target class in config");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Route;

    fn minimal_config() -> RouterConfig {
        RouterConfig {
            routes: vec![
                Route::new("plc_to_ui", "plc_001.*", vec!["ui", "log"]),
                Route::new("setpoint", "hmi.MAIN.setpoint", "controller.plc_001.MAIN.SP"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_duplicate_route_id() {
        let mut config = minimal_config();
        config.routes.push(config.routes[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate route id"), "got: {err}");
    }

    #[test]
    fn test_blank_ids_are_not_duplicates() {
        let mut config = minimal_config();
        config.routes.push(Route::new("", "*", "log"));
        config.routes.push(Route::new("", "*", "sink"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_from() {
        let mut config = minimal_config();
        config.routes[1].from = "  ".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("routes[1].from"), "got: {err}");
    }

    #[test]
    fn test_empty_to() {
        let mut config = minimal_config();
        config.routes[0].to = Vec::<String>::new().into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("'to' cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_unknown_target_only_warns() {
        let mut config = minimal_config();
        config.routes.push(Route::new("odd", "*", "unknowntype.foo"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_limit_out_of_range() {
        let mut config = minimal_config();
        config.rate_limit.max_packets_per_sec = 0.0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
        assert!(err.to_string().contains("max_packets_per_sec"), "got: {err}");
    }
}
