//! 通用过滤条件求值：列表查询与检测器放行名单共用。
//!
//! 条件由 (字段, 操作符, 比较值) 组成，构造时完成比较值解析；
//! 操作符未知或比较值不合法时直接返回 [`FilterError::InvalidFilter`]，绝不静默忽略。
//! 记录缺少字段或字段类型不适用时视为不匹配。

mod cidr;
mod records;

pub use cidr::{CidrBlock, is_private_ip};

use regex::Regex;
use std::net::IpAddr;

/// 过滤错误。
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid filter on field `{field}`: {reason}")]
    InvalidFilter { field: String, reason: String },
}

impl FilterError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FilterError::InvalidFilter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// 操作符（查询字符串取值固定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    EqualsNumeric,
    NotEqualsNumeric,
    RegexMatch,
    NotRegexMatch,
    GreaterThan,
    SmallerThan,
    InCidr,
    NotInCidr,
    IsPrivate,
    IsNotPrivate,
}

impl FilterOperator {
    pub fn parse(value: &str) -> Option<Self> {
        let operator = match value {
            "equals" => FilterOperator::Equals,
            "not_equals" => FilterOperator::NotEquals,
            "equals_numeric" => FilterOperator::EqualsNumeric,
            "not_equals_numeric" => FilterOperator::NotEqualsNumeric,
            "regex_match" => FilterOperator::RegexMatch,
            "not_regex_match" => FilterOperator::NotRegexMatch,
            "greater_than" => FilterOperator::GreaterThan,
            "smaller_than" => FilterOperator::SmallerThan,
            "in_cidr" => FilterOperator::InCidr,
            "not_in_cidr" => FilterOperator::NotInCidr,
            "is_private" => FilterOperator::IsPrivate,
            "is_not_private" => FilterOperator::IsNotPrivate,
            _ => return None,
        };
        Some(operator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::EqualsNumeric => "equals_numeric",
            FilterOperator::NotEqualsNumeric => "not_equals_numeric",
            FilterOperator::RegexMatch => "regex_match",
            FilterOperator::NotRegexMatch => "not_regex_match",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::SmallerThan => "smaller_than",
            FilterOperator::InCidr => "in_cidr",
            FilterOperator::NotInCidr => "not_in_cidr",
            FilterOperator::IsPrivate => "is_private",
            FilterOperator::IsNotPrivate => "is_not_private",
        }
    }
}

/// 记录字段取值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    fn as_text(&self) -> String {
        match self {
            FieldValue::Text(value) => value.clone(),
            FieldValue::Integer(value) => value.to_string(),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(value) => value.trim().parse().ok(),
        }
    }

    fn as_ip(&self) -> Option<IpAddr> {
        match self {
            FieldValue::Text(value) => value.trim().parse().ok(),
            FieldValue::Integer(_) => None,
        }
    }
}

/// 可被过滤的记录：按字段名取值，未知字段返回 None。
pub trait Filterable {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

#[derive(Debug, Clone)]
enum Operand {
    Text(String),
    Integer(i64),
    Pattern(Regex),
    Cidr(CidrBlock),
    Empty,
}

/// 已解析的过滤条件。
#[derive(Debug, Clone)]
pub struct Filter {
    field: String,
    operator: FilterOperator,
    operand: Operand,
}

impl Filter {
    /// 解析查询字符串形式的条件。
    pub fn parse(field: &str, operator: &str, value: &str) -> Result<Self, FilterError> {
        let operator = FilterOperator::parse(operator)
            .ok_or_else(|| FilterError::invalid(field, format!("unknown operator `{operator}`")))?;
        Self::new(field, operator, value)
    }

    pub fn new(field: &str, operator: FilterOperator, value: &str) -> Result<Self, FilterError> {
        let operand = match operator {
            FilterOperator::Equals | FilterOperator::NotEquals => Operand::Text(value.to_string()),
            FilterOperator::EqualsNumeric
            | FilterOperator::NotEqualsNumeric
            | FilterOperator::GreaterThan
            | FilterOperator::SmallerThan => {
                let number = value.trim().parse::<i64>().map_err(|_| {
                    FilterError::invalid(field, format!("`{value}` is not an integer"))
                })?;
                Operand::Integer(number)
            }
            FilterOperator::RegexMatch | FilterOperator::NotRegexMatch => {
                let pattern = Regex::new(value)
                    .map_err(|err| FilterError::invalid(field, err.to_string()))?;
                Operand::Pattern(pattern)
            }
            FilterOperator::InCidr | FilterOperator::NotInCidr => {
                let block = CidrBlock::parse(value)
                    .ok_or_else(|| FilterError::invalid(field, format!("`{value}` is not a CIDR")))?;
                Operand::Cidr(block)
            }
            FilterOperator::IsPrivate | FilterOperator::IsNotPrivate => Operand::Empty,
        };
        Ok(Self {
            field: field.to_string(),
            operator,
            operand,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// 对记录求值；字段缺失或类型不适用时返回 false。
    pub fn matches(&self, record: &dyn Filterable) -> bool {
        let Some(actual) = record.field(&self.field) else {
            return false;
        };
        match (&self.operator, &self.operand) {
            (FilterOperator::Equals, Operand::Text(expected)) => actual.as_text() == *expected,
            (FilterOperator::NotEquals, Operand::Text(expected)) => actual.as_text() != *expected,
            (FilterOperator::EqualsNumeric, Operand::Integer(expected)) => {
                actual.as_integer() == Some(*expected)
            }
            (FilterOperator::NotEqualsNumeric, Operand::Integer(expected)) => actual
                .as_integer()
                .is_some_and(|value| value != *expected),
            (FilterOperator::GreaterThan, Operand::Integer(expected)) => actual
                .as_integer()
                .is_some_and(|value| value > *expected),
            (FilterOperator::SmallerThan, Operand::Integer(expected)) => actual
                .as_integer()
                .is_some_and(|value| value < *expected),
            (FilterOperator::RegexMatch, Operand::Pattern(pattern)) => {
                pattern.is_match(&actual.as_text())
            }
            (FilterOperator::NotRegexMatch, Operand::Pattern(pattern)) => {
                !pattern.is_match(&actual.as_text())
            }
            (FilterOperator::InCidr, Operand::Cidr(block)) => {
                actual.as_ip().is_some_and(|ip| block.contains(&ip))
            }
            (FilterOperator::NotInCidr, Operand::Cidr(block)) => {
                actual.as_ip().is_some_and(|ip| !block.contains(&ip))
            }
            (FilterOperator::IsPrivate, _) => actual.as_ip().is_some_and(|ip| is_private_ip(&ip)),
            (FilterOperator::IsNotPrivate, _) => {
                actual.as_ip().is_some_and(|ip| !is_private_ip(&ip))
            }
            _ => false,
        }
    }
}

/// 单次求值：解析条件并立即匹配。
pub fn evaluate(
    record: &dyn Filterable,
    field: &str,
    operator: &str,
    value: &str,
) -> Result<bool, FilterError> {
    Ok(Filter::parse(field, operator, value)?.matches(record))
}

/// 全部条件都匹配（空条件集合匹配一切）。
pub fn matches_all(filters: &[Filter], record: &dyn Filterable) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}

/// 任一条件匹配（空条件集合不匹配）。
pub fn matches_any(filters: &[Filter], record: &dyn Filterable) -> bool {
    filters.iter().any(|filter| filter.matches(record))
}
