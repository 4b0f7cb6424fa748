// filter/matcher.rs - Evaluate FilterData against JSON rows in memory
//
// Mirrors the SQL generated by FilterWhere/FilterOrder so the in-memory store
// and Postgres agree on which rows a filter selects.

use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOp, SortDirection};

pub struct Matcher;

impl Matcher {
    /// Apply where, order, offset and limit to `rows`
    pub fn apply(data: &FilterData, rows: Vec<Value>) -> Result<Vec<Value>, FilterError> {
        let where_data = data.where_clause.clone().unwrap_or(Value::Null);
        // Same validation the SQL path performs
        FilterWhere::generate(&where_data, 0)?;

        let mut out = Vec::new();
        for row in rows {
            if Self::matches(&where_data, &row)? {
                out.push(row);
            }
        }

        if let Some(order) = &data.order {
            let infos = FilterOrder::validate_and_parse(order)?;
            out.sort_by(|a, b| {
                for info in &infos {
                    let ordering = compare_for_sort(a.get(&info.column), b.get(&info.column), info.sort);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = match data.offset {
            Some(off) if off < 0 => return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())),
            Some(off) => off as usize,
            None => 0,
        };
        let mut out: Vec<Value> = out.into_iter().skip(offset).collect();
        if let Some(limit) = data.limit {
            if limit < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
            let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i32::MAX);
            out.truncate(limit.min(max_limit) as usize);
        }
        Ok(out)
    }

    pub fn matches(where_data: &Value, row: &Value) -> Result<bool, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(true),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };

        for (key, value) in obj {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for v in Self::operands(key, value)? {
                        if !Self::matches(v, row)? { all = false; break; }
                    }
                    all
                }
                "$or" => {
                    let mut any = false;
                    for v in Self::operands(key, value)? {
                        if Self::matches(v, row)? { any = true; break; }
                    }
                    any
                }
                "$not" => !Self::matches(value, row)?,
                op if op.starts_with('$') => return Err(FilterError::UnsupportedOperator(op.to_string())),
                field => Self::field_matches(row.get(field), value)?,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn operands<'a>(op: &str, value: &'a Value) -> Result<&'a Vec<Value>, FilterError> {
        value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))
    }

    fn field_matches(field: Option<&Value>, condition: &Value) -> Result<bool, FilterError> {
        let field = field.unwrap_or(&Value::Null);
        match condition {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => {
                for (op_key, op_val) in obj {
                    let op = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    if !Self::op_matches(op, field, op_val)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            other => Self::op_matches(FilterOp::Eq, field, other),
        }
    }

    fn op_matches(op: FilterOp, field: &Value, data: &Value) -> Result<bool, FilterError> {
        Ok(match op {
            FilterOp::Eq if data.is_null() => field.is_null(),
            FilterOp::Ne if data.is_null() => !field.is_null(),
            FilterOp::Eq => compare(field, data) == Some(Ordering::Equal),
            FilterOp::Ne => matches!(compare(field, data), Some(o) if o != Ordering::Equal),
            FilterOp::Gt => compare(field, data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(compare(field, data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => compare(field, data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(compare(field, data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Like | FilterOp::ILike => match (field.as_str(), data.as_str()) {
                (Some(text), Some(pattern)) if op == FilterOp::ILike => like(&text.to_lowercase(), &pattern.to_lowercase()),
                (Some(text), Some(pattern)) => like(text, pattern),
                _ => false,
            },
            FilterOp::In | FilterOp::NIn => {
                let values = match data {
                    Value::Array(values) => values.as_slice(),
                    other => std::slice::from_ref(other),
                };
                let found = values.iter().any(|v| compare(field, v) == Some(Ordering::Equal));
                if op == FilterOp::In {
                    found
                } else {
                    values.is_empty() || (!field.is_null() && !found)
                }
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    matches!(compare(field, &values[0]), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(compare(field, &values[1]), Some(Ordering::Less | Ordering::Equal))
                }
                _ => return Err(FilterError::InvalidOperatorData("$between requires array with 2 values".to_string())),
            },
            FilterOp::Null => match data {
                Value::Bool(true) => field.is_null(),
                Value::Bool(false) => !field.is_null(),
                _ => return Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        })
    }
}

/// SQL-style comparison: NULL compares to nothing, mismatched types do not compare
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => (a == b).then_some(Ordering::Equal),
        _ => None,
    }
}

/// Postgres orders NULLs last ascending and first descending
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>, sort: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ordering = match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
    };
    match sort {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// LIKE with `%` (any run) and `_` (one char)
fn like(text: &str, pattern: &str) -> bool {
    fn go(t: &[char], p: &[char]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some(('%', rest)) => (0..=t.len()).any(|i| go(&t[i..], rest)),
            Some(('_', rest)) => !t.is_empty() && go(&t[1..], rest),
            Some((c, rest)) => t.first() == Some(c) && go(&t[1..], rest),
        }
    }
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    go(&t, &p)
}
