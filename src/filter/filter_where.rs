use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
    raw_conditions: Vec<String>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
            raw_conditions: vec![],
        }
    }

    /// Generate a WHERE body and its parameters; placeholders start after `starting_param_index`
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        if !where_data.is_null() {
            self.parse_where_data(where_data)?;
        }

        let mut sql_conditions = std::mem::take(&mut self.raw_conditions);
        let conditions = std::mem::take(&mut self.conditions);
        for condition in &conditions {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }

        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    // Empty conjunction is true, empty disjunction is false
                    let sql = if op == "$and" { "1=1" } else { "1=0" };
                    self.raw_conditions.push(sql.to_string());
                    return Ok(());
                }
                let mut sql_parts = Vec::new();
                for v in arr {
                    let sql = self.nested(v)?;
                    sql_parts.push(format!("({})", sql));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                self.raw_conditions.push(format!("({})", sql_parts.join(joiner)));
                Ok(())
            }
            "$not" => {
                let sql = self.nested(value)?;
                self.raw_conditions.push(format!("NOT ({})", sql));
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn nested(&mut self, value: &Value) -> Result<String, FilterError> {
        let (sql, params) = Self::generate(value, self.param_index)?;
        self.param_index += params.len();
        self.param_values.extend(params);
        Ok(sql)
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        Filter::validate_identifier(field).map_err(|_| FilterError::InvalidColumn(field.to_string()))?;

        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    self.conditions.push(FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() });
                }
            }
            _ => {
                // Implicit equality: { field: value }
                self.conditions.push(FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() });
            }
        }
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let data = &condition.data;
        match condition.operator {
            FilterOp::Eq => {
                if data.is_null() { Ok(format!("{} IS NULL", quoted_column)) }
                else { Ok(format!("{} = {}", quoted_column, self.param(data.clone()))) }
            }
            FilterOp::Ne => {
                if data.is_null() { Ok(format!("{} IS NOT NULL", quoted_column)) }
                else { Ok(format!("{} <> {}", quoted_column, self.param(data.clone()))) }
            }
            FilterOp::Gt => Ok(format!("{} > {}", quoted_column, self.param(data.clone()))),
            FilterOp::Gte => Ok(format!("{} >= {}", quoted_column, self.param(data.clone()))),
            FilterOp::Lt => Ok(format!("{} < {}", quoted_column, self.param(data.clone()))),
            FilterOp::Lte => Ok(format!("{} <= {}", quoted_column, self.param(data.clone()))),
            FilterOp::Like => Ok(format!("{} LIKE {}", quoted_column, self.param(data.clone()))),
            FilterOp::ILike => Ok(format!("{} ILIKE {}", quoted_column, self.param(data.clone()))),
            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok(if negate { "1=1" } else { "1=0" }.to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                let keyword = if negate { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", quoted_column, keyword, params.join(", ")))
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(values[0].clone());
                    let high = self.param(values[1].clone());
                    Ok(format!("{} BETWEEN {} AND {}", quoted_column, low, high))
                }
                _ => Err(FilterError::InvalidOperatorData("$between requires array with 2 values".to_string())),
            },
            FilterOp::Null => match data {
                Value::Bool(true) => Ok(format!("{} IS NULL", quoted_column)),
                Value::Bool(false) => Ok(format!("{} IS NOT NULL", quoted_column)),
                _ => Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_and_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "company_id": 3, "end_time": null }), 0).unwrap();
        assert_eq!(sql, "\"company_id\" = $1 AND \"end_time\" IS NULL");
        assert_eq!(params, vec![json!(3)]);
    }

    #[test]
    fn nested_and_keeps_placeholder_numbering() {
        let where_data = json!({
            "$and": [
                { "$or": [{ "exam_id": 1 }, { "taker_id": 2 }] },
                { "company_id": 4 }
            ]
        });
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(sql, "((((\"exam_id\" = $1) OR (\"taker_id\" = $2))) AND (\"company_id\" = $3))");
        assert_eq!(params, vec![json!(1), json!(2), json!(4)]);
    }

    #[test]
    fn empty_in_is_false() {
        let (sql, params) = FilterWhere::generate(&json!({ "company_id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_hostile_column_names() {
        let err = FilterWhere::generate(&json!({ "id\" OR 1=1 --": 1 }), 0).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }

    #[test]
    fn rejects_unknown_operator() {
        let err = FilterWhere::generate(&json!({ "id": { "$regex": "x" } }), 0).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
    }
}
