use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;
use super::filter::is_valid_identifier;
use super::types::{FilterOp, FilterWhereInfo};

/// Builds the parameterized WHERE clause for a filter. Conditions are always
/// AND-combined; each `(column, operator, value)` triple becomes one SQL
/// predicate with `$n` placeholders.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    /// Generate `(where_sql, params)` from a JSON condition object. An empty
    /// object yields an empty clause (caller omits WHERE entirely).
    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(where_data)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() {
            return Ok(());
        }
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause(
                "WHERE must be a JSON object".to_string(),
            )),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<(String, Vec<Value>), FilterError> {
        self.parse_where_data(where_data)?;

        let mut sql_conditions = vec![];
        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        Ok((sql_conditions.join(" AND "), self.param_values.clone()))
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        return Err(FilterError::UnsupportedOperator(key.to_string()));
                    }
                    self.parse_field_condition(key, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause(
                "Unsupported WHERE format".to_string(),
            )),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo {
                    column: field.to_string(),
                    operator,
                    data: op_val.clone(),
                });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            });
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$between" => FilterOp::Between,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    Ok(format!("{} IS NULL", quoted_column))
                } else {
                    let p = self.param(condition.data.clone());
                    Ok(format!("{} = {}", quoted_column, p))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    Ok(format!("{} IS NOT NULL", quoted_column))
                } else {
                    let p = self.param(condition.data.clone());
                    Ok(format!("{} <> {}", quoted_column, p))
                }
            }
            FilterOp::Gt => {
                let p = self.param(condition.data.clone());
                Ok(format!("{} > {}", quoted_column, p))
            }
            FilterOp::Gte => {
                let p = self.param(condition.data.clone());
                Ok(format!("{} >= {}", quoted_column, p))
            }
            FilterOp::Lt => {
                let p = self.param(condition.data.clone());
                Ok(format!("{} < {}", quoted_column, p))
            }
            FilterOp::Lte => {
                let p = self.param(condition.data.clone());
                Ok(format!("{} <= {}", quoted_column, p))
            }
            FilterOp::Like => {
                let p = self.param(condition.data.clone());
                Ok(format!("{} LIKE {}", quoted_column, p))
            }
            FilterOp::ILike => {
                let p = self.param(condition.data.clone());
                Ok(format!("{} ILIKE {}", quoted_column, p))
            }
            FilterOp::In => {
                if let Value::Array(values) = &condition.data {
                    if values.is_empty() {
                        // Empty membership set matches nothing.
                        return Ok("1=0".to_string());
                    }
                    let params: Vec<String> =
                        values.iter().map(|v| self.param(v.clone())).collect();
                    Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
                } else {
                    let p = self.param(condition.data.clone());
                    Ok(format!("{} = {}", quoted_column, p))
                }
            }
            FilterOp::Between => {
                if let Value::Array(values) = &condition.data {
                    if values.len() != 2 {
                        return Err(FilterError::InvalidOperatorData(
                            "$between requires exactly 2 values".to_string(),
                        ));
                    }
                    let lo = self.param(values[0].clone());
                    let hi = self.param(values[1].clone());
                    Ok(format!("{} BETWEEN {} AND {}", quoted_column, lo, hi))
                } else {
                    Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ))
                }
            }
        }
    }

    /// Register a parameter value and return its `$n` placeholder, with an
    /// explicit cast where the bound text needs one.
    fn param(&mut self, value: Value) -> String {
        let cast = cast_suffix(&value);
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}{}", self.param_index, cast)
    }
}

/// Placeholder cast for string parameters that target non-text columns.
/// Values are bound as text; UUID- and RFC3339-shaped strings are cast so
/// Postgres can compare or store them against uuid/timestamptz columns.
pub(crate) fn cast_suffix(value: &Value) -> &'static str {
    match value {
        Value::String(s) if Uuid::parse_str(s).is_ok() => "::uuid",
        Value::String(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => "::timestamptz",
        _ => "",
    }
}
