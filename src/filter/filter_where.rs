use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{quote_identifier, validate_column};

/// Builds a parameterized WHERE body from equality predicates.
///
/// `{ field: null }` becomes `IS NULL`, arrays become `IN (...)`, text is
/// compared through `::text` so string ids also match integer columns.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(
        conditions: &Map<String, Value>,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(conditions)
    }

    fn build(&mut self, conditions: &Map<String, Value>) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for (column, value) in conditions {
            validate_column(column)?;
            sql_conditions.push(self.build_sql_condition(column, value)?);
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn build_sql_condition(&mut self, column: &str, value: &Value) -> Result<String, FilterError> {
        let quoted_column = quote_identifier(column);
        match value {
            Value::Null => Ok(format!("{} IS NULL", quoted_column)),
            Value::String(_) => Ok(format!("{}::text = {}", quoted_column, self.param(value.clone()))),
            Value::Array(values) => {
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
            }
            Value::Object(_) => Err(FilterError::InvalidWhereClause(format!(
                "nested conditions are not supported for column {}",
                column
            ))),
            _ => Ok(format!("{} = {}", quoted_column, self.param(value.clone()))),
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

    fn conditions(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_conditions_match_everything() {
        let (sql, params) = FilterWhere::generate(&Map::new(), 0).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn null_is_rendered_without_a_parameter() {
        let (sql, params) = FilterWhere::generate(&conditions(json!({ "deleted_at": null, "id_persona": 7 })), 0).unwrap();
        assert_eq!(sql, "\"deleted_at\" IS NULL AND \"id_persona\" = $1");
        assert_eq!(params, vec![json!(7)]);
    }

    #[test]
    fn parameters_continue_from_starting_index() {
        let (sql, params) = FilterWhere::generate(&conditions(json!({ "username": "ana" })), 2).unwrap();
        assert_eq!(sql, "\"username\"::text = $3");
        assert_eq!(params, vec![json!("ana")]);
    }

    #[test]
    fn arrays_become_in_lists() {
        let (sql, params) = FilterWhere::generate(&conditions(json!({ "estado": [1, 2] })), 0).unwrap();
        assert_eq!(sql, "\"estado\" IN ($1, $2)");
        assert_eq!(params.len(), 2);

        let (sql, _) = FilterWhere::generate(&conditions(json!({ "estado": [] })), 0).unwrap();
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn rejects_bad_columns_and_nested_objects() {
        assert!(FilterWhere::generate(&conditions(json!({ "a b": 1 })), 0).is_err());
        assert!(FilterWhere::generate(&conditions(json!({ "estado": { "$gt": 1 } })), 0).is_err());
    }
}
