use serde_json::Value;

use super::error::FilterError;

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// Identifiers are limited to `[A-Za-z_][A-Za-z0-9_]*` so they can be quoted safely.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_column(name: &str) -> Result<(), FilterError> {
    if name.is_empty() {
        return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string()));
    }
    if !is_valid_identifier(name) {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", name)));
    }
    Ok(())
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified table reference, validated once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self, FilterError> {
        let schema = schema.into();
        let table = table.into();
        for name in [&schema, &table] {
            if name.is_empty() {
                return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string()));
            }
            if !is_valid_identifier(name) {
                return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
            }
        }
        Ok(Self { schema, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_valid_identifier("id_usuario"));
        assert!(is_valid_identifier("_id"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("name; DROP TABLE usuarios"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn qualified_table_name() {
        let t = TableName::new("public", "usuarios").unwrap();
        assert_eq!(t.qualified(), "\"public\".\"usuarios\"");
        assert!(TableName::new("public", "usuarios\"--").is_err());
    }
}
