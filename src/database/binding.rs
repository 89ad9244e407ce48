//! Static description of a collection: its fields, which of them are
//! required for each operation, and the record-access policy it gets.

use crate::types::{Operation, SortOrder};

/// Field carrying the soft-delete timestamp.
pub const DELETED_AT: &str = "deleted_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    /// RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]` string
    Timestamp,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    on_create: bool,
    on_update: bool,
    on_delete: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, on_create: false, on_update: false, on_delete: false }
    }

    pub const fn required_on_create(self) -> Self {
        Self { on_create: true, ..self }
    }

    pub const fn required_on_update(self) -> Self {
        Self { on_update: true, ..self }
    }

    pub const fn required_on_delete(self) -> Self {
        Self { on_delete: true, ..self }
    }

    pub fn required_on(&self, op: Operation) -> bool {
        match op {
            Operation::Create => self.on_create,
            Operation::Update => self.on_update,
            Operation::Delete => self.on_delete,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionBinding {
    /// Table or collection name
    pub name: &'static str,
    pub id_field: &'static str,
    /// Writable fields. Anything else in a payload is dropped.
    pub fields: &'static [FieldSpec],
    pub soft_delete: bool,
    /// Columns returned by default queries; empty means all.
    pub default_select: &'static [&'static str],
    pub default_sort: Option<SortOrder>,
    /// Record field that must equal the acting user's id for owner-scoped access.
    pub ownership_field: Option<&'static str>,
}

impl CollectionBinding {
    pub fn required(&self, op: Operation) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required_on(op))
            .map(|f| f.name)
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_writable(&self, name: &str) -> bool {
        self.field(name).is_some() || (self.soft_delete && name == DELETED_AT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("username", FieldKind::Text).required_on_create().required_on_update(),
        FieldSpec::new("contrasena", FieldKind::Text).required_on_create(),
        FieldSpec::new("motivo", FieldKind::Text).required_on_delete(),
        FieldSpec::new("estado", FieldKind::Integer),
    ];

    const BINDING: CollectionBinding = CollectionBinding {
        name: "usuarios",
        id_field: "id_usuario",
        fields: FIELDS,
        soft_delete: true,
        default_select: &[],
        default_sort: None,
        ownership_field: None,
    };

    #[test]
    fn required_lists_follow_field_tags() {
        assert_eq!(BINDING.required(Operation::Create), vec!["username", "contrasena"]);
        assert_eq!(BINDING.required(Operation::Update), vec!["username"]);
        assert_eq!(BINDING.required(Operation::Delete), vec!["motivo"]);
    }

    #[test]
    fn writable_fields() {
        assert!(BINDING.is_writable("estado"));
        assert!(BINDING.is_writable(DELETED_AT));
        assert!(!BINDING.is_writable("id_usuario"));
        assert!(!BINDING.is_writable("es_admin"));
    }
}
