//! Complaints, stored in the document backend.

use crate::database::binding::{CollectionBinding, FieldKind, FieldSpec};
use crate::types::SortOrder;

pub const QUEJAS: CollectionBinding = CollectionBinding {
    name: "quejas",
    id_field: "_id",
    fields: &[
        FieldSpec::new("fecha_radicacion", FieldKind::Timestamp).required_on_create(),
        FieldSpec::new("texto_queja", FieldKind::Text).required_on_create(),
        FieldSpec::new("estado", FieldKind::Text).required_on_create(),
        FieldSpec::new("medio_radicacion", FieldKind::Text).required_on_create(),
        // ids from the relational side, not document ids
        FieldSpec::new("id_comparendo", FieldKind::Integer).required_on_create(),
        FieldSpec::new("id_persona", FieldKind::Integer).required_on_create(),
        FieldSpec::new("respuesta", FieldKind::Text),
        FieldSpec::new("fecha_respuesta", FieldKind::Timestamp),
    ],
    soft_delete: true,
    default_select: &[],
    default_sort: Some(SortOrder::asc("createdAt")),
    ownership_field: None,
};

/// Fields with a lookup route of their own.
pub const INDEXED_FIELDS: &[&str] = &["id_persona", "id_comparendo"];
