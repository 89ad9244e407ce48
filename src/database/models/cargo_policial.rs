use crate::database::binding::{CollectionBinding, FieldKind, FieldSpec};
use crate::types::SortOrder;

pub const CARGOS_POLICIALES: CollectionBinding = CollectionBinding {
    name: "cargos_policiales",
    id_field: "id_cargo_policial",
    fields: &[
        FieldSpec::new("nombre_cargo", FieldKind::Text).required_on_create().required_on_update(),
        FieldSpec::new("descripcion", FieldKind::Text),
    ],
    soft_delete: true,
    default_select: &["id_cargo_policial", "nombre_cargo", "descripcion", "deleted_at"],
    default_sort: Some(SortOrder::asc("id_cargo_policial")),
    ownership_field: None,
};
