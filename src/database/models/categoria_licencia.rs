use crate::database::binding::{CollectionBinding, FieldKind, FieldSpec};
use crate::types::SortOrder;

pub const CATEGORIAS_LICENCIA: CollectionBinding = CollectionBinding {
    name: "categorias_licencia",
    id_field: "id_categoria_licencia",
    fields: &[
        FieldSpec::new("codigo", FieldKind::Text).required_on_create().required_on_update(),
        FieldSpec::new("descripcion", FieldKind::Text).required_on_create(),
    ],
    soft_delete: true,
    default_select: &["id_categoria_licencia", "codigo", "descripcion", "deleted_at"],
    default_sort: Some(SortOrder::asc("id_categoria_licencia")),
    ownership_field: None,
};
