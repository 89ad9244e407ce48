use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::backend::{BackendError, Record};
use crate::database::binding::{CollectionBinding, FieldKind, FieldSpec};
use crate::database::record_access::{AccessResult, FindOptions, RecordAccess};
use crate::database::validation::{validate_string_length, ValidationError};
use crate::types::SortOrder;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;

pub const USUARIOS: CollectionBinding = CollectionBinding {
    name: "usuarios",
    id_field: "id_usuario",
    fields: &[
        FieldSpec::new("username", FieldKind::Text).required_on_create().required_on_update(),
        FieldSpec::new("contrasena", FieldKind::Text).required_on_create(),
        FieldSpec::new("rol", FieldKind::Text).required_on_create().required_on_update(),
        FieldSpec::new("estado", FieldKind::Integer),
    ],
    soft_delete: true,
    // `contrasena` is selected for login; `Usuario` never serializes it
    default_select: &["id_usuario", "username", "contrasena", "rol", "estado", "fecha_creacion", "deleted_at"],
    default_sort: Some(SortOrder::asc("id_usuario")),
    ownership_field: Some("id_usuario"),
};

/// A stored user. The password hash is readable but never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id_usuario: i64,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub contrasena: Option<String>,
    pub rol: String,
    #[serde(default)]
    pub estado: Option<i64>,
    #[serde(default)]
    pub fecha_creacion: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl Usuario {
    pub fn from_record(record: Record) -> Result<Self, BackendError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|e| BackendError::Decode(format!("usuario: {}", e)))
    }

    pub fn is_active(&self) -> bool {
        self.estado == Some(1)
    }

    pub fn id(&self) -> Value {
        Value::from(self.id_usuario)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUsuario {
    pub username: String,
    pub contrasena: String,
    pub rol: String,
    pub estado: i64,
}

impl NewUsuario {
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("username".into(), Value::String(self.username));
        record.insert("contrasena".into(), Value::String(self.contrasena));
        record.insert("rol".into(), Value::String(self.rol));
        record.insert("estado".into(), Value::from(self.estado));
        record
    }
}

/// Checks applied to user payloads on top of the required fields.
pub fn validate_payload(payload: &Record) -> Result<(), ValidationError> {
    validate_string_length(payload.get("username"), USERNAME_MIN, USERNAME_MAX, "username")
}

/// Live user by username.
pub async fn find_by_username(usuarios: &RecordAccess, username: &str) -> AccessResult<Option<Usuario>> {
    let mut filters = Record::new();
    filters.insert("username".into(), Value::String(username.to_string()));

    let found = usuarios.find_all(FindOptions::filtered(filters)).await?;
    match found.into_iter().next() {
        Some(record) => Ok(Some(Usuario::from_record(record)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_hash_is_never_serialized() {
        let record = json!({
            "id_usuario": 4,
            "username": "agente",
            "contrasena": "$2b$10$abcdefghijklmnopqrstuu",
            "rol": "admin",
            "estado": 1,
            "deleted_at": null
        });
        let user = Usuario::from_record(record.as_object().cloned().unwrap()).unwrap();
        assert!(user.contrasena.is_some());
        assert!(user.is_active());

        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("contrasena").is_none());
        assert_eq!(out["username"], json!("agente"));
    }

    #[test]
    fn username_length_is_checked() {
        let ok = json!({ "username": "ana" });
        let short = json!({ "username": "an" });
        assert!(validate_payload(ok.as_object().unwrap()).is_ok());
        assert_eq!(validate_payload(short.as_object().unwrap()).unwrap_err().fields, vec!["username"]);
    }
}
