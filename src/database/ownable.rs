//! Owner-scoped access for collections that declare an ownership field.

use std::ops::Deref;

use serde_json::Value;

use super::backend::Record;
use super::record_access::{AccessError, AccessResult, FindOptions, RecordAccess};

/// A [`RecordAccess`] whose binding names an ownership field.
///
/// Only constructible through [`Ownable::new`], so owner checks can never be
/// called on a collection that has no owner.
#[derive(Clone)]
pub struct Ownable<T> {
    inner: T,
    field: &'static str,
}

impl<T> Deref for Ownable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl Ownable<RecordAccess> {
    pub fn new(inner: RecordAccess) -> Option<Self> {
        let field = inner.binding().ownership_field?;
        Some(Self { inner, field })
    }

    pub fn ownership_field(&self) -> &'static str {
        self.field
    }

    pub fn is_owner(&self, record: &Record, actor: &Value) -> bool {
        record.get(self.field) == Some(actor)
    }

    /// Absence is reported before ownership.
    pub fn assert_ownership(&self, record: Option<&Record>, actor: &Value) -> AccessResult<()> {
        let collection = self.inner.binding().name;
        let Some(record) = record else {
            return Err(AccessError::NotFound(collection.to_string()));
        };
        if !self.is_owner(record, actor) {
            tracing::warn!(collection, actor = %actor, "Ownership check failed");
            return Err(AccessError::Forbidden(format!("not the owner of this {collection} record")));
        }
        Ok(())
    }

    pub async fn find_by_id_owned(&self, id: &Value, actor: &Value) -> AccessResult<Record> {
        let record = self.inner.find_by_id(id, false).await?;
        self.assert_ownership(record.as_ref(), actor)?;
        record.ok_or_else(|| AccessError::NotFound(self.inner.binding().name.to_string()))
    }

    /// A caller filter on the ownership field is replaced by `actor`.
    pub async fn find_all_by_owner(&self, actor: &Value, mut opts: FindOptions) -> AccessResult<Vec<Record>> {
        if let Some(previous) = opts.filters.insert(self.field.to_string(), actor.clone()) {
            if &previous != actor {
                tracing::warn!(
                    collection = self.inner.binding().name,
                    field = self.field,
                    "Ignoring caller filter on ownership field"
                );
            }
        }
        self.inner.find_all(opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::binding::{CollectionBinding, FieldKind, FieldSpec};
    use crate::database::memory::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("placa", FieldKind::Text),
        FieldSpec::new("id_usuario", FieldKind::Integer),
    ];

    const VEHICULOS: CollectionBinding = CollectionBinding {
        name: "vehiculos",
        id_field: "id_vehiculo",
        fields: FIELDS,
        soft_delete: true,
        default_select: &[],
        default_sort: None,
        ownership_field: Some("id_usuario"),
    };

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    async fn owned() -> Ownable<RecordAccess> {
        let ral = RecordAccess::new(VEHICULOS, Arc::new(MemoryBackend::table("id_vehiculo")));
        let owned = Ownable::new(ral).unwrap();
        owned.create(record(json!({ "placa": "ABC123", "id_usuario": 7 }))).await.unwrap();
        owned.create(record(json!({ "placa": "XYZ987", "id_usuario": 8 }))).await.unwrap();
        owned
    }

    #[test]
    fn unowned_bindings_cannot_be_wrapped() {
        let binding = CollectionBinding { ownership_field: None, ..VEHICULOS };
        let ral = RecordAccess::new(binding, Arc::new(MemoryBackend::table("id_vehiculo")));
        assert!(Ownable::new(ral).is_none());
    }

    #[tokio::test]
    async fn assert_ownership_reports_absence_first() {
        let owned = owned().await;
        let mine = owned.find_by_id(&json!(1), false).await.unwrap();

        assert!(owned.assert_ownership(mine.as_ref(), &json!(7)).is_ok());
        assert!(matches!(
            owned.assert_ownership(mine.as_ref(), &json!(8)),
            Err(AccessError::Forbidden(_))
        ));
        assert!(matches!(owned.assert_ownership(None, &json!(7)), Err(AccessError::NotFound(_))));
    }

    #[tokio::test]
    async fn find_by_id_owned_checks_the_actor() {
        let owned = owned().await;
        assert_eq!(owned.find_by_id_owned(&json!(1), &json!(7)).await.unwrap()["placa"], json!("ABC123"));
        assert!(matches!(
            owned.find_by_id_owned(&json!(2), &json!(7)).await,
            Err(AccessError::Forbidden(_))
        ));
        assert!(matches!(
            owned.find_by_id_owned(&json!(3), &json!(7)).await,
            Err(AccessError::NotFound(_))
        ));

        owned.delete(&json!(1), None).await.unwrap();
        assert!(matches!(
            owned.find_by_id_owned(&json!(1), &json!(7)).await,
            Err(AccessError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn caller_filters_cannot_widen_owner_scope() {
        let owned = owned().await;
        let opts = FindOptions::filtered(record(json!({ "id_usuario": 8 })));
        let rows = owned.find_all_by_owner(&json!(7), opts).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["placa"], json!("ABC123"));
    }
}
