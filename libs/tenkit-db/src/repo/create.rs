//! Insert paths: create, batched create, batched upsert.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, IntoActiveModel};

use super::{DEFAULT_BATCH_SIZE, Repository, map_db_err};
use crate::Result;
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;
use crate::tenant;
use tenkit_errors::Error;

impl<E> Repository<E>
where
    E: TenantPolicy,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
{
    /// Insert one entity.
    ///
    /// Tenant fields are filled from the scope before the insert; any
    /// tenant/dept values already present on the entity are overwritten.
    /// Returns the persisted row, primary key included.
    ///
    /// # Errors
    /// `Unauthenticated` when the scope cannot tag the row,
    /// `InvalidArgument` when the entity cannot participate in isolation,
    /// `AlreadyExists` on a unique-constraint conflict.
    pub async fn create(&self, scope: &RequestScope, mut entity: E::ActiveModel) -> Result<E::Model> {
        tenant::fill_tenant_fields::<E>(scope, &mut entity)?;

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async { entity.insert(&exec).await.map_err(map_db_err) })
            .await
    }

    /// Insert entities in chunks of `batch_size` (`0` means
    /// [`DEFAULT_BATCH_SIZE`]). The per-element contract is identical to
    /// [`create`](Self::create).
    ///
    /// # Errors
    /// `InvalidArgument` on an empty input.
    pub async fn create_batch(
        &self,
        scope: &RequestScope,
        entities: Vec<E::ActiveModel>,
        batch_size: usize,
    ) -> Result<u64> {
        if entities.is_empty() {
            return Err(Error::invalid_argument("entities cannot be empty"));
        }
        let batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };

        let mut entities = entities;
        for entity in &mut entities {
            tenant::fill_tenant_fields::<E>(scope, entity)?;
        }

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async {
                let mut inserted = 0;
                let mut remaining = entities;
                while !remaining.is_empty() {
                    let rest = if remaining.len() > batch_size {
                        remaining.split_off(batch_size)
                    } else {
                        Vec::new()
                    };
                    inserted += E::insert_many(remaining)
                        .exec_without_returning(&exec)
                        .await
                        .map_err(map_db_err)?;
                    remaining = rest;
                }
                Ok(inserted)
            })
            .await
    }

    /// Insert entities, updating on primary-key conflict.
    ///
    /// Tenant fields are filled before the insert, and the conflict update
    /// set excludes the primary key and the tenant/dept columns: the update
    /// leg of an upsert can never move a row across tenants or departments.
    ///
    /// # Errors
    /// `InvalidArgument` on an empty input.
    pub async fn upsert_batch(
        &self,
        scope: &RequestScope,
        entities: Vec<E::ActiveModel>,
    ) -> Result<()> {
        if entities.is_empty() {
            return Err(Error::invalid_argument("entities cannot be empty"));
        }

        let mut entities = entities;
        for entity in &mut entities {
            tenant::fill_tenant_fields::<E>(scope, entity)?;
        }

        let pk_col = self.pk_column()?;
        let update_cols = self.writable_columns();

        let mut conflict = OnConflict::column(pk_col);
        if update_cols.is_empty() {
            conflict.do_nothing();
        } else {
            conflict.update_columns(update_cols);
        }

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async {
                E::insert_many(entities)
                    .on_conflict(conflict)
                    .exec_without_returning(&exec)
                    .await
                    .map_err(map_db_err)?;
                Ok(())
            })
            .await
    }
}
