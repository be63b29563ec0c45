//! Delete paths. Rows are removed outright; a scoped delete that matches
//! nothing reports `NotFound` for the single-row form and zero for the
//! batch form.

use sea_orm::{ColumnTrait, QueryFilter, Value};
use tenkit_errors::Error;

use super::{Repository, map_db_err, not_found};
use crate::Result;
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;
use crate::tenant;

impl<E> Repository<E>
where
    E: TenantPolicy,
{
    /// Delete one row by primary key under scope.
    ///
    /// # Errors
    /// `NotFound` when no visible row matched — including rows that exist
    /// under another tenant.
    pub async fn delete<V>(&self, scope: &RequestScope, id: V) -> Result<()>
    where
        V: Into<Value> + Send,
    {
        let pk_col = self.pk_column()?;
        let cond = tenant::scope_condition::<E>(scope)?;

        let mut delete = E::delete_many().filter(pk_col.eq(id));
        if let Some(cond) = cond {
            delete = delete.filter(cond);
        }

        let exec = scope.resolve(self.db().sea());
        let result = scope
            .guard(async { delete.exec(&exec).await.map_err(map_db_err) })
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    /// Delete the rows whose primary keys are in `ids`, intersected with
    /// scope. Matching nothing is not an error; the affected count is
    /// returned.
    ///
    /// # Errors
    /// `InvalidArgument` on an empty input.
    pub async fn delete_batch<V>(&self, scope: &RequestScope, ids: Vec<V>) -> Result<u64>
    where
        V: Into<Value> + Send,
    {
        if ids.is_empty() {
            return Err(Error::invalid_argument("ids cannot be empty"));
        }

        let pk_col = self.pk_column()?;
        let cond = tenant::scope_condition::<E>(scope)?;

        let mut delete = E::delete_many().filter(pk_col.is_in(ids));
        if let Some(cond) = cond {
            delete = delete.filter(cond);
        }

        let exec = scope.resolve(self.db().sea());
        let result = scope
            .guard(async { delete.exec(&exec).await.map_err(map_db_err) })
            .await?;
        Ok(result.rows_affected)
    }
}
