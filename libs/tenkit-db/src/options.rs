//! Caller-tunable query options: projection, joins and ordering.
//!
//! Options are built fluently by the service layer and applied to a scoped
//! select. Every fragment is validated (see [`crate::validate`]) at apply
//! time; an invalid fragment fails the whole operation with
//! `InvalidArgument` rather than being dropped.

use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{EntityTrait, QueryOrder, QuerySelect, QueryTrait, Select};

use crate::Result;
use crate::validate;

/// Options accepted by the `*_with` query entry points.
///
/// ```rust,ignore
/// let opts = QueryOptions::new()
///     .order_by("created_at DESC")
///     .select(["id", "name"])
///     .join("LEFT JOIN orders ON orders.widget_id = widgets.id");
/// let rows = repo.find_by_query_with(&scope, "name LIKE ?", vec!["a%".into()], &opts).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    order_by: Option<String>,
    select: Vec<String>,
    joins: Vec<String>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordering expression, e.g. `"created_at DESC"` or `"a ASC, b DESC"`.
    #[must_use]
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by = Some(expr.into());
        self
    }

    /// Restrict the projection to the given columns (or aggregate
    /// projections such as `COUNT(*) AS total`). The caller is responsible
    /// for keeping every column the row decoder needs.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a JOIN clause, e.g.
    /// `"LEFT JOIN orders ON orders.user_id = users.id"`.
    #[must_use]
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order_by.is_none() && self.select.is_empty() && self.joins.is_empty()
    }

    /// Validate every fragment and apply it to the select.
    ///
    /// # Errors
    /// `InvalidArgument` for any rejected fragment; the select is not
    /// partially modified in that case.
    pub(crate) fn apply<E>(&self, mut query: Select<E>) -> Result<Select<E>>
    where
        E: EntityTrait,
    {
        // Validate everything up front so an error leaves no half-applied
        // fragments behind.
        validate::validate_select(&self.select)?;
        let joins = self
            .joins
            .iter()
            .map(|clause| validate::parse_join(clause.trim()))
            .collect::<Result<Vec<_>>>()?;
        let order = match &self.order_by {
            Some(expr) => validate::parse_order_by(expr)?,
            None => Vec::new(),
        };

        if !self.select.is_empty() {
            query = query.select_only();
            for col in &self.select {
                query = QuerySelect::expr(query, Expr::cust(col.trim()));
            }
        }

        for spec in joins {
            let stmt = QueryTrait::query(&mut query);
            match spec.alias {
                Some(alias) => {
                    stmt.join_as(
                        spec.kind,
                        Alias::new(spec.table),
                        Alias::new(alias),
                        Expr::cust(spec.on),
                    );
                }
                None => {
                    stmt.join(spec.kind, Alias::new(spec.table), Expr::cust(spec.on));
                }
            }
        }

        for spec in order {
            query = query.order_by(Expr::cust(spec.column), spec.direction);
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fragments() {
        let opts = QueryOptions::new()
            .order_by("created_at DESC")
            .select(["id", "name"])
            .join("LEFT JOIN orders ON orders.user_id = users.id");

        assert!(!opts.is_empty());
        assert_eq!(opts.select.len(), 2);
        assert_eq!(opts.joins.len(), 1);
    }

    #[test]
    fn default_is_empty() {
        assert!(QueryOptions::new().is_empty());
    }
}
