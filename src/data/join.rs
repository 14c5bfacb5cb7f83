//! Full outer join of two tables on shared key columns.

use polars::prelude::*;
use tracing::debug;

use super::columns::require_columns;
use crate::error::Result;

pub struct Joiner;

impl Joiner {
    /// Rows found on one side only carry nulls in the other side's columns.
    ///
    /// Keys appear once in the output, which is sorted by the keys.
    pub fn full_outer<S: AsRef<str>>(
        left: &DataFrame,
        right: &DataFrame,
        keys: &[S],
    ) -> Result<DataFrame> {
        require_columns(left, keys)?;
        require_columns(right, keys)?;

        let on: Vec<Expr> = keys.iter().map(|k| col(k.as_ref())).collect();
        let joined = left
            .clone()
            .lazy()
            .join(
                right.clone().lazy(),
                on.clone(),
                on.clone(),
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            )
            .sort_by_exprs(on, SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;

        debug!(
            left = left.height(),
            right = right.height(),
            rows = joined.height(),
            "joined tables"
        );
        Ok(joined)
    }
}
