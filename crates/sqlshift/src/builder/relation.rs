//! Foreign key diff query builder.

use sqlshift_schema::diff::{Diff, RelationDiff};
use sqlshift_schema::schema::ForeignKey;

use crate::query::MigrationQuery;

use super::{quote, quote_list};

/// Builds `ALTER TABLE ... ADD CONSTRAINT|DROP FOREIGN KEY` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationQueryBuilder;

impl RelationQueryBuilder {
    #[must_use]
    pub fn build_query(&self, diff: &RelationDiff, table: &str) -> MigrationQuery {
        let table = quote(table);
        match diff {
            Diff::New(source) => {
                MigrationQuery::pair(self.add(&table, source), Self::drop(&table, source))
            }
            Diff::Deleted(target) => {
                MigrationQuery::pair(Self::drop(&table, target), self.add(&table, target))
            }
            Diff::Modified { source, target } => MigrationQuery::new(
                vec![Self::drop(&table, target), self.add(&table, source)],
                vec![Self::drop(&table, source), self.add(&table, target)],
            ),
        }
    }

    /// Renders a constraint definition. `ON DELETE` and `ON UPDATE` appear
    /// only when set on the foreign key.
    #[must_use]
    pub fn build_signature(&self, relation: &ForeignKey) -> String {
        let mut sig = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote(&relation.name),
            quote_list(&relation.columns),
            quote(&relation.references_table),
            quote_list(&relation.references_columns),
        );
        if let Some(action) = relation.on_delete {
            sig.push_str(" ON DELETE ");
            sig.push_str(action.to_sql());
        }
        if let Some(action) = relation.on_update {
            sig.push_str(" ON UPDATE ");
            sig.push_str(action.to_sql());
        }
        sig
    }

    fn add(&self, table: &str, relation: &ForeignKey) -> String {
        format!("ALTER TABLE {table} ADD {};", self.build_signature(relation))
    }

    fn drop(table: &str, relation: &ForeignKey) -> String {
        format!("ALTER TABLE {table} DROP FOREIGN KEY {};", quote(&relation.name))
    }
}
