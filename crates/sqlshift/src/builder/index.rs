//! Index diff query builder.

use sqlshift_schema::diff::{Diff, IndexDiff};
use sqlshift_schema::schema::Index;

use crate::query::MigrationQuery;

use super::{quote, quote_list};

/// Builds `ALTER TABLE ... ADD|DROP` statements for indexes.
///
/// Indexes cannot be altered in place, so a modified index is dropped and
/// added again.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexQueryBuilder;

impl IndexQueryBuilder {
    #[must_use]
    pub fn build_query(&self, diff: &IndexDiff, table: &str) -> MigrationQuery {
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

    /// Renders an index definition such as `` UNIQUE KEY `uq_email` (`email`) ``.
    /// Primary keys carry no name.
    #[must_use]
    pub fn build_signature(&self, index: &Index) -> String {
        if index.is_primary() {
            format!("{} ({})", index.kind.to_sql(), quote_list(&index.columns))
        } else {
            format!(
                "{} {} ({})",
                index.kind.to_sql(),
                quote(&index.name),
                quote_list(&index.columns)
            )
        }
    }

    fn add(&self, table: &str, index: &Index) -> String {
        format!("ALTER TABLE {table} ADD {};", self.build_signature(index))
    }

    fn drop(table: &str, index: &Index) -> String {
        if index.is_primary() {
            format!("ALTER TABLE {table} DROP PRIMARY KEY;")
        } else {
            format!("ALTER TABLE {table} DROP KEY {};", quote(&index.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshift_schema::schema::IndexKind;

    #[test]
    fn test_signatures() {
        let pk = Index::primary(vec!["id".into()]);
        assert_eq!(IndexQueryBuilder.build_signature(&pk), "PRIMARY KEY (`id`)");

        let uq = Index::new(IndexKind::Unique, "uq_name", vec!["first".into(), "last".into()]);
        assert_eq!(
            IndexQueryBuilder.build_signature(&uq),
            "UNIQUE KEY `uq_name` (`first`,`last`)"
        );

        let ft = Index::new(IndexKind::Fulltext, "ft_body", vec!["body".into()]);
        assert_eq!(IndexQueryBuilder.build_signature(&ft), "FULLTEXT KEY `ft_body` (`body`)");
    }

    #[test]
    fn test_new_and_deleted() {
        let idx = Index::new(IndexKind::Key, "idx_title", vec!["title".into()]);

        let query = IndexQueryBuilder.build_query(&Diff::New(idx.clone()), "post");
        assert_eq!(query.up(), ["ALTER TABLE `post` ADD KEY `idx_title` (`title`);"]);
        assert_eq!(query.down(), ["ALTER TABLE `post` DROP KEY `idx_title`;"]);

        let query = IndexQueryBuilder.build_query(&Diff::Deleted(idx), "post");
        assert_eq!(query.up(), ["ALTER TABLE `post` DROP KEY `idx_title`;"]);
        assert_eq!(query.down(), ["ALTER TABLE `post` ADD KEY `idx_title` (`title`);"]);
    }

    #[test]
    fn test_modified_primary_key() {
        let diff = Diff::Modified {
            source: Index::primary(vec!["id".into(), "lang".into()]),
            target: Index::primary(vec!["id".into()]),
        };
        let query = IndexQueryBuilder.build_query(&diff, "post");

        assert_eq!(
            query.up(),
            [
                "ALTER TABLE `post` DROP PRIMARY KEY;",
                "ALTER TABLE `post` ADD PRIMARY KEY (`id`,`lang`);",
            ]
        );
        assert_eq!(
            query.down(),
            [
                "ALTER TABLE `post` DROP PRIMARY KEY;",
                "ALTER TABLE `post` ADD PRIMARY KEY (`id`);",
            ]
        );
    }

    #[test]
    fn test_modified_index_reverts_to_target() {
        let diff = Diff::Modified {
            source: Index::new(IndexKind::Unique, "idx_slug", vec!["slug".into()]),
            target: Index::new(IndexKind::Key, "idx_slug", vec!["slug".into(), "lang".into()]),
        };
        let query = IndexQueryBuilder.build_query(&diff, "post");

        assert_eq!(
            query.up(),
            [
                "ALTER TABLE `post` DROP KEY `idx_slug`;",
                "ALTER TABLE `post` ADD UNIQUE KEY `idx_slug` (`slug`);",
            ]
        );
        assert_eq!(
            query.down(),
            [
                "ALTER TABLE `post` DROP KEY `idx_slug`;",
                "ALTER TABLE `post` ADD KEY `idx_slug` (`slug`,`lang`);",
            ]
        );

        let inverted = IndexQueryBuilder.build_query(&diff.invert(), "post");
        assert_eq!(inverted.up(), query.down());
        assert_eq!(inverted.down(), query.up());
    }
}
