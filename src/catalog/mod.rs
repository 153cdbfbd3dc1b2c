//! Schema reflection operations.
//!
//! Each operation issues fixed catalog statements with bound parameters
//! directly on the connection source. They do not go through the query
//! gateway's classification or rate limiting.

pub mod erd;
pub mod fuzzy;
pub mod sample;

pub use erd::{ErdColumnRow, ErdGraph, ErdTable, ForeignKey, Relationship};
pub use fuzzy::{ColumnDescription, ColumnMatch, FuzzyMatchResult, rank_columns};
pub use sample::{DEFAULT_SAMPLE_LIMIT, quote_ident};

use crate::database::{CellValue, ColumnInfo, ConnectionSource, RawQueryResult, RelatedTable, Row};
use crate::error::DbResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const LIST_SCHEMAS: &str = "
    SELECT schema_name
    FROM information_schema.schemata
    WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
    ORDER BY schema_name";

const LIST_TABLES: &str = "
    SELECT table_name
    FROM information_schema.tables
    WHERE table_schema = $1::text AND table_type = 'BASE TABLE'";

const LIST_COLUMNS: &str = "
    SELECT column_name, data_type, is_nullable
    FROM information_schema.columns
    WHERE table_schema = $1::text AND table_name = $2::text
    ORDER BY ordinal_position";

const FOREIGN_KEYS_FROM: &str = "
    SELECT
        kcu.table_schema AS fk_schema,
        kcu.table_name AS fk_table,
        kcu.column_name AS fk_column,
        ccu.table_schema AS pk_schema,
        ccu.table_name AS pk_table,
        ccu.column_name AS pk_column
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name
    WHERE tc.constraint_type = 'FOREIGN KEY'
        AND kcu.table_schema = $1::text
        AND kcu.table_name = $2::text";

const FOREIGN_KEYS_TO: &str = "
    SELECT
        kcu.table_schema AS fk_schema,
        kcu.table_name AS fk_table,
        kcu.column_name AS fk_column,
        ccu.table_schema AS pk_schema,
        ccu.table_name AS pk_table,
        ccu.column_name AS pk_column
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name
    WHERE tc.constraint_type = 'FOREIGN KEY'
        AND ccu.table_schema = $1::text
        AND ccu.table_name = $2::text";

const FOREIGN_KEYS_BETWEEN: &str = "
    SELECT kcu.column_name AS fk_column, ccu.column_name AS pk_column
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
        AND kcu.table_schema = $1::text
        AND (
            (kcu.table_name = $2::text AND ccu.table_name = $3::text) OR
            (kcu.table_name = $3::text AND ccu.table_name = $2::text)
        )";

const ERD_COLUMNS: &str = "
    SELECT c.table_name, c.column_name,
           tc.constraint_type, kcu2.table_name AS fk_table, kcu2.column_name AS fk_column
    FROM information_schema.columns c
    LEFT JOIN information_schema.key_column_usage kcu
        ON c.table_name = kcu.table_name AND c.column_name = kcu.column_name
        AND c.table_schema = kcu.table_schema
    LEFT JOIN information_schema.table_constraints tc
        ON kcu.constraint_name = tc.constraint_name AND tc.table_schema = c.table_schema
    LEFT JOIN information_schema.referential_constraints rc
        ON rc.constraint_name = tc.constraint_name AND rc.constraint_schema = tc.table_schema
    LEFT JOIN information_schema.key_column_usage kcu2
        ON rc.unique_constraint_name = kcu2.constraint_name
        AND kcu2.constraint_schema = c.table_schema
    WHERE c.table_schema = $1::text
    ORDER BY c.table_name, c.ordinal_position";

const COLUMN_COMMENTS: &str = "
    SELECT a.attname::text AS column_name, d.description AS comment
    FROM pg_attribute a
    JOIN pg_class c ON a.attrelid = c.oid
    JOIN pg_namespace n ON c.relnamespace = n.oid
    LEFT JOIN pg_description d ON a.attrelid = d.objoid AND a.attnum = d.objsubid
    WHERE c.relkind = 'r'
        AND n.nspname = $1::text
        AND c.relname = $2::text
        AND a.attnum > 0
        AND NOT a.attisdropped
    ORDER BY a.attnum";

/// Catalog lookups over a connection source.
#[derive(Clone)]
pub struct Catalog {
    source: Arc<dyn ConnectionSource>,
}

impl Catalog {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self { source }
    }

    async fn run(&self, statement: &str, params: &[&str]) -> DbResult<RawQueryResult> {
        let mut connection = self.source.acquire().await?;
        connection
            .query(statement, params, &CancellationToken::new())
            .await
    }

    /// Non-system schemas, sorted by name.
    #[instrument(skip(self))]
    pub async fn list_schemas(&self) -> DbResult<Vec<String>> {
        let result = self.run(LIST_SCHEMAS, &[]).await?;
        Ok(result.strings("schema_name"))
    }

    /// Base tables of `schema`.
    #[instrument(skip(self))]
    pub async fn list_tables(&self, schema: &str) -> DbResult<Vec<String>> {
        let result = self.run(LIST_TABLES, &[schema]).await?;
        Ok(result.strings("table_name"))
    }

    #[instrument(skip(self))]
    pub async fn list_columns(&self, schema: &str, table: &str) -> DbResult<Vec<ColumnInfo>> {
        let result = self.run(LIST_COLUMNS, &[schema, table]).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                Some(ColumnInfo {
                    name: text(row, "column_name")?,
                    data_type: text(row, "data_type")?,
                    is_nullable: text(row, "is_nullable").as_deref() == Some("YES"),
                })
            })
            .collect())
    }

    /// Tables this table references, followed by tables referencing it.
    #[instrument(skip(self))]
    pub async fn find_related_tables(
        &self,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<RelatedTable>> {
        let referenced = self.run(FOREIGN_KEYS_FROM, &[schema, table]).await?;
        let referencing = self.run(FOREIGN_KEYS_TO, &[schema, table]).await?;

        let related = referenced
            .rows
            .iter()
            .filter_map(|row| related_table(row, "pk_schema", "pk_table"))
            .chain(
                referencing
                    .rows
                    .iter()
                    .filter_map(|row| related_table(row, "fk_schema", "fk_table")),
            )
            .collect::<Vec<_>>();
        debug!("Found {} related tables", related.len());
        Ok(related)
    }

    /// One-sentence English description of the direct foreign key between
    /// two tables, in either direction.
    #[instrument(skip(self))]
    pub async fn describe_relationship(
        &self,
        schema: &str,
        table1: &str,
        table2: &str,
    ) -> DbResult<String> {
        let result = self
            .run(FOREIGN_KEYS_BETWEEN, &[schema, table1, table2])
            .await?;

        let Some(row) = result.rows.first() else {
            return Ok(format!(
                "There is no direct foreign key relationship between \"{}\" and \"{}\" in schema \"{}\".",
                table1, table2, schema
            ));
        };

        Ok(format!(
            "Table \"{}\" is related to \"{}\" via foreign key: \"{}\" references \"{}\".",
            table1,
            table2,
            text(row, "fk_column").unwrap_or_default(),
            text(row, "pk_column").unwrap_or_default()
        ))
    }

    /// Tables, keys and foreign-key edges of `schema`.
    #[instrument(skip(self))]
    pub async fn erd_graph(&self, schema: &str) -> DbResult<ErdGraph> {
        let tables = self.list_tables(schema).await?;
        let columns = self.run(ERD_COLUMNS, &[schema]).await?;
        let rows: Vec<ErdColumnRow> = columns.rows.iter().filter_map(ErdColumnRow::from_row).collect();
        Ok(ErdGraph::build(tables, &rows))
    }

    pub async fn generate_erd_json(&self, schema: &str) -> DbResult<ErdGraph> {
        self.erd_graph(schema).await
    }

    pub async fn generate_erd_mermaid(&self, schema: &str) -> DbResult<String> {
        Ok(self.erd_graph(schema).await?.to_mermaid())
    }

    /// Rank a table's columns against `keyword` using names and comments.
    #[instrument(skip(self))]
    pub async fn fuzzy_column_match(
        &self,
        schema: &str,
        table: &str,
        keyword: &str,
    ) -> DbResult<FuzzyMatchResult> {
        let result = self.run(COLUMN_COMMENTS, &[schema, table]).await?;
        let columns = result
            .rows
            .iter()
            .filter_map(|row| {
                Some(ColumnDescription {
                    name: text(row, "column_name")?,
                    comment: text(row, "comment").filter(|c| !c.is_empty()),
                })
            })
            .collect();
        Ok(rank_columns(keyword, columns))
    }

    /// Up to `limit` distinct values of one column.
    #[instrument(skip(self))]
    pub async fn sample_column_data(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        limit: u32,
    ) -> DbResult<Vec<CellValue>> {
        let statement = sample::sample_statement(schema, table, column);
        let limit = limit.to_string();
        let result = self.run(&statement, &[limit.as_str()]).await?;
        Ok(result
            .rows
            .into_iter()
            .map(|mut row| row.shift_remove(column).unwrap_or(CellValue::Null))
            .collect())
    }
}

fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(CellValue::as_str).map(String::from)
}

fn related_table(row: &Row, schema_key: &str, table_key: &str) -> Option<RelatedTable> {
    Some(RelatedTable {
        schema: text(row, schema_key)?,
        table: text(row, table_key)?,
        fk_column: text(row, "fk_column")?,
        pk_column: text(row, "pk_column")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::{MockSource, table};

    fn catalog(source: &MockSource) -> Catalog {
        Catalog::new(Arc::new(source.clone()))
    }

    #[tokio::test]
    async fn test_list_schemas() {
        let source = MockSource::new().on(
            "information_schema.schemata",
            table(
                &["schema_name"],
                vec![vec!["app".into()], vec!["public".into()]],
            ),
        );

        let schemas = catalog(&source).list_schemas().await.unwrap();

        assert_eq!(schemas, vec!["app", "public"]);
        assert!(source.statements()[0].1.is_empty());
        assert_eq!(source.metrics().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_list_tables_binds_schema() {
        let source = MockSource::new().on(
            "information_schema.tables",
            table(&["table_name"], vec![vec!["users".into()]]),
        );

        let tables = catalog(&source).list_tables("public").await.unwrap();

        assert_eq!(tables, vec!["users"]);
        assert_eq!(source.statements()[0].1, vec!["public"]);
    }

    #[tokio::test]
    async fn test_list_columns_maps_nullability() {
        let source = MockSource::new().on(
            "information_schema.columns",
            table(
                &["column_name", "data_type", "is_nullable"],
                vec![
                    vec!["id".into(), "integer".into(), "NO".into()],
                    vec!["email".into(), "text".into(), "YES".into()],
                ],
            ),
        );

        let columns = catalog(&source).list_columns("public", "users").await.unwrap();

        assert_eq!(columns.len(), 2);
        assert!(!columns[0].is_nullable);
        assert!(columns[1].is_nullable);
        assert_eq!(columns[1].data_type, "text");
        assert_eq!(source.statements()[0].1, vec!["public", "users"]);
    }

    #[tokio::test]
    async fn test_find_related_tables_both_directions() {
        let columns = [
            "fk_schema", "fk_table", "fk_column", "pk_schema", "pk_table", "pk_column",
        ];
        let source = MockSource::new()
            .on(
                "kcu.table_name = $2",
                table(
                    &columns,
                    vec![["public", "orders", "user_id", "public", "users", "id"]
                        .map(CellValue::from)
                        .to_vec()],
                ),
            )
            .on(
                "ccu.table_name = $2",
                table(
                    &columns,
                    vec![["public", "payments", "order_id", "public", "orders", "id"]
                        .map(CellValue::from)
                        .to_vec()],
                ),
            );

        let related = catalog(&source)
            .find_related_tables("public", "orders")
            .await
            .unwrap();

        assert_eq!(related.len(), 2);
        assert_eq!(related[0].table, "users");
        assert_eq!(related[0].fk_column, "user_id");
        assert_eq!(related[1].table, "payments");
        assert_eq!(related[1].pk_column, "id");
    }

    #[tokio::test]
    async fn test_describe_relationship() {
        let source = MockSource::new().with_result(table(
            &["fk_column", "pk_column"],
            vec![vec!["user_id".into(), "id".into()]],
        ));

        let explanation = catalog(&source)
            .describe_relationship("public", "orders", "users")
            .await
            .unwrap();

        assert_eq!(
            explanation,
            "Table \"orders\" is related to \"users\" via foreign key: \"user_id\" references \"id\"."
        );
        assert_eq!(source.statements()[0].1, vec!["public", "orders", "users"]);
    }

    #[tokio::test]
    async fn test_describe_missing_relationship() {
        let source = MockSource::new();

        let explanation = catalog(&source)
            .describe_relationship("public", "a", "b")
            .await
            .unwrap();

        assert!(explanation.starts_with("There is no direct foreign key relationship"));
    }

    #[tokio::test]
    async fn test_generate_erd_mermaid() {
        let source = MockSource::new()
            .on(
                "table_type = 'BASE TABLE'",
                table(&["table_name"], vec![vec!["users".into()], vec!["orders".into()]]),
            )
            .on(
                "referential_constraints",
                table(
                    &["table_name", "column_name", "constraint_type", "fk_table", "fk_column"],
                    vec![
                        vec!["users".into(), "id".into(), "PRIMARY KEY".into(), CellValue::Null, CellValue::Null],
                        vec!["orders".into(), "user_id".into(), "FOREIGN KEY".into(), "users".into(), "id".into()],
                    ],
                ),
            );

        let diagram = catalog(&source).generate_erd_mermaid("public").await.unwrap();

        assert!(diagram.starts_with("erDiagram\n  users {\n    string id PK\n"));
        assert!(diagram.ends_with("  orders }o--|| users : \"user_id to id\"\n"));
    }

    #[tokio::test]
    async fn test_fuzzy_column_match_uses_comments() {
        let source = MockSource::new().on(
            "pg_description",
            table(
                &["column_name", "comment"],
                vec![
                    vec!["c1".into(), CellValue::Null],
                    vec!["c2".into(), "Customer signup date".into()],
                ],
            ),
        );

        let result = catalog(&source)
            .fuzzy_column_match("public", "users", "signup")
            .await
            .unwrap();

        assert_eq!(result.best_match.as_deref(), Some("c2"));
        assert_eq!(result.all_matches.len(), 2);
    }

    #[tokio::test]
    async fn test_sample_column_data() {
        let source = MockSource::new().with_result(table(
            &["status"],
            vec![vec!["active".into()], vec![CellValue::Null]],
        ));

        let values = catalog(&source)
            .sample_column_data("public", "users", "status", DEFAULT_SAMPLE_LIMIT)
            .await
            .unwrap();

        assert_eq!(values, vec![CellValue::from("active"), CellValue::Null]);
        let (statement, params) = &source.statements()[0];
        assert_eq!(
            statement,
            "SELECT DISTINCT \"status\" FROM \"public\".\"users\" LIMIT $1::text::int"
        );
        assert_eq!(params, &vec!["5".to_string()]);
    }

    #[test]
    fn test_every_parameter_is_bound_as_text() {
        let placeholder = regex::Regex::new(r"\$\d+(::\w+)?").unwrap();
        let sample = sample::sample_statement("public", "users", "status");
        let statements = [
            LIST_TABLES,
            LIST_COLUMNS,
            FOREIGN_KEYS_FROM,
            FOREIGN_KEYS_TO,
            FOREIGN_KEYS_BETWEEN,
            ERD_COLUMNS,
            COLUMN_COMMENTS,
            sample.as_str(),
        ];

        for statement in statements {
            for found in placeholder.captures_iter(statement) {
                assert_eq!(
                    found.get(1).map(|cast| cast.as_str()),
                    Some("::text"),
                    "untyped or non-text parameter in: {}",
                    statement
                );
            }
        }
    }

    #[tokio::test]
    async fn test_database_error_propagates() {
        let source = MockSource::new().with_failure("permission denied for schema app");

        let err = catalog(&source).list_tables("app").await.unwrap_err();

        assert_eq!(err.to_string(), "permission denied for schema app");
        assert_eq!(source.metrics().outstanding(), 0);
    }
}
