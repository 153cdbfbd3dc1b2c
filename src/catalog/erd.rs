//! Entity-relationship graph construction and Mermaid rendering.

use crate::database::{CellValue, Row};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write;

/// One column of the ERD catalog query, with its key constraint if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErdColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub constraint_type: Option<String>,
    pub fk_table: Option<String>,
    pub fk_column: Option<String>,
}

impl ErdColumnRow {
    /// Decode a catalog row; rows missing a table or column name are skipped.
    pub fn from_row(row: &Row) -> Option<Self> {
        let text = |key: &str| row.get(key).and_then(CellValue::as_str).map(String::from);
        Some(Self {
            table_name: text("table_name")?,
            column_name: text("column_name")?,
            constraint_type: text("constraint_type"),
            fk_table: text("fk_table"),
            fk_column: text("fk_column"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub references: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErdTable {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl ErdTable {
    fn new(name: String) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Tables of one schema with their keys and the foreign-key edges between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErdGraph {
    pub tables: Vec<ErdTable>,
    pub relationships: Vec<Relationship>,
}

impl ErdGraph {
    /// Assemble the graph from the base tables and the column catalog.
    ///
    /// Tables keep the order given; columns of tables not listed (views,
    /// foreign tables) are ignored.
    pub fn build(tables: Vec<String>, columns: &[ErdColumnRow]) -> Self {
        let mut by_name: IndexMap<String, ErdTable> = tables
            .into_iter()
            .map(|name| (name.clone(), ErdTable::new(name)))
            .collect();
        let mut relationships = Vec::new();

        for row in columns {
            let Some(table) = by_name.get_mut(&row.table_name) else {
                continue;
            };
            table.columns.push(row.column_name.clone());

            match row.constraint_type.as_deref() {
                Some("PRIMARY KEY") => table.primary_keys.push(row.column_name.clone()),
                Some("FOREIGN KEY") => {
                    let Some(fk_table) = &row.fk_table else {
                        continue;
                    };
                    let fk_column = row.fk_column.clone().unwrap_or_default();
                    table.foreign_keys.push(ForeignKey {
                        column: row.column_name.clone(),
                        references: ColumnRef {
                            table: fk_table.clone(),
                            column: fk_column.clone(),
                        },
                    });
                    relationships.push(Relationship {
                        from_table: row.table_name.clone(),
                        from_column: row.column_name.clone(),
                        to_table: fk_table.clone(),
                        to_column: fk_column,
                    });
                }
                _ => {}
            }
        }

        Self {
            tables: by_name.into_values().collect(),
            relationships,
        }
    }

    /// Render as a Mermaid `erDiagram`.
    ///
    /// A column that carries several constraints appears once per constraint,
    /// matching the catalog rows.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("erDiagram\n");
        for table in &self.tables {
            let _ = writeln!(out, "  {} {{", table.name);
            for column in &table.columns {
                let pk = if table.primary_keys.contains(column) {
                    " PK"
                } else {
                    ""
                };
                let _ = writeln!(out, "    string {}{}", column, pk);
            }
            out.push_str("  }\n");
        }
        for table in &self.tables {
            for fk in &table.foreign_keys {
                let _ = writeln!(
                    out,
                    "  {} }}o--|| {} : \"{} to {}\"",
                    table.name, fk.references.table, fk.column, fk.references.column
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, name: &str) -> ErdColumnRow {
        ErdColumnRow {
            table_name: table.into(),
            column_name: name.into(),
            constraint_type: None,
            fk_table: None,
            fk_column: None,
        }
    }

    fn primary(table: &str, name: &str) -> ErdColumnRow {
        ErdColumnRow {
            constraint_type: Some("PRIMARY KEY".into()),
            ..column(table, name)
        }
    }

    fn foreign(table: &str, name: &str, to_table: &str, to_column: &str) -> ErdColumnRow {
        ErdColumnRow {
            constraint_type: Some("FOREIGN KEY".into()),
            fk_table: Some(to_table.into()),
            fk_column: Some(to_column.into()),
            ..column(table, name)
        }
    }

    fn sample_graph() -> ErdGraph {
        ErdGraph::build(
            vec!["users".into(), "orders".into()],
            &[
                primary("users", "id"),
                column("users", "email"),
                primary("orders", "id"),
                foreign("orders", "user_id", "users", "id"),
                column("active_users", "id"),
            ],
        )
    }

    #[test]
    fn test_build_graph() {
        let graph = sample_graph();

        assert_eq!(graph.tables.len(), 2);
        assert_eq!(graph.tables[0].name, "users");
        assert_eq!(graph.tables[0].columns, vec!["id", "email"]);
        assert_eq!(graph.tables[0].primary_keys, vec!["id"]);
        assert_eq!(graph.tables[1].foreign_keys[0].references.table, "users");
        assert_eq!(
            graph.relationships,
            vec![Relationship {
                from_table: "orders".into(),
                from_column: "user_id".into(),
                to_table: "users".into(),
                to_column: "id".into(),
            }]
        );
    }

    #[test]
    fn test_foreign_key_without_target_is_plain_column() {
        let mut row = foreign("orders", "user_id", "users", "id");
        row.fk_table = None;
        let graph = ErdGraph::build(vec!["orders".into()], &[row]);

        assert_eq!(graph.tables[0].columns, vec!["user_id"]);
        assert!(graph.tables[0].foreign_keys.is_empty());
        assert!(graph.relationships.is_empty());
    }

    #[test]
    fn test_empty_tables_are_kept() {
        let graph = ErdGraph::build(vec!["empty".into()], &[]);
        assert_eq!(graph.tables[0].columns.len(), 0);
        assert_eq!(graph.to_mermaid(), "erDiagram\n  empty {\n  }\n");
    }

    #[test]
    fn test_mermaid_rendering() {
        let expected = "erDiagram\n\
                        \x20 users {\n\
                        \x20   string id PK\n\
                        \x20   string email\n\
                        \x20 }\n\
                        \x20 orders {\n\
                        \x20   string id PK\n\
                        \x20   string user_id\n\
                        \x20 }\n\
                        \x20 orders }o--|| users : \"user_id to id\"\n";
        assert_eq!(sample_graph().to_mermaid(), expected);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample_graph()).unwrap();
        assert_eq!(
            json["tables"][1]["foreign_keys"][0],
            serde_json::json!({"column": "user_id", "references": {"table": "users", "column": "id"}})
        );
        assert_eq!(json["relationships"][0]["to_table"], "users");
    }
}
