//! Table DDL generator
//!
//! Produces the statements that create a model's table. Statements are
//! returned one per element because not every driver accepts several
//! commands in a single prepared query.

use crate::config::Driver;
use crate::schema::types::{ForeignKey, Table};

/// DDL for one table, split so constraints can run after every table exists
#[derive(Debug, Clone, Default)]
pub struct TableStatements {
    pub create: Vec<String>,
    pub constraints: Vec<String>,
}

impl TableStatements {
    /// All statements in execution order
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.create.iter().chain(self.constraints.iter())
    }
}

/// Generate the DDL for a table on the given driver
pub fn create_table_statements(driver: Driver, table: &Table) -> TableStatements {
    match driver {
        Driver::Postgres => postgres_create_table(table),
        Driver::Mysql => mysql_create_table(table),
        Driver::Sqlite => sqlite_create_table(table),
    }
}

fn postgres_create_table(table: &Table) -> TableStatements {
    let mut column_defs = Vec::new();
    for column in &table.columns {
        let nullable = if column.nullable { "NULL" } else { "NOT NULL" };
        let default = match &column.default {
            Some(default_val) => format!(" DEFAULT {}", default_val),
            None => String::new(),
        };

        column_defs.push(format!("  \"{}\" {}{} {}", column.name, column.data_type, default, nullable));
    }

    if let Some(pk) = &table.primary_key {
        column_defs.push(format!("  PRIMARY KEY ({})", quote_all(&pk.columns, '"')));
    }

    let mut create = vec![format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n)",
        table.name,
        column_defs.join(",\n")
    )];

    if let Some(comment) = &table.comment {
        create.push(format!(
            "COMMENT ON TABLE \"{}\" IS '{}'",
            table.name,
            comment.replace('\'', "''")
        ));
    }

    for column in &table.columns {
        if let Some(comment) = &column.comment {
            create.push(format!(
                "COMMENT ON COLUMN \"{}\".\"{}\" IS '{}'",
                table.name,
                column.name,
                comment.replace('\'', "''")
            ));
        }
    }

    for index in &table.indexes {
        let unique = if index.is_unique { "UNIQUE " } else { "" };
        create.push(format!(
            "CREATE {}INDEX IF NOT EXISTS \"{}\" ON \"{}\" ({})",
            unique,
            index.name,
            table.name,
            quote_all(&index.columns, '"')
        ));
    }

    let constraints = table
        .foreign_keys
        .iter()
        .map(|fk| {
            format!(
                "ALTER TABLE \"{}\" ADD CONSTRAINT \"{}\" FOREIGN KEY ({}) REFERENCES \"{}\" ({}){}",
                table.name,
                fk.name,
                quote_all(&fk.columns, '"'),
                fk.ref_table,
                quote_all(&fk.ref_columns, '"'),
                referential_actions(fk)
            )
        })
        .collect();

    TableStatements { create, constraints }
}

fn mysql_create_table(table: &Table) -> TableStatements {
    let mut column_defs = Vec::new();
    for column in &table.columns {
        let nullable = if column.nullable { "NULL" } else { "NOT NULL" };
        let default = match &column.default {
            Some(default_val) => format!(" DEFAULT {}", default_val),
            None => String::new(),
        };
        let comment = match &column.comment {
            Some(comment) => format!(" COMMENT '{}'", comment.replace('\'', "''")),
            None => String::new(),
        };

        column_defs.push(format!(
            "  `{}` {} {}{}{}",
            column.name,
            translate_data_type_for_mysql(&column.data_type),
            nullable,
            default,
            comment
        ));
    }

    if let Some(pk) = &table.primary_key {
        column_defs.push(format!("  PRIMARY KEY ({})", quote_all(&pk.columns, '`')));
    }

    for index in &table.indexes {
        let kind = if index.is_unique { "UNIQUE INDEX" } else { "INDEX" };
        column_defs.push(format!("  {} `{}` ({})", kind, index.name, quote_all(&index.columns, '`')));
    }

    let mut sql = format!("CREATE TABLE IF NOT EXISTS `{}` (\n{}\n)", table.name, column_defs.join(",\n"));
    if let Some(comment) = &table.comment {
        sql.push_str(&format!(" COMMENT='{}'", comment.replace('\'', "''")));
    }

    let constraints = table
        .foreign_keys
        .iter()
        .map(|fk| {
            format!(
                "ALTER TABLE `{}` ADD CONSTRAINT `{}` FOREIGN KEY ({}) REFERENCES `{}` ({}){}",
                table.name,
                fk.name,
                quote_all(&fk.columns, '`'),
                fk.ref_table,
                quote_all(&fk.ref_columns, '`'),
                referential_actions(fk)
            )
        })
        .collect();

    TableStatements {
        create: vec![sql],
        constraints,
    }
}

/// SQLite keeps foreign keys inside CREATE TABLE, so there is no constraint phase
fn sqlite_create_table(table: &Table) -> TableStatements {
    let single_pk = table
        .primary_key
        .as_ref()
        .filter(|pk| pk.columns.len() == 1)
        .map(|pk| pk.columns[0].as_str());

    let mut column_defs = Vec::new();
    for column in &table.columns {
        let data_type = translate_data_type_for_sqlite(&column.data_type);
        let mut column_def = format!("  \"{}\" {}", column.name, data_type);

        if let Some(default_val) = &column.default {
            column_def.push_str(&format!(" DEFAULT {}", default_val));
        }

        if single_pk == Some(column.name.as_str()) {
            column_def.push_str(" PRIMARY KEY");
            if data_type == "INTEGER" {
                column_def.push_str(" AUTOINCREMENT");
            }
        }

        if !column.nullable {
            column_def.push_str(" NOT NULL");
        }

        column_defs.push(column_def);
    }

    if let Some(pk) = &table.primary_key {
        if pk.columns.len() > 1 {
            column_defs.push(format!("  PRIMARY KEY ({})", quote_all(&pk.columns, '"')));
        }
    }

    for fk in &table.foreign_keys {
        column_defs.push(format!(
            "  FOREIGN KEY ({}) REFERENCES \"{}\" ({}){}",
            quote_all(&fk.columns, '"'),
            fk.ref_table,
            quote_all(&fk.ref_columns, '"'),
            referential_actions(fk)
        ));
    }

    let mut create = vec![format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n)",
        table.name,
        column_defs.join(",\n")
    )];

    for index in &table.indexes {
        let unique = if index.is_unique { "UNIQUE " } else { "" };
        create.push(format!(
            "CREATE {}INDEX IF NOT EXISTS \"{}\" ON \"{}\" ({})",
            unique,
            index.name,
            table.name,
            quote_all(&index.columns, '"')
        ));
    }

    TableStatements {
        create,
        constraints: Vec::new(),
    }
}

fn quote_all(names: &[String], quote: char) -> String {
    names
        .iter()
        .map(|name| format!("{quote}{name}{quote}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn referential_actions(fk: &ForeignKey) -> String {
    let mut actions = String::new();
    if let Some(action) = &fk.on_delete {
        actions.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = &fk.on_update {
        actions.push_str(&format!(" ON UPDATE {}", action));
    }
    actions
}

fn translate_data_type_for_mysql(pg_type: &str) -> String {
    match pg_type.to_lowercase().as_str() {
        "double precision" => "DOUBLE".to_string(),
        "bytea" => "LONGBLOB".to_string(),
        "jsonb" | "json" => "JSON".to_string(),
        "uuid" => "CHAR(36)".to_string(),
        "timestamp with time zone" | "timestamptz" => "TIMESTAMP".to_string(),
        "text" => "LONGTEXT".to_string(),
        _ => pg_type.to_string(),
    }
}

fn translate_data_type_for_sqlite(pg_type: &str) -> String {
    // SQLite only has five storage classes: NULL, INTEGER, REAL, TEXT and BLOB
    match pg_type.to_lowercase().as_str() {
        "smallint" | "integer" | "int" | "int4" | "bigint" | "int8" | "serial" | "bigserial" => {
            "INTEGER".to_string()
        }
        "real" | "float4" | "double precision" | "float8" | "numeric" | "decimal" => "REAL".to_string(),
        "boolean" | "bool" => "INTEGER".to_string(),
        "bytea" => "BLOB".to_string(),
        t if t.contains('(') => {
            let base_type = t.split('(').next().unwrap_or(t).trim();
            translate_data_type_for_sqlite(base_type)
        }
        _ => "TEXT".to_string(),
    }
}
