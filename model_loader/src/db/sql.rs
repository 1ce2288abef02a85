//! SQL model client
//!
//! [`SqlModelClient`] is the [`ModelClient`] built when the loader is not
//! handed one. Creating a model maps its schema onto a [`Table`]; relations
//! add foreign keys or join tables. Nothing touches the database until
//! [`SqlModel::sync`] or [`Loader::sync_tables`] runs.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{Config, TypeMappingConfig};
use crate::db::client::ModelClient;
use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::models::loader::Loader;
use crate::schema::generator::{create_table_statements, TableStatements};
use crate::schema::types::{
    Column, ForeignKey, Index, ModelOptions, PrimaryKey, Relation, RelationKind, Schema, Table,
};

/// Model client backed by an sqlx pool
#[derive(Debug, Clone)]
pub struct SqlModelClient {
    connection: DatabaseConnection,
    type_mapping: TypeMappingConfig,
}

impl SqlModelClient {
    pub fn new(connection: DatabaseConnection, type_mapping: TypeMappingConfig) -> Self {
        Self {
            connection,
            type_mapping,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Map a field type to a database column type
    pub fn map_type_to_db_type(&self, field_type: &str) -> Result<String> {
        if let Some(custom_mappings) = &self.type_mapping.custom {
            if let Some(mapping) = custom_mappings.iter().find(|m| m.field_type == field_type) {
                return Ok(mapping.db_type.clone());
            }
        }

        if let Some(overrides) = &self.type_mapping.override_ {
            if let Some(db_type) = overrides.get(field_type) {
                return Ok(db_type.clone());
            }
        }

        let db_type = match field_type {
            "String" | "&str" | "string" => "VARCHAR(255)",
            "text" => "TEXT",
            "i8" | "i16" => "SMALLINT",
            "i32" | "u8" | "u16" | "u32" | "integer" | "int" => "INTEGER",
            "i64" | "u64" | "bigint" => "BIGINT",
            "f32" => "REAL",
            "f64" | "number" | "float" => "DOUBLE PRECISION",
            "bool" | "boolean" => "BOOLEAN",
            "date" => "TIMESTAMP WITH TIME ZONE",
            "buffer" | "binary" => "BYTEA",
            "object" | "array" | "json" => "JSONB",
            "uuid" => "UUID",
            t if t.contains("Vec<u8>") => "BYTEA",
            t if t.contains("NaiveDateTime") => "TIMESTAMP",
            t if t.contains("NaiveDate") => "DATE",
            t if t.contains("DateTime") => "TIMESTAMP WITH TIME ZONE",
            t if t.contains("Uuid") => "UUID",
            t if t.contains("Decimal") => "NUMERIC(20,6)",
            t if t.contains("Json") || t.contains("Value") || t.starts_with("Vec<") => "JSONB",
            _ => {
                return Err(Error::TypeMappingError(format!(
                    "No mapping found for type: {}",
                    field_type
                )))
            }
        };

        Ok(db_type.to_string())
    }

    fn build_table(&self, id: &str, schema: &Schema, options: Option<&ModelOptions>) -> Result<Table> {
        let mut table = Table::new(id);

        for field in &schema.fields {
            let data_type = match &field.db_type {
                Some(t) => t.clone(),
                None => self.map_type_to_db_type(&field.field_type)?,
            };

            table.add_column(Column {
                name: field.name.clone(),
                data_type,
                nullable: field.nullable,
                default: field.default.clone(),
                comment: field.comment.clone(),
                is_unique: field.unique,
            });
        }

        let pk = options
            .and_then(|o| o.pk.clone())
            .or_else(|| schema.primary_key().map(|f| f.name.clone()))
            .unwrap_or_else(|| "id".to_string());

        if !table.has_column(&pk) {
            table.columns.insert(0, Column::new(&pk, "UUID"));
        }

        table.set_primary_key(PrimaryKey {
            name: Some(format!("pk_{}", id)),
            columns: vec![pk.clone()],
        });

        for field in &schema.fields {
            if field.unique && field.name != pk {
                table.add_index(Index {
                    name: format!("ix_{}_{}", id, field.name),
                    columns: vec![field.name.clone()],
                    is_unique: true,
                });
            }

            if let Some(fk) = &field.foreign_key {
                table.add_foreign_key(ForeignKey {
                    name: format!("fk_{}_{}", id, field.name),
                    columns: vec![field.name.clone()],
                    ref_table: fk.ref_table.clone(),
                    ref_columns: vec![fk.ref_column.clone()],
                    on_delete: fk.on_delete.clone(),
                    on_update: fk.on_update.clone(),
                });
            }
        }

        Ok(table)
    }
}

#[async_trait]
impl ModelClient for SqlModelClient {
    type Model = SqlModel;

    async fn connect(config: &Config) -> Result<Self> {
        let database = config
            .database
            .as_ref()
            .ok_or_else(|| Error::ConfigError("No database section configured".to_string()))?;

        let connection = DatabaseConnection::connect(database).await?;
        Ok(Self::new(connection, config.type_mapping.clone()))
    }

    async fn db_ready(&self) -> Result<()> {
        self.connection.ping().await
    }

    fn create_model(&self, id: &str, schema: &Schema, options: Option<&ModelOptions>) -> Result<SqlModel> {
        let table = self
            .build_table(id, schema, options)
            .map_err(|e| Error::ModelRegistrationError(format!("{}: {}", id, e)))?;

        Ok(SqlModel {
            inner: Arc::new(SqlModelInner {
                id: id.to_string(),
                connection: self.connection.clone(),
                state: Mutex::new(ModelState {
                    table,
                    join_tables: Vec::new(),
                    relations: Vec::new(),
                }),
            }),
        })
    }

    fn relate(&self, model: &SqlModel, relation: &Relation, target: &SqlModel) -> Result<()> {
        match relation.kind {
            RelationKind::BelongsTo => {
                let ref_type = target.column_type(&relation.right_key)?;
                let mut state = model.state()?;
                ensure_column(&mut state.table, &relation.left_key, &ref_type);
                let name = format!("fk_{}_{}", model.id(), relation.left_key);
                state.table.add_foreign_key(ForeignKey {
                    name,
                    columns: vec![relation.left_key.clone()],
                    ref_table: target.id().to_string(),
                    ref_columns: vec![relation.right_key.clone()],
                    on_delete: None,
                    on_update: None,
                });
                state.relations.push(relation.clone());
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                let ref_type = model.column_type(&relation.left_key)?;
                {
                    let mut target_state = target.state()?;
                    ensure_column(&mut target_state.table, &relation.right_key, &ref_type);
                    let name = format!("fk_{}_{}", target.id(), relation.right_key);
                    target_state.table.add_foreign_key(ForeignKey {
                        name,
                        columns: vec![relation.right_key.clone()],
                        ref_table: model.id().to_string(),
                        ref_columns: vec![relation.left_key.clone()],
                        on_delete: None,
                        on_update: None,
                    });
                }
                model.state()?.relations.push(relation.clone());
            }
            RelationKind::HasAndBelongsToMany => {
                let left_type = model.column_type(&relation.left_key)?;
                let right_type = target.column_type(&relation.right_key)?;
                let join = join_table(
                    (model.id(), &relation.left_key, &left_type),
                    (target.id(), &relation.right_key, &right_type),
                    &relation.field_name,
                );

                let mut state = model.state()?;
                if !state.join_tables.iter().any(|t| t.name == join.name) {
                    state.join_tables.push(join);
                }
                state.relations.push(relation.clone());
            }
        }

        tracing::debug!(
            model = model.id(),
            target = target.id(),
            kind = ?relation.kind,
            "Relation recorded"
        );
        Ok(())
    }
}

/// Handle for a model created by [`SqlModelClient`]
#[derive(Debug, Clone)]
pub struct SqlModel {
    inner: Arc<SqlModelInner>,
}

#[derive(Debug)]
struct SqlModelInner {
    id: String,
    connection: DatabaseConnection,
    state: Mutex<ModelState>,
}

#[derive(Debug)]
struct ModelState {
    table: Table,
    join_tables: Vec<Table>,
    relations: Vec<Relation>,
}

impl SqlModel {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Snapshot of the model's table
    pub fn table(&self) -> Result<Table> {
        Ok(self.state()?.table.clone())
    }

    /// Relations recorded from this model's side
    pub fn relations(&self) -> Result<Vec<Relation>> {
        Ok(self.state()?.relations.clone())
    }

    /// DDL for the model's table followed by any join tables it owns
    pub fn statements(&self) -> Result<Vec<TableStatements>> {
        let state = self.state()?;
        let driver = self.inner.connection.driver();

        Ok(std::iter::once(&state.table)
            .chain(state.join_tables.iter())
            .map(|table| create_table_statements(driver, table))
            .collect())
    }

    /// Create the model's tables and constraints
    pub async fn sync(&self) -> Result<()> {
        let statements = self.statements()?;
        for table in &statements {
            self.inner.connection.execute_batch(table.all()).await?;
        }
        Ok(())
    }

    fn column_type(&self, column: &str) -> Result<String> {
        let state = self.state()?;
        state
            .table
            .columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.data_type.clone())
            .ok_or_else(|| {
                Error::InitializationError(format!("Model `{}` has no column `{}`", self.id(), column))
            })
    }

    fn state(&self) -> Result<MutexGuard<'_, ModelState>> {
        self.inner
            .state
            .lock()
            .map_err(|_| Error::Unknown(format!("State of model `{}` is poisoned", self.id())))
    }
}

impl Loader<SqlModelClient> {
    /// Create every registered model's tables, then add cross-table constraints
    pub async fn sync_tables(&self) -> Result<()> {
        let mut statements = Vec::new();
        for model in self.models().values() {
            statements.extend(model.statements()?);
        }

        let connection = self.client().connection();
        for table in &statements {
            connection.execute_batch(&table.create).await?;
        }
        for table in &statements {
            connection.execute_batch(&table.constraints).await?;
        }

        tracing::info!(tables = statements.len(), "Tables synchronized");
        Ok(())
    }
}

fn ensure_column(table: &mut Table, name: &str, data_type: &str) {
    if !table.has_column(name) {
        let mut column = Column::new(name, data_type);
        column.nullable = true;
        table.add_column(column);
    }
}

/// `(model, key, column type)` of one side of a join table
type JoinSide<'a> = (&'a str, &'a str, &'a str);

/// Join table for a many-to-many relation. Columns are prefixed with the
/// model name; a self reference prefixes the far side with the field name.
fn join_table(left: JoinSide<'_>, right: JoinSide<'_>, field_name: &str) -> Table {
    let (left_model, left_key, left_type) = left;
    let (right_model, right_key, right_type) = right;

    let (name, sides) = if left_model == right_model {
        let far = if field_name.is_empty() || field_name == left_model {
            "related"
        } else {
            field_name
        };
        (
            format!("{}_{}", left_model, far),
            [
                (left_model, left_model, left_key, left_type),
                (far, right_model, right_key, right_type),
            ],
        )
    } else {
        let mut sides = [
            (left_model, left_model, left_key, left_type),
            (right_model, right_model, right_key, right_type),
        ];
        sides.sort_by(|a, b| a.0.cmp(b.0));
        (format!("{}_{}", sides[0].0, sides[1].0), sides)
    };

    let mut table = Table::new(&name);
    let mut pk_columns = Vec::new();

    for (prefix, model, key, data_type) in sides {
        let column = format!("{}_{}", prefix, key);
        table.add_column(Column::new(&column, data_type));
        table.add_foreign_key(ForeignKey {
            name: format!("fk_{}_{}", name, column),
            columns: vec![column.clone()],
            ref_table: model.to_string(),
            ref_columns: vec![key.to_string()],
            on_delete: Some("CASCADE".to_string()),
            on_update: None,
        });
        pk_columns.push(column);
    }

    table.set_primary_key(PrimaryKey {
        name: Some(format!("pk_{}", name)),
        columns: pk_columns,
    });
    table
}
