//! Type definitions for model schemas and the relational shapes derived from them

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered field list describing one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub fields: Vec<FieldDefinition>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First field flagged as primary key
    pub fn primary_key(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.primary_key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<FieldDefinition>> for Schema {
    fn from(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }
}

/// Represents one field of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub db_type: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyDefinition>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FieldDefinition {
    /// Create a non-null field of the given type
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            db_type: None,
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
            foreign_key: None,
            comment: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Use an explicit database type instead of the mapped one
    pub fn db_type(mut self, db_type: &str) -> Self {
        self.db_type = Some(db_type.to_string());
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn references(mut self, ref_table: &str, ref_column: &str) -> Self {
        self.foreign_key = Some(ForeignKeyDefinition {
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
            on_delete: None,
            on_update: None,
        });
        self
    }
}

/// Represents a foreign key declared on a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    pub ref_table: String,
    pub ref_column: String,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

/// What to do with documents carrying fields outside the schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforceMode {
    #[default]
    None,
    Remove,
    Strict,
}

/// Model options handed to the client unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(default)]
    pub pk: Option<String>,
    #[serde(default)]
    pub enforce_missing: bool,
    #[serde(default)]
    pub enforce_extra: EnforceMode,
    #[serde(default)]
    pub enforce_type: EnforceMode,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Kind of relationship between two models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
    HasAndBelongsToMany,
}

/// A relationship from one model to another, wired during initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    /// Identifier of the related model
    pub model: String,
    /// Name under which the related document is joined
    pub field_name: String,
    pub left_key: String,
    pub right_key: String,
}

impl Relation {
    pub fn new(kind: RelationKind, model: &str, field_name: &str, left_key: &str, right_key: &str) -> Self {
        Self {
            kind,
            model: model.to_string(),
            field_name: field_name.to_string(),
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
        }
    }
}

/// Represents a database table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub comment: Option<String>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
        }
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn set_primary_key(&mut self, pk: PrimaryKey) {
        self.primary_key = Some(pk);
    }

    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// Add a foreign key unless one with the same name is already present
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        if !self.foreign_keys.iter().any(|existing| existing.name == fk.name) {
            self.foreign_keys.push(fk);
        }
    }
}

/// Represents a database column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub comment: Option<String>,
    pub is_unique: bool,
}

impl Column {
    /// Create a new non-null column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            default: None,
            comment: None,
            is_unique: false,
        }
    }
}

/// Represents a primary key constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Represents an index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}
