//! Schema representation types.
//!
//! These types describe MySQL tables as they are declared by the application
//! and as they are observed on a live server. Both sides use the same model so
//! the differ can compare them field by field.

use serde::{Deserialize, Serialize};

/// MySQL column types.
///
/// Integer widths are display widths, string and binary sizes are lengths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    TinyInt(u32),
    SmallInt(u32),
    MediumInt(u32),
    Int(u32),
    BigInt(u32),
    /// Fixed point with precision and scale.
    Decimal(u32, u32),
    /// Single precision float with optional precision and scale.
    Float(Option<(u32, u32)>),
    /// Double precision float with optional precision and scale.
    Double(Option<(u32, u32)>),
    Bit(u32),
    Char(u32),
    VarChar(u32),
    Binary(u32),
    VarBinary(u32),
    TinyText,
    Text,
    MediumText,
    LongText,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Enum(Vec<String>),
    Set(Vec<String>),
    Date,
    Time,
    DateTime,
    Timestamp,
    Year,
    Json,
}

impl ColumnType {
    /// Returns the upper-case MySQL type keyword.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::TinyInt(_) => "TINYINT",
            Self::SmallInt(_) => "SMALLINT",
            Self::MediumInt(_) => "MEDIUMINT",
            Self::Int(_) => "INT",
            Self::BigInt(_) => "BIGINT",
            Self::Decimal(..) => "DECIMAL",
            Self::Float(_) => "FLOAT",
            Self::Double(_) => "DOUBLE",
            Self::Bit(_) => "BIT",
            Self::Char(_) => "CHAR",
            Self::VarChar(_) => "VARCHAR",
            Self::Binary(_) => "BINARY",
            Self::VarBinary(_) => "VARBINARY",
            Self::TinyText => "TINYTEXT",
            Self::Text => "TEXT",
            Self::MediumText => "MEDIUMTEXT",
            Self::LongText => "LONGTEXT",
            Self::TinyBlob => "TINYBLOB",
            Self::Blob => "BLOB",
            Self::MediumBlob => "MEDIUMBLOB",
            Self::LongBlob => "LONGBLOB",
            Self::Enum(_) => "ENUM",
            Self::Set(_) => "SET",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Year => "YEAR",
            Self::Json => "JSON",
        }
    }

    /// Renders the type with its size, options or precision, e.g.
    /// `VARCHAR(100)`, `ENUM('a','b')` or `DECIMAL(10,2)`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let keyword = self.keyword();
        match self {
            Self::Enum(options) | Self::Set(options) => {
                let options: Vec<String> = options
                    .iter()
                    .map(|option| {
                        let option = option.trim().replace('\\', "\\\\");
                        format!("'{}'", option.replace('\'', "''"))
                    })
                    .collect();
                format!("{keyword}({})", options.join(","))
            }
            Self::TinyInt(size)
            | Self::SmallInt(size)
            | Self::MediumInt(size)
            | Self::Int(size)
            | Self::BigInt(size)
            | Self::Bit(size)
            | Self::Char(size)
            | Self::VarChar(size)
            | Self::Binary(size)
            | Self::VarBinary(size) => format!("{keyword}({size})"),
            Self::Decimal(precision, scale)
            | Self::Float(Some((precision, scale)))
            | Self::Double(Some((precision, scale))) => {
                format!("{keyword}({precision},{scale})")
            }
            _ => keyword.to_string(),
        }
    }

    /// Types accepting `UNSIGNED` and `ZEROFILL`.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::TinyInt(_)
                | Self::SmallInt(_)
                | Self::MediumInt(_)
                | Self::Int(_)
                | Self::BigInt(_)
                | Self::Decimal(..)
                | Self::Float(_)
                | Self::Double(_)
        )
    }

    /// Types accepting `AUTO_INCREMENT`.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt(_) | Self::SmallInt(_) | Self::MediumInt(_) | Self::Int(_) | Self::BigInt(_)
        )
    }

    /// Types carrying a character set, a collation and the binary attribute.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Char(_)
                | Self::VarChar(_)
                | Self::TinyText
                | Self::Text
                | Self::MediumText
                | Self::LongText
                | Self::Enum(_)
                | Self::Set(_)
        )
    }

    /// Types accepting `DEFAULT current_timestamp()` and `ON UPDATE current_timestamp()`.
    #[must_use]
    pub const fn is_auto_timestamp(&self) -> bool {
        matches!(self, Self::DateTime | Self::Timestamp)
    }

    /// `TIMESTAMP` is implicitly `NOT NULL` on older servers, so nullable
    /// timestamps are rendered with an explicit `NULL`.
    #[must_use]
    pub const fn is_timestamp(&self) -> bool {
        matches!(self, Self::Timestamp)
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// No explicit default.
    #[default]
    None,
    /// `DEFAULT NULL`.
    Null,
    /// `DEFAULT current_timestamp()`.
    CurrentTimestamp,
    /// A literal, rendered as a quoted string.
    Literal(String),
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    Restrict,
    Cascade,
    SetNull,
    NoAction,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// MySQL treats `NO ACTION` as `RESTRICT`.
    #[must_use]
    pub const fn normalized(action: Option<Self>) -> Self {
        match action {
            None | Some(Self::Restrict | Self::NoAction) => Self::Restrict,
            Some(other) => other,
        }
    }
}

const fn default_nullable() -> bool {
    true
}

/// Schema definition for a column.
///
/// Attributes a type cannot carry (for example `UNSIGNED` on a `VARCHAR`)
/// are kept but ignored when the column is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default: DefaultValue,
    #[serde(default)]
    pub on_update_timestamp: bool,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default)]
    pub zerofill: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Binary collation of the effective charset (`<charset>_bin`).
    #[serde(default)]
    pub binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    /// Creates a new nullable column without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: DefaultValue::None,
            on_update_timestamp: false,
            unsigned: false,
            zerofill: false,
            auto_increment: false,
            binary: false,
            charset: None,
            collate: None,
            comment: None,
        }
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Sets a literal default value.
    #[must_use]
    pub fn default_literal(self, value: impl Into<String>) -> Self {
        self.default(DefaultValue::Literal(value.into()))
    }

    #[must_use]
    pub const fn on_update_timestamp(mut self) -> Self {
        self.on_update_timestamp = true;
        self
    }

    #[must_use]
    pub const fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    #[must_use]
    pub const fn zerofill(mut self) -> Self {
        self.zerofill = true;
        self
    }

    /// Marks the column as an auto-increment primary key.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub const fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns true when this column renders `AUTO_INCREMENT PRIMARY KEY`.
    #[must_use]
    pub const fn is_auto_primary_key(&self) -> bool {
        self.auto_increment && self.column_type.is_integer()
    }
}

/// Kind of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Primary,
    Unique,
    Key,
    Fulltext,
    Spatial,
}

impl IndexKind {
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY KEY",
            Self::Unique => "UNIQUE KEY",
            Self::Key => "KEY",
            Self::Fulltext => "FULLTEXT KEY",
            Self::Spatial => "SPATIAL KEY",
        }
    }
}

/// Schema definition for an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name. Ignored for primary keys.
    #[serde(default)]
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<String>,
}

impl Index {
    #[must_use]
    pub fn new(kind: IndexKind, name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
        }
    }

    /// Creates a primary key over the given columns.
    #[must_use]
    pub fn primary(columns: Vec<String>) -> Self {
        Self::new(IndexKind::Primary, "PRIMARY", columns)
    }

    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self.kind, IndexKind::Primary)
    }

    /// Identity used to match indexes between two schemas.
    #[must_use]
    pub fn key(&self) -> &str {
        if self.is_primary() {
            "PRIMARY"
        } else {
            &self.name
        }
    }
}

/// Schema definition for a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ForeignKeyAction>,
}

impl ForeignKey {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        references_table: impl Into<String>,
        references_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            references_table: references_table.into(),
            references_columns,
            on_delete: None,
            on_update: None,
        }
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

/// Schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub relations: Vec<ForeignKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            relations: Vec::new(),
            engine: None,
            charset: None,
            collation: None,
        }
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: ForeignKey) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }
}

/// Server-level defaults applied when a table or column leaves an attribute unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    pub engine: String,
    pub charset: String,
    pub collation: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            engine: "InnoDB".to_string(),
            charset: "utf8mb4".to_string(),
            collation: "utf8mb4_general_ci".to_string(),
        }
    }
}

/// A complete database schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub defaults: Defaults,
}

impl DatabaseSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }
}
