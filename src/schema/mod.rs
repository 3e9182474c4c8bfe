//! Schema Registry
//!
//! Every entity (one GTFS file) is described as data: a table name and an
//! ordered column list. The registry is the single source of truth for
//! column order (SQL column lists and CSV headers alike) and for the
//! validation bounds applied on import.

mod entities;

pub use entities::ENTITIES;

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// Literal default applied by the store when a column is not provided
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Real(f64),
    Text(&'static str),
}

/// Geographic axis of a coordinate column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    Latitude,
    Longitude,
}

impl Coordinate {
    /// Inclusive valid range in degrees
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Latitude => (-90.0, 90.0),
            Self::Longitude => (-180.0, 180.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }
}

/// A single column definition
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub primary: bool,
    pub default: Option<DefaultValue>,
    /// Set for coordinate columns whose range is checked on import
    pub coordinate: Option<Coordinate>,
    /// `HH:MM:SS` source column this seconds-since-midnight column derives from
    pub derived_from: Option<&'static str>,
    /// Synthetic or derived column, never exported
    pub internal: bool,
}

impl Column {
    const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            required: false,
            min: None,
            max: None,
            primary: false,
            default: None,
            coordinate: None,
            derived_from: None,
            internal: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, ColumnType::Real)
    }

    /// Store-assigned `id INTEGER PRIMARY KEY`
    pub const fn synthetic_id() -> Self {
        let mut column = Self::integer("id");
        column.primary = true;
        column.internal = true;
        column
    }

    pub const fn latitude(name: &'static str) -> Self {
        let mut column = Self::real(name).range(-90.0, 90.0);
        column.coordinate = Some(Coordinate::Latitude);
        column
    }

    pub const fn longitude(name: &'static str) -> Self {
        let mut column = Self::real(name).range(-180.0, 180.0);
        column.coordinate = Some(Coordinate::Longitude);
        column
    }

    /// Seconds since midnight computed from the `source` time column
    pub const fn timestamp(name: &'static str, source: &'static str) -> Self {
        let mut column = Self::integer(name);
        column.derived_from = Some(source);
        column.internal = true;
        column
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub const fn default_integer(mut self, value: i64) -> Self {
        self.default = Some(DefaultValue::Integer(value));
        self
    }

    pub const fn default_text(mut self, value: &'static str) -> Self {
        self.default = Some(DefaultValue::Text(value));
        self
    }

    pub fn is_exported(&self) -> bool {
        !self.internal
    }
}

/// One entity: a table and the file it is loaded from
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    /// Table name, also the base name of the `.txt` file
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Non-standard files are optional extensions and skipped silently when absent
    pub nonstandard: bool,
}

impl EntitySchema {
    pub fn filename(&self) -> String {
        format!("{}.txt", self.name)
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Columns written on export, in schema order
    pub fn exported_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.is_exported())
            .map(|c| c.name)
            .collect()
    }
}

/// All entities, in load order
pub fn all_entities() -> &'static [EntitySchema] {
    ENTITIES
}

/// Look up an entity by table name
pub fn entity(name: &str) -> Option<&'static EntitySchema> {
    ENTITIES.iter().find(|e| e.name == name)
}
