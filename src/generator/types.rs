//! Column data type classification.
//!
//! Catalog type strings are folded into a closed [`DataType`] so generation can
//! match exhaustively. MySQL and DuckDB spellings are both recognised.

use crate::schema::Column;
use once_cell::sync::Lazy;
use regex::Regex;

/// Textual columns without a declared length
const DEFAULT_TEXT_LENGTH: usize = 255;
/// Upper bound on generated text, whatever the column allows
const MAX_TEXT_LENGTH: usize = 1000;
const DEFAULT_BINARY_LENGTH: usize = 10;
const MAX_BINARY_LENGTH: usize = 100;

static RE_QUOTED_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^']|'')*)'").unwrap());
static RE_BIT_LENGTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)bit\s*\(\s*(\d+)\s*\)").unwrap());
static RE_DECIMAL_SCALE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:decimal|numeric)\s*\(\s*\d+\s*,\s*(\d+)\s*\)").unwrap());

/// Integer storage width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    Tiny,
    Small,
    Medium,
    Int,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialKind {
    Point,
    LineString,
    Polygon,
    Other,
}

/// Supported data type categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Text { max_len: usize },
    Integer { width: IntWidth, unsigned: bool },
    Boolean,
    Decimal { scale: Option<u32> },
    Float,
    Date,
    Time,
    DateTime,
    Year,
    Enum(Vec<String>),
    Set(Vec<String>),
    Bit(u32),
    Binary(usize),
    Blob(usize),
    Json,
    Uuid,
    Spatial(SpatialKind),
    /// Anything else; generated as a short word
    Unknown(String),
}

impl DataType {
    /// Classify a column from its declared and raw type strings
    pub fn from_column(column: &Column) -> Self {
        let data_type = column.data_type.trim().to_ascii_lowercase();
        let column_type = column.column_type.trim().to_ascii_lowercase();
        let base = data_type
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        let unsigned = column_type.contains("unsigned");

        match base.as_str() {
            "varchar" | "char" | "text" | "tinytext" | "mediumtext" | "longtext" | "string"
            | "bpchar" | "character" | "character varying" | "nvarchar" | "nchar" => {
                let default = match base.as_str() {
                    "text" | "mediumtext" | "longtext" => MAX_TEXT_LENGTH,
                    _ => DEFAULT_TEXT_LENGTH,
                };
                let max_len = column
                    .char_max_length
                    .filter(|&n| n > 0)
                    .map_or(default, |n| n as usize)
                    .min(MAX_TEXT_LENGTH);
                DataType::Text { max_len }
            }
            "tinyint" if column_type.contains("tinyint(1)") => DataType::Boolean,
            "tinyint" | "int1" => DataType::Integer {
                width: IntWidth::Tiny,
                unsigned,
            },
            "utinyint" => DataType::Integer {
                width: IntWidth::Tiny,
                unsigned: true,
            },
            "smallint" | "int2" | "short" => DataType::Integer {
                width: IntWidth::Small,
                unsigned,
            },
            "usmallint" => DataType::Integer {
                width: IntWidth::Small,
                unsigned: true,
            },
            "mediumint" => DataType::Integer {
                width: IntWidth::Medium,
                unsigned,
            },
            "int" | "integer" | "int4" | "signed" => DataType::Integer {
                width: IntWidth::Int,
                unsigned,
            },
            "uinteger" => DataType::Integer {
                width: IntWidth::Int,
                unsigned: true,
            },
            "bigint" | "int8" | "long" | "hugeint" => DataType::Integer {
                width: IntWidth::Big,
                unsigned,
            },
            "ubigint" | "uhugeint" => DataType::Integer {
                width: IntWidth::Big,
                unsigned: true,
            },
            "boolean" | "bool" | "logical" => DataType::Boolean,
            "decimal" | "numeric" => {
                let scale = column
                    .numeric_scale
                    .and_then(|s| u32::try_from(s).ok())
                    .or_else(|| {
                        RE_DECIMAL_SCALE
                            .captures(&column_type)
                            .or_else(|| RE_DECIMAL_SCALE.captures(&data_type))
                            .and_then(|c| c[1].parse().ok())
                    });
                DataType::Decimal { scale }
            }
            "float" | "double" | "real" | "float4" | "float8" | "double precision" => {
                DataType::Float
            }
            "date" => DataType::Date,
            "time" | "time with time zone" | "timetz" => DataType::Time,
            "datetime" => DataType::DateTime,
            b if b.starts_with("timestamp") => DataType::DateTime,
            "year" => DataType::Year,
            "enum" => DataType::Enum(quoted_values(&column_type, &data_type)),
            "set" => DataType::Set(quoted_values(&column_type, &data_type)),
            "bit" | "bitstring" => {
                let len = RE_BIT_LENGTH
                    .captures(&column_type)
                    .and_then(|c| c[1].parse().ok())
                    .unwrap_or(1);
                DataType::Bit(len)
            }
            "binary" | "varbinary" => {
                let len = column
                    .char_max_length
                    .filter(|&n| n > 0)
                    .map_or(DEFAULT_BINARY_LENGTH, |n| n as usize)
                    .min(MAX_BINARY_LENGTH);
                DataType::Binary(len)
            }
            "tinyblob" => DataType::Blob(255),
            "blob" | "bytea" | "varbinary_blob" => DataType::Blob(500),
            "mediumblob" => DataType::Blob(1000),
            "longblob" => DataType::Blob(2000),
            "json" => DataType::Json,
            "uuid" => DataType::Uuid,
            "point" => DataType::Spatial(SpatialKind::Point),
            "linestring" => DataType::Spatial(SpatialKind::LineString),
            "polygon" => DataType::Spatial(SpatialKind::Polygon),
            "geometry" | "multipoint" | "multilinestring" | "multipolygon"
            | "geometrycollection" => DataType::Spatial(SpatialKind::Other),
            _ => DataType::Unknown(base),
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::Text { .. })
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Integer { .. })
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime)
    }
}

/// Pull the quoted member list out of `enum('a','b')` / `set(...)`.
///
/// MySQL puts the list in the raw type string, DuckDB in the data type itself.
fn quoted_values(column_type: &str, data_type: &str) -> Vec<String> {
    let source = if column_type.contains('\'') {
        column_type
    } else {
        data_type
    };
    RE_QUOTED_VALUE
        .captures_iter(source)
        .map(|c| c[1].replace("''", "'"))
        .collect()
}
