//! Table definitions consumed by the record codec.
//!
//! A [`TableDef`] is an ordered list of [`ColumnDef`]s plus the primary key
//! column names. It is supplied by the caller (built in code or loaded from a
//! JSON file) and never mutated by the reader. Column types are written the
//! way MySQL prints them (`int`, `varchar(64)`, `decimal(10,2)`,
//! `enum('a','b')`) and parsed into [`ColumnType`].
//!
//! [`RecordLayout`] maps a table onto the physical field order of the
//! clustered index: primary key fields first (or the hidden 6-byte
//! `DB_ROW_ID` when there is no primary key), then `DB_TRX_ID` and
//! `DB_ROLL_PTR`, then every other column in declared order.
//!
//! ```json
//! {
//!   "name": "t",
//!   "columns": [
//!     { "name": "id", "type": "int" },
//!     { "name": "b", "type": "varchar(64)", "nullable": true, "charset": "latin1" }
//!   ],
//!   "primary_key": ["id"]
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::innodb::constants::DATA_ROW_ID_LEN;
use crate::IdbError;

/// Character set of a string column, determining its maximum bytes per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    #[default]
    Utf8mb4,
    #[serde(alias = "utf8")]
    Utf8mb3,
    Latin1,
    Ascii,
    Binary,
}

impl Charset {
    /// Maximum bytes one character can occupy.
    pub fn max_bytes(self) -> usize {
        match self {
            Charset::Utf8mb4 => 4,
            Charset::Utf8mb3 => 3,
            Charset::Latin1 | Charset::Ascii | Charset::Binary => 1,
        }
    }
}

/// Semantic column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Float,
    Double,
    /// DECIMAL(precision, scale).
    Decimal(u8, u8),
    Date,
    /// DATETIME(fsp).
    DateTime(u8),
    /// TIMESTAMP(fsp).
    Timestamp(u8),
    /// TIME(fsp).
    Time(u8),
    Year,
    /// CHAR(n), n in characters.
    Char(u32),
    /// VARCHAR(n), n in characters.
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
    Json,
    Enum(Vec<String>),
    Set(Vec<String>),
    /// BIT(n), n in bits.
    Bit(u32),
}

impl ColumnType {
    /// Fixed on-disk size in bytes, or `None` for variable-length storage.
    ///
    /// CHAR in a multi-byte charset is stored variable-length in the compact
    /// row format.
    pub fn fixed_len(&self, charset: Charset) -> Option<usize> {
        Some(match self {
            ColumnType::TinyInt | ColumnType::Year => 1,
            ColumnType::SmallInt => 2,
            ColumnType::MediumInt | ColumnType::Date => 3,
            ColumnType::Int | ColumnType::Float => 4,
            ColumnType::BigInt | ColumnType::Double => 8,
            ColumnType::Decimal(p, s) => decimal_storage_len(*p, *s),
            ColumnType::DateTime(fsp) => 5 + fsp_storage_bytes(*fsp),
            ColumnType::Timestamp(fsp) => 4 + fsp_storage_bytes(*fsp),
            ColumnType::Time(fsp) => 3 + fsp_storage_bytes(*fsp),
            ColumnType::Char(n) if charset.max_bytes() == 1 => *n as usize,
            ColumnType::Binary(n) => *n as usize,
            ColumnType::Enum(elems) => {
                if elems.len() < 256 {
                    1
                } else {
                    2
                }
            }
            ColumnType::Set(elems) => match elems.len().div_ceil(8).max(1) {
                n @ 1..=4 => n,
                _ => 8,
            },
            ColumnType::Bit(n) => (*n as usize).div_ceil(8).max(1),
            _ => return None,
        })
    }

    /// Declared maximum length in bytes of a variable-length value.
    pub fn max_bytes(&self, charset: Charset) -> usize {
        match self {
            ColumnType::Char(n) | ColumnType::VarChar(n) => *n as usize * charset.max_bytes(),
            ColumnType::Binary(n) | ColumnType::VarBinary(n) => *n as usize,
            ColumnType::TinyText | ColumnType::TinyBlob => 255,
            ColumnType::Text | ColumnType::Blob => 65_535,
            ColumnType::MediumText | ColumnType::MediumBlob => 16_777_215,
            ColumnType::LongText | ColumnType::LongBlob | ColumnType::Json => 4_294_967_295,
            other => other.fixed_len(charset).unwrap_or(0),
        }
    }

    /// BLOB-like types that may always be stored externally.
    pub fn is_lob(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyText
                | ColumnType::Text
                | ColumnType::MediumText
                | ColumnType::LongText
                | ColumnType::TinyBlob
                | ColumnType::Blob
                | ColumnType::MediumBlob
                | ColumnType::LongBlob
                | ColumnType::Json
        )
    }

    /// Whether a variable-length value can use a 2-byte length prefix
    /// (and therefore be stored externally).
    pub fn is_big(&self, charset: Charset) -> bool {
        self.is_lob() || self.max_bytes(charset) > 255
    }

    /// Character types decoded through their charset.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ColumnType::Char(_)
                | ColumnType::VarChar(_)
                | ColumnType::TinyText
                | ColumnType::Text
                | ColumnType::MediumText
                | ColumnType::LongText
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt
                | ColumnType::SmallInt
                | ColumnType::MediumInt
                | ColumnType::Int
                | ColumnType::BigInt
        )
    }
}

/// Bytes needed for leftover digits in DECIMAL packed BCD.
pub(crate) fn decimal_leftover_bytes(digits: usize) -> usize {
    match digits {
        0 => 0,
        1..=2 => 1,
        3..=4 => 2,
        5..=6 => 3,
        _ => 4,
    }
}

pub(crate) fn decimal_storage_len(precision: u8, scale: u8) -> usize {
    let intg = precision.saturating_sub(scale) as usize;
    let frac = scale as usize;
    (intg / 9) * 4 + decimal_leftover_bytes(intg % 9) + (frac / 9) * 4
        + decimal_leftover_bytes(frac % 9)
}

/// Storage bytes for fractional seconds precision.
pub(crate) fn fsp_storage_bytes(fsp: u8) -> usize {
    match fsp {
        1 | 2 => 1,
        3 | 4 => 2,
        5 | 6 => 3,
        _ => 0,
    }
}

fn parse_args(text: &str) -> Result<Vec<u32>, IdbError> {
    text.split(',')
        .map(|a| {
            a.trim()
                .parse::<u32>()
                .map_err(|_| IdbError::Parse(format!("Invalid type argument '{}'", a.trim())))
        })
        .collect()
}

// Quoted, comma-separated ENUM/SET elements: 'a','b''c'
fn parse_elements(text: &str) -> Result<Vec<String>, IdbError> {
    let mut elems = Vec::new();
    let mut chars = text.trim().chars().peekable();
    loop {
        match chars.next() {
            Some('\'') => {}
            None => break,
            Some(c) => {
                return Err(IdbError::Parse(format!(
                    "Expected quoted element, found '{}'",
                    c
                )))
            }
        }
        let mut elem = String::new();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    elem.push('\'');
                }
                Some('\'') => break,
                Some(c) => elem.push(c),
                None => return Err(IdbError::Parse("Unterminated element".to_string())),
            }
        }
        elems.push(elem);
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
            None => break,
            Some(c) => return Err(IdbError::Parse(format!("Unexpected '{}'", c))),
        }
    }
    Ok(elems)
}

impl FromStr for ColumnType {
    type Err = IdbError;

    /// Parse a MySQL-style type name.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::schema::ColumnType;
    ///
    /// assert_eq!("VARCHAR(64)".parse::<ColumnType>().unwrap(), ColumnType::VarChar(64));
    /// assert_eq!("decimal(10,2)".parse::<ColumnType>().unwrap(), ColumnType::Decimal(10, 2));
    /// assert_eq!(
    ///     "enum('a','b')".parse::<ColumnType>().unwrap(),
    ///     ColumnType::Enum(vec!["a".into(), "b".into()])
    /// );
    /// assert!("geometry".parse::<ColumnType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (base, args) = match s.find('(') {
            Some(open) => {
                let close = s
                    .rfind(')')
                    .filter(|&c| c > open)
                    .ok_or_else(|| IdbError::Parse(format!("Unbalanced type '{}'", s)))?;
                (s[..open].trim(), Some(&s[open + 1..close]))
            }
            None => (s, None),
        };
        let base = base.to_ascii_lowercase();

        let nums = match (&*base, args) {
            ("enum" | "set", _) | (_, None) => Vec::new(),
            (_, Some(a)) => parse_args(a)?,
        };
        let arg = |i: usize, default: u32| nums.get(i).copied().unwrap_or(default);
        let fsp = |v: u32| -> Result<u8, IdbError> {
            if v > 6 {
                return Err(IdbError::Parse(format!("Invalid fractional precision {}", v)));
            }
            Ok(v as u8)
        };
        let length = || -> Result<u32, IdbError> {
            nums.first()
                .copied()
                .ok_or_else(|| IdbError::Parse(format!("Type '{}' needs a length", base)))
        };

        Ok(match &*base {
            "tinyint" => ColumnType::TinyInt,
            "smallint" => ColumnType::SmallInt,
            "mediumint" => ColumnType::MediumInt,
            "int" | "integer" => ColumnType::Int,
            "bigint" => ColumnType::BigInt,
            "float" => ColumnType::Float,
            "double" | "real" => ColumnType::Double,
            "decimal" | "numeric" => {
                let (p, sc) = (arg(0, 10), arg(1, 0));
                if p == 0 || p > 65 || sc > 30 || sc > p {
                    return Err(IdbError::Parse(format!("Invalid DECIMAL({},{})", p, sc)));
                }
                ColumnType::Decimal(p as u8, sc as u8)
            }
            "date" => ColumnType::Date,
            "datetime" => ColumnType::DateTime(fsp(arg(0, 0))?),
            "timestamp" => ColumnType::Timestamp(fsp(arg(0, 0))?),
            "time" => ColumnType::Time(fsp(arg(0, 0))?),
            "year" => ColumnType::Year,
            "char" => ColumnType::Char(arg(0, 1)),
            "varchar" => ColumnType::VarChar(length()?),
            "binary" => ColumnType::Binary(arg(0, 1)),
            "varbinary" => ColumnType::VarBinary(length()?),
            "tinytext" => ColumnType::TinyText,
            "text" => ColumnType::Text,
            "mediumtext" => ColumnType::MediumText,
            "longtext" => ColumnType::LongText,
            "tinyblob" => ColumnType::TinyBlob,
            "blob" => ColumnType::Blob,
            "mediumblob" => ColumnType::MediumBlob,
            "longblob" => ColumnType::LongBlob,
            "json" => ColumnType::Json,
            "enum" => ColumnType::Enum(parse_elements(args.unwrap_or(""))?),
            "set" => {
                let elems = parse_elements(args.unwrap_or(""))?;
                if elems.len() > 64 {
                    return Err(IdbError::Parse("SET has more than 64 elements".to_string()));
                }
                ColumnType::Set(elems)
            }
            "bit" => {
                let n = arg(0, 1);
                if n == 0 || n > 64 {
                    return Err(IdbError::Parse(format!("Invalid BIT({})", n)));
                }
                ColumnType::Bit(n)
            }
            other => {
                return Err(IdbError::Parse(format!("Unsupported column type '{}'", other)))
            }
        })
    }
}

fn quote_elements(elems: &[String]) -> String {
    elems
        .iter()
        .map(|e| format!("'{}'", e.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::TinyInt => write!(f, "tinyint"),
            ColumnType::SmallInt => write!(f, "smallint"),
            ColumnType::MediumInt => write!(f, "mediumint"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::Decimal(p, s) => write!(f, "decimal({},{})", p, s),
            ColumnType::Date => write!(f, "date"),
            ColumnType::DateTime(0) => write!(f, "datetime"),
            ColumnType::DateTime(n) => write!(f, "datetime({})", n),
            ColumnType::Timestamp(0) => write!(f, "timestamp"),
            ColumnType::Timestamp(n) => write!(f, "timestamp({})", n),
            ColumnType::Time(0) => write!(f, "time"),
            ColumnType::Time(n) => write!(f, "time({})", n),
            ColumnType::Year => write!(f, "year"),
            ColumnType::Char(n) => write!(f, "char({})", n),
            ColumnType::VarChar(n) => write!(f, "varchar({})", n),
            ColumnType::Binary(n) => write!(f, "binary({})", n),
            ColumnType::VarBinary(n) => write!(f, "varbinary({})", n),
            ColumnType::TinyText => write!(f, "tinytext"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::MediumText => write!(f, "mediumtext"),
            ColumnType::LongText => write!(f, "longtext"),
            ColumnType::TinyBlob => write!(f, "tinyblob"),
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::MediumBlob => write!(f, "mediumblob"),
            ColumnType::LongBlob => write!(f, "longblob"),
            ColumnType::Json => write!(f, "json"),
            ColumnType::Enum(e) => write!(f, "enum({})", quote_elements(e)),
            ColumnType::Set(e) => write!(f, "set({})", quote_elements(e)),
            ColumnType::Bit(n) => write!(f, "bit({})", n),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = IdbError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.to_string()
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default)]
    pub charset: Charset,
}

impl ColumnDef {
    /// A NOT NULL, signed, utf8mb4 column of the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            column_type,
            nullable: false,
            unsigned: false,
            charset: Charset::default(),
        }
    }

    /// Parse a column from a type string. A trailing `unsigned` is honored.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::schema::{ColumnDef, ColumnType};
    ///
    /// let col = ColumnDef::parse("n", "int unsigned").unwrap();
    /// assert_eq!(col.column_type, ColumnType::Int);
    /// assert!(col.unsigned);
    /// ```
    pub fn parse(name: impl Into<String>, type_text: &str) -> Result<Self, IdbError> {
        let text = type_text.trim();
        let lower = text.to_ascii_lowercase();
        let (type_part, unsigned) = match lower.strip_suffix("unsigned") {
            Some(rest) if lower.len() > "unsigned".len() => (&text[..rest.len()], true),
            _ => (text, false),
        };
        let mut col = ColumnDef::new(name, type_part.parse()?);
        col.unsigned = unsigned;
        Ok(col)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }
}

/// A table definition: ordered columns plus primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// Primary key column names in key order. Empty means the hidden row id
    /// is the clustered key.
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        TableDef {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Parse a table definition from JSON text.
    pub fn from_json(text: &str) -> Result<Self, IdbError> {
        let table: TableDef = serde_json::from_str(text)
            .map_err(|e| IdbError::Parse(format!("Invalid table definition: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    /// Load a JSON table definition file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, IdbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| IdbError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Index of the column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check column names are unique and the primary key names existing,
    /// distinct columns.
    pub fn validate(&self) -> Result<(), IdbError> {
        if self.columns.is_empty() {
            return Err(IdbError::Argument(format!(
                "Table '{}' has no columns",
                self.name
            )));
        }
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(IdbError::Argument(format!(
                    "Duplicate column '{}'",
                    col.name
                )));
            }
        }
        for (i, pk) in self.primary_key.iter().enumerate() {
            let idx = self.column_index(pk).ok_or_else(|| {
                IdbError::Argument(format!("Primary key column '{}' does not exist", pk))
            })?;
            if self.primary_key[..i].contains(pk) {
                return Err(IdbError::Argument(format!(
                    "Primary key column '{}' listed twice",
                    pk
                )));
            }
            if self.columns[idx].column_type.is_lob() {
                return Err(IdbError::Unsupported(format!(
                    "Primary key column '{}' is a BLOB/TEXT column",
                    pk
                )));
            }
        }
        Ok(())
    }
}

/// Where a physical record field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Index into [`TableDef::columns`].
    Column(usize),
    /// Hidden 6-byte `DB_ROW_ID`.
    RowId,
}

/// Physical storage of one clustered-index field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub source: FieldSource,
    /// Fixed size in bytes, `None` for variable-length fields.
    pub fixed_len: Option<usize>,
    /// A variable-length field whose length may take two bytes.
    pub is_big: bool,
    /// Position in the null bitmap, `None` for NOT NULL fields.
    pub null_bit: Option<usize>,
}

impl FieldLayout {
    pub fn is_variable(&self) -> bool {
        self.fixed_len.is_none()
    }
}

/// Physical field order of a table's clustered index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Key fields: the primary key columns, or the hidden row id.
    pub key_fields: Vec<FieldLayout>,
    /// Non-key columns in declared order, after the hidden system columns.
    pub value_fields: Vec<FieldLayout>,
    /// Number of nullable fields, sizing the null bitmap.
    pub n_nullable: usize,
}

impl RecordLayout {
    /// Build the clustered-index layout of a table.
    ///
    /// Primary key columns are always NOT NULL on disk, whatever the
    /// definition says.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::schema::{ColumnDef, FieldSource, RecordLayout, TableDef};
    ///
    /// let table = TableDef::new("t")
    ///     .with_column(ColumnDef::parse("a", "varchar(10)").unwrap().nullable())
    ///     .with_column(ColumnDef::parse("id", "int").unwrap())
    ///     .with_primary_key(&["id"]);
    /// let layout = RecordLayout::new(&table).unwrap();
    /// assert_eq!(layout.key_fields[0].source, FieldSource::Column(1));
    /// assert_eq!(layout.value_fields[0].source, FieldSource::Column(0));
    /// assert_eq!(layout.n_nullable, 1);
    /// ```
    pub fn new(table: &TableDef) -> Result<Self, IdbError> {
        table.validate()?;

        let key_fields = if table.primary_key.is_empty() {
            vec![FieldLayout {
                source: FieldSource::RowId,
                fixed_len: Some(DATA_ROW_ID_LEN),
                is_big: false,
                null_bit: None,
            }]
        } else {
            table
                .primary_key
                .iter()
                .filter_map(|name| table.column_index(name))
                .map(|idx| field_layout(table, idx, None))
                .collect()
        };

        let mut n_nullable = 0;
        let mut value_fields = Vec::new();
        for (idx, col) in table.columns.iter().enumerate() {
            if table.primary_key.contains(&col.name) {
                continue;
            }
            let null_bit = if col.nullable {
                n_nullable += 1;
                Some(n_nullable - 1)
            } else {
                None
            };
            value_fields.push(field_layout(table, idx, null_bit));
        }

        Ok(RecordLayout {
            key_fields,
            value_fields,
            n_nullable,
        })
    }

    /// Bytes occupied by the null bitmap.
    pub fn null_bitmap_len(&self) -> usize {
        self.n_nullable.div_ceil(8)
    }

    /// Whether the clustered key is the hidden row id.
    pub fn has_row_id(&self) -> bool {
        self.key_fields
            .first()
            .is_some_and(|f| f.source == FieldSource::RowId)
    }
}

fn field_layout(table: &TableDef, idx: usize, null_bit: Option<usize>) -> FieldLayout {
    let col = &table.columns[idx];
    let fixed_len = col.column_type.fixed_len(col.charset);
    FieldLayout {
        source: FieldSource::Column(idx),
        fixed_len,
        is_big: fixed_len.is_none() && col.column_type.is_big(col.charset),
        null_bit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_types() {
        let cases = [
            ("tinyint", ColumnType::TinyInt),
            ("BIGINT", ColumnType::BigInt),
            ("datetime(3)", ColumnType::DateTime(3)),
            ("timestamp", ColumnType::Timestamp(0)),
            ("char(10)", ColumnType::Char(10)),
            ("varbinary(16)", ColumnType::VarBinary(16)),
            ("bit(12)", ColumnType::Bit(12)),
            ("longtext", ColumnType::LongText),
        ];
        for (text, expected) in cases {
            assert_eq!(text.parse::<ColumnType>().unwrap(), expected, "{}", text);
        }
        assert!("varchar".parse::<ColumnType>().is_err());
        assert!("datetime(7)".parse::<ColumnType>().is_err());
        assert!("decimal(5,6)".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_enum_elements_with_quotes() {
        let t: ColumnType = "set('a', 'it''s')".parse().unwrap();
        assert_eq!(t, ColumnType::Set(vec!["a".into(), "it's".into()]));
        assert_eq!(t.to_string(), "set('a','it''s')");
        assert!("enum('a".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["decimal(10,2)", "varchar(64)", "time(6)", "enum('x','y')", "json"] {
            let t: ColumnType = text.parse().unwrap();
            assert_eq!(t.to_string(), text);
        }
    }

    #[test]
    fn test_storage_sizes() {
        let mb4 = Charset::Utf8mb4;
        assert_eq!(ColumnType::Decimal(10, 2).fixed_len(mb4), Some(5));
        assert_eq!(ColumnType::Decimal(18, 9).fixed_len(mb4), Some(8));
        assert_eq!(ColumnType::DateTime(6).fixed_len(mb4), Some(8));
        assert_eq!(ColumnType::Time(2).fixed_len(mb4), Some(4));
        assert_eq!(ColumnType::Char(10).fixed_len(Charset::Latin1), Some(10));
        assert_eq!(ColumnType::Char(10).fixed_len(mb4), None);
        assert_eq!(ColumnType::Set(vec!["a".into(); 40]).fixed_len(mb4), Some(8));
        assert_eq!(ColumnType::Bit(9).fixed_len(mb4), Some(2));
    }

    #[test]
    fn test_big_columns() {
        assert!(!ColumnType::VarChar(63).is_big(Charset::Utf8mb4));
        assert!(ColumnType::VarChar(64).is_big(Charset::Utf8mb4));
        assert!(!ColumnType::VarChar(255).is_big(Charset::Latin1));
        assert!(ColumnType::TinyBlob.is_big(Charset::Binary));
    }

    #[test]
    fn test_table_json() {
        let json = r#"{
            "name": "t",
            "columns": [
                {"name": "id", "type": "bigint", "unsigned": true},
                {"name": "note", "type": "varchar(20)", "nullable": true, "charset": "utf8"}
            ],
            "primary_key": ["id"]
        }"#;
        let table = TableDef::from_json(json).unwrap();
        assert!(table.columns[0].unsigned);
        assert_eq!(table.columns[1].charset, Charset::Utf8mb3);
        let back = serde_json::to_string(&table).unwrap();
        assert!(back.contains("\"type\":\"varchar(20)\""));
    }

    #[test]
    fn test_validation() {
        let table = TableDef::new("t")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_primary_key(&["missing"]);
        assert!(matches!(table.validate(), Err(IdbError::Argument(_))));

        let table = TableDef::new("t")
            .with_column(ColumnDef::new("id", ColumnType::Int))
            .with_column(ColumnDef::new("id", ColumnType::Int));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_layout_without_primary_key() {
        let table = TableDef::new("t")
            .with_column(ColumnDef::new("a", ColumnType::Int).nullable())
            .with_column(ColumnDef::new("b", ColumnType::Text));
        let layout = RecordLayout::new(&table).unwrap();
        assert!(layout.has_row_id());
        assert_eq!(layout.key_fields[0].fixed_len, Some(6));
        assert_eq!(layout.value_fields.len(), 2);
        assert!(layout.value_fields[1].is_big);
        assert_eq!(layout.null_bitmap_len(), 1);
    }

    #[test]
    fn test_nullable_primary_key_is_not_null() {
        let table = TableDef::new("t")
            .with_column(ColumnDef::new("id", ColumnType::Int).nullable())
            .with_primary_key(&["id"]);
        let layout = RecordLayout::new(&table).unwrap();
        assert_eq!(layout.key_fields[0].null_bit, None);
        assert_eq!(layout.n_nullable, 0);
    }
}
