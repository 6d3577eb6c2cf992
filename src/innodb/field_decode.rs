//! Field-level value decoding and key comparison.
//!
//! Decodes raw bytes from InnoDB compact-format records into typed
//! [`FieldValue`]s using the [`ColumnDef`] the caller supplied. Handles
//! InnoDB's internal storage encodings: big-endian integers with XOR'd
//! sign bit, IEEE 754 floats stored little-endian, packed BCD decimals and
//! packed temporal values.
//!
//! # Supported types
//!
//! | SQL Type | InnoDB encoding | Decoded as |
//! |----------|----------------|---------|
//! | TINYINT–BIGINT | Big-endian, XOR high bit when signed | `Int` / `Uint` |
//! | FLOAT / DOUBLE | IEEE 754, little-endian | `Float` / `Double` |
//! | DECIMAL | Packed BCD, sign in first bit | `Decimal` |
//! | DATE | 3-byte packed year/month/day | `Str` |
//! | DATETIME | 5+fsp bytes packed bit-field | `Str` |
//! | TIMESTAMP | 4+fsp bytes UTC seconds | `Str` |
//! | TIME | 3+fsp bytes packed bit-field | `Time` |
//! | YEAR | 1 byte + 1900 | `Uint` |
//! | CHAR/VARCHAR/TEXT | Charset-encoded text | `Str` (`Bytes` for binary charset) |
//! | BINARY/VARBINARY/BLOB/JSON | Raw bytes | `Bytes` |
//! | ENUM / SET | Index / bitmask into the element list | `Str` |
//! | BIT | Big-endian bit string | `Uint` |

use std::cmp::Ordering;

use serde::{Serialize, Serializer};

use crate::innodb::schema::{fsp_storage_bytes, decimal_leftover_bytes, Charset, ColumnDef, ColumnType};
use crate::IdbError;

/// Decoded field value from an InnoDB record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// SQL NULL.
    Null,
    /// Signed integer (TINYINT, SMALLINT, MEDIUMINT, INT, BIGINT).
    Int(i64),
    /// Unsigned integer, YEAR, BIT and hidden system columns.
    Uint(u64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Exact decimal rendered as text.
    Decimal(String),
    /// Character data and temporal values other than TIME.
    Str(String),
    /// TIME rendered as `[-]HH:MM:SS[.frac]`; hours may exceed 99.
    Time(String),
    /// Binary data, serialized as `0x`-prefixed hex.
    #[serde(serialize_with = "serialize_hex")]
    Bytes(Vec<u8>),
}

fn serialize_hex<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex(bytes))
}

/// `0x`-prefixed lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("0x{}", hex)
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Uint(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Uint(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            FieldValue::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Exact decimal digits for integer and DECIMAL values.
    fn as_decimal(&self) -> Option<DecimalDigits> {
        match self {
            FieldValue::Int(v) => DecimalDigits::parse(&v.to_string()),
            FieldValue::Uint(v) => DecimalDigits::parse(&v.to_string()),
            FieldValue::Decimal(s) => DecimalDigits::parse(s),
            _ => None,
        }
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Str(s) => Some(s.as_bytes()),
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Int(_)
            | FieldValue::Uint(_)
            | FieldValue::Float(_)
            | FieldValue::Double(_)
            | FieldValue::Decimal(_) => 1,
            FieldValue::Time(_) => 2,
            FieldValue::Str(_) | FieldValue::Bytes(_) => 3,
        }
    }

    /// Total order used for key comparison.
    ///
    /// NULL sorts first. Integers and decimals compare exactly, floats
    /// through `f64`. TIME values compare by duration. Strings and bytes
    /// compare bytewise; collation rules are not applied.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Int(a), Int(b)) => a.cmp(b),
            (Uint(a), Uint(b)) => a.cmp(b),
            (Int(a), Uint(b)) => (*a as i128).cmp(&(*b as i128)),
            (Uint(a), Int(b)) => (*a as i128).cmp(&(*b as i128)),
            (Time(a), Time(b)) => match (time_micros(a), time_micros(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => a.cmp(b),
            },
            _ => {
                if let (Some(a), Some(b)) = (self.as_decimal(), other.as_decimal()) {
                    return a.cmp(&b);
                }
                if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    return a.total_cmp(&b);
                }
                if let (Some(a), Some(b)) = (self.as_bytes(), other.as_bytes()) {
                    return a.cmp(b);
                }
                self.rank().cmp(&other.rank())
            }
        }
    }

    /// Parse literal text as a value of `col`'s type.
    ///
    /// Used for keys and predicates given on the command line. Text for
    /// binary columns may be `0x`-prefixed hex.
    ///
    /// # Examples
    ///
    /// ```
    /// use idbq::innodb::field_decode::FieldValue;
    /// use idbq::innodb::schema::ColumnDef;
    ///
    /// let col = ColumnDef::parse("id", "int").unwrap();
    /// assert_eq!(FieldValue::parse_literal("-7", &col).unwrap(), FieldValue::Int(-7));
    /// assert!(FieldValue::parse_literal("x", &col).is_err());
    /// ```
    pub fn parse_literal(text: &str, col: &ColumnDef) -> Result<FieldValue, IdbError> {
        let bad = || {
            IdbError::Argument(format!(
                "'{}' is not a valid {} value for column '{}'",
                text, col.column_type, col.name
            ))
        };
        if text.eq_ignore_ascii_case("null") {
            return Ok(FieldValue::Null);
        }
        let t = &col.column_type;
        Ok(if t.is_integer() || matches!(t, ColumnType::Year | ColumnType::Bit(_)) {
            if col.unsigned || !t.is_integer() {
                FieldValue::Uint(text.trim().parse().map_err(|_| bad())?)
            } else {
                FieldValue::Int(text.trim().parse().map_err(|_| bad())?)
            }
        } else {
            match t {
                ColumnType::Float => FieldValue::Float(text.trim().parse().map_err(|_| bad())?),
                ColumnType::Double => FieldValue::Double(text.trim().parse().map_err(|_| bad())?),
                ColumnType::Decimal(..) => {
                    DecimalDigits::parse(text.trim()).ok_or_else(bad)?;
                    FieldValue::Decimal(text.trim().to_string())
                }
                ColumnType::Time(_) => {
                    time_micros(text.trim()).ok_or_else(bad)?;
                    FieldValue::Time(text.trim().to_string())
                }
                ColumnType::Binary(_)
                | ColumnType::VarBinary(_)
                | ColumnType::TinyBlob
                | ColumnType::Blob
                | ColumnType::MediumBlob
                | ColumnType::LongBlob
                | ColumnType::Json => FieldValue::Bytes(parse_hex(text).unwrap_or_else(|| text.as_bytes().to_vec())),
                _ if col.charset == Charset::Binary => FieldValue::Bytes(text.as_bytes().to_vec()),
                _ => FieldValue::Str(text.to_string()),
            }
        })
    }
}

/// A decimal split into sign and normalized digit strings.
///
/// Leading integer zeros and trailing fraction zeros are dropped, so the
/// derived field order compares magnitudes once the sign is handled.
#[derive(Debug, PartialEq, Eq)]
struct DecimalDigits {
    negative: bool,
    int: String,
    frac: String,
}

impl DecimalDigits {
    fn parse(text: &str) -> Option<Self> {
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        if int.is_empty() && frac.is_empty() {
            return None;
        }
        if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let int = int.trim_start_matches('0').to_string();
        let frac = frac.trim_end_matches('0').to_string();
        // Negative zero is zero
        let negative = negative && !(int.is_empty() && frac.is_empty());
        Some(DecimalDigits { negative, int, frac })
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.int
            .len()
            .cmp(&other.int.len())
            .then_with(|| self.int.cmp(&other.int))
            .then_with(|| self.frac.cmp(&other.frac))
    }
}

impl Ord for DecimalDigits {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for DecimalDigits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Signed microseconds of a `[-]H:MM:SS[.frac]` TIME literal.
fn time_micros(text: &str) -> Option<i64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (hms, frac) = body.split_once('.').unwrap_or((body, ""));
    let mut parts = hms.split(':');
    let (h, m, s) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || frac.len() > 6 {
        return None;
    }
    let field = |t: &str| -> Option<i64> {
        if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        t.parse().ok()
    };
    let (h, m, s) = (field(h)?, field(m)?, field(s)?);
    if m > 59 || s > 59 {
        return None;
    }
    let micros = if frac.is_empty() {
        0
    } else {
        field(frac)? * 10i64.pow(6 - frac.len() as u32)
    };
    let total = (h * 3600 + m * 60 + s) * 1_000_000 + micros;
    Some(if negative { -total } else { total })
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text.strip_prefix("0x")?;
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

/// Compare two keys field by field, stopping at the first unequal field.
///
/// A shorter key acts as a prefix: keys whose common fields are equal
/// compare equal.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use idbq::innodb::field_decode::{compare_keys, FieldValue};
///
/// let a = [FieldValue::Int(1), FieldValue::Str("b".into())];
/// let b = [FieldValue::Int(1), FieldValue::Str("c".into())];
/// assert_eq!(compare_keys(&a, &b), Ordering::Less);
/// assert_eq!(compare_keys(&a[..1], &b), Ordering::Equal);
/// ```
pub fn compare_keys(a: &[FieldValue], b: &[FieldValue]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.compare(y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Decode a non-NULL field value from its stored bytes.
///
/// Malformed fixed-length values fall back to [`FieldValue::Bytes`].
pub fn decode_field(data: &[u8], col: &ColumnDef, timestamp_offset_secs: i32) -> FieldValue {
    match &col.column_type {
        ColumnType::TinyInt => decode_int(data, 1, col.unsigned),
        ColumnType::SmallInt => decode_int(data, 2, col.unsigned),
        ColumnType::MediumInt => decode_int(data, 3, col.unsigned),
        ColumnType::Int => decode_int(data, 4, col.unsigned),
        ColumnType::BigInt => decode_int(data, 8, col.unsigned),
        ColumnType::Float => decode_float(data),
        ColumnType::Double => decode_double(data),
        ColumnType::Decimal(p, s) => decode_decimal(data, *p, *s),
        ColumnType::Date => decode_date(data),
        ColumnType::DateTime(fsp) => decode_datetime(data, *fsp),
        ColumnType::Timestamp(fsp) => decode_timestamp(data, *fsp, timestamp_offset_secs),
        ColumnType::Time(fsp) => decode_time(data, *fsp),
        ColumnType::Year => decode_year(data),
        ColumnType::Char(_) => decode_string(trim_trailing_spaces(data), col.charset),
        t if t.is_text() => decode_string(data, col.charset),
        ColumnType::Enum(elems) => decode_enum(data, elems),
        ColumnType::Set(elems) => decode_set(data, elems),
        ColumnType::Bit(_) => decode_bit(data),
        _ => FieldValue::Bytes(data.to_vec()),
    }
}

/// Decode a hidden unsigned system field (row id, trx id, roll pointer).
pub fn decode_system(data: &[u8]) -> FieldValue {
    FieldValue::Uint(be_uint(data))
}

fn be_uint(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Decode a big-endian integer.
///
/// Signed integers are stored with the high bit XOR'd so that memcmp
/// ordering matches numeric ordering. Unsigned integers are stored as is.
fn decode_int(data: &[u8], size: usize, unsigned: bool) -> FieldValue {
    if data.len() != size {
        return FieldValue::Bytes(data.to_vec());
    }
    let val = be_uint(data);
    if unsigned {
        return FieldValue::Uint(val);
    }

    let bits = (size * 8) as u32;
    let flipped = val ^ (1u64 << (bits - 1));
    // Sign-extend from `bits` to 64
    let shift = 64 - bits;
    FieldValue::Int(((flipped << shift) as i64) >> shift)
}

/// Decode a 4-byte InnoDB float (stored little-endian, no sign manipulation).
fn decode_float(data: &[u8]) -> FieldValue {
    match <[u8; 4]>::try_from(data) {
        Ok(bytes) => FieldValue::Float(f32::from_le_bytes(bytes)),
        Err(_) => FieldValue::Bytes(data.to_vec()),
    }
}

/// Decode an 8-byte InnoDB double.
fn decode_double(data: &[u8]) -> FieldValue {
    match <[u8; 8]>::try_from(data) {
        Ok(bytes) => FieldValue::Double(f64::from_le_bytes(bytes)),
        Err(_) => FieldValue::Bytes(data.to_vec()),
    }
}

/// Decode a 3-byte InnoDB DATE (newdate format).
///
/// Packed as `year << 9 | month << 5 | day`, big-endian, high bit XOR'd.
fn decode_date(data: &[u8]) -> FieldValue {
    if data.len() != 3 {
        return FieldValue::Bytes(data.to_vec());
    }
    let val = (be_uint(data) as u32) ^ (1 << 23);

    let day = val & 0x1F;
    let month = (val >> 5) & 0x0F;
    let year = val >> 9;
    FieldValue::Str(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// Read `fsp_bytes` of fractional seconds and render them with `fsp` digits.
fn fraction(data: &[u8], fsp: u8) -> String {
    if fsp == 0 || data.is_empty() {
        return String::new();
    }
    let frac = be_uint(data);
    let micros = match data.len() {
        1 => frac * 10_000,
        2 => frac * 100,
        _ => frac,
    };
    let digits = format!("{:06}", micros);
    format!(".{}", &digits[..(fsp as usize).min(6)])
}

/// Decode a DATETIME2 (5 + fsp bytes).
///
/// Packed as big-endian integer with XOR'd sign bit:
/// - year_month (17 bits): year * 13 + month
/// - day (5 bits)
/// - hour (5 bits)
/// - minute (6 bits)
/// - second (6 bits)
fn decode_datetime(data: &[u8], fsp: u8) -> FieldValue {
    let fsp_bytes = fsp_storage_bytes(fsp);
    if data.len() != 5 + fsp_bytes {
        return FieldValue::Bytes(data.to_vec());
    }

    let val = be_uint(&data[..5]) ^ (1 << 39);
    let second = val & 0x3F;
    let minute = (val >> 6) & 0x3F;
    let hour = (val >> 12) & 0x1F;
    let day = (val >> 17) & 0x1F;
    let year_month = (val >> 22) & 0x1FFFF;
    let year = year_month / 13;
    let month = year_month % 13;

    FieldValue::Str(format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}{}",
        year,
        month,
        day,
        hour,
        minute,
        second,
        fraction(&data[5..], fsp)
    ))
}

/// Decode a TIMESTAMP2 (4 + fsp bytes).
///
/// 4-byte big-endian UTC seconds since epoch, shifted by the configured
/// offset for display.
fn decode_timestamp(data: &[u8], fsp: u8, offset_secs: i32) -> FieldValue {
    let fsp_bytes = fsp_storage_bytes(fsp);
    if data.len() != 4 + fsp_bytes {
        return FieldValue::Bytes(data.to_vec());
    }

    let secs = be_uint(&data[..4]) as i64;
    if secs == 0 {
        return FieldValue::Str("0000-00-00 00:00:00".to_string());
    }
    let local = secs + offset_secs as i64;
    let days = local.div_euclid(86_400);
    let time_of_day = local.rem_euclid(86_400);
    let (year, month, day) = days_to_ymd(days);

    FieldValue::Str(format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}{}",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60,
        fraction(&data[4..], fsp)
    ))
}

/// Convert days since 1970-01-01 to (year, month, day).
fn days_to_ymd(days: i64) -> (i64, u32, u32) {
    // Algorithm from https://howardhinnant.github.io/date_algorithms.html
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + if m <= 2 { 1 } else { 0 };
    (y, m, d)
}

/// Decode a TIME2 field (3 + fsp bytes).
///
/// The integer part is a 3-byte big-endian value offset by `0x800000`,
/// packing hours (10 bits), minutes (6 bits) and seconds (6 bits). The
/// fraction follows in 1 to 3 bytes. Negative values borrow from the
/// integer part, so both parts are combined into one signed count of
/// microseconds-with-packed-seconds before rendering.
fn decode_time(data: &[u8], fsp: u8) -> FieldValue {
    let fsp_bytes = fsp_storage_bytes(fsp);
    if data.len() != 3 + fsp_bytes {
        return FieldValue::Bytes(data.to_vec());
    }

    let packed: i64 = match fsp_bytes {
        0 => (be_uint(&data[..3]) as i64 - 0x80_0000) << 24,
        1 | 2 => {
            let mut int_part = be_uint(&data[..3]) as i64 - 0x80_0000;
            let mut frac = be_uint(&data[3..]) as i64;
            let modulus = 1i64 << (8 * fsp_bytes);
            if int_part < 0 && frac != 0 {
                int_part += 1;
                frac -= modulus;
            }
            let scale = if fsp_bytes == 1 { 10_000 } else { 100 };
            (int_part << 24) + frac * scale
        }
        _ => be_uint(data) as i64 - 0x8000_0000_0000,
    };

    let sign = if packed < 0 { "-" } else { "" };
    let abs_val = packed.unsigned_abs();
    let hms = abs_val >> 24;
    let micros = abs_val & 0xFF_FFFF;

    let second = hms & 0x3F;
    let minute = (hms >> 6) & 0x3F;
    let hour = (hms >> 12) & 0x3FF;
    let frac = if fsp == 0 {
        String::new()
    } else {
        let digits = format!("{:06}", micros);
        format!(".{}", &digits[..(fsp as usize).min(6)])
    };
    FieldValue::Time(format!("{}{:02}:{:02}:{:02}{}", sign, hour, minute, second, frac))
}

/// Decode a 1-byte YEAR field. Zero is the "0000" year.
fn decode_year(data: &[u8]) -> FieldValue {
    match data {
        [0] => FieldValue::Uint(0),
        [v] => FieldValue::Uint(1900 + *v as u64),
        _ => FieldValue::Bytes(data.to_vec()),
    }
}

/// Decode character data in its charset.
fn decode_string(data: &[u8], charset: Charset) -> FieldValue {
    match charset {
        Charset::Binary => FieldValue::Bytes(data.to_vec()),
        Charset::Latin1 => FieldValue::Str(data.iter().map(|&b| b as char).collect()),
        _ => FieldValue::Str(String::from_utf8_lossy(data).into_owned()),
    }
}

/// Trim trailing 0x20 (space) padding from CHAR values.
fn trim_trailing_spaces(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| b != 0x20)
        .map_or(0, |i| i + 1);
    &data[..end]
}

/// Decode InnoDB packed BCD DECIMAL.
///
/// - Digits are grouped into groups of 9, stored as 4-byte big-endian ints
/// - Leftover digits (< 9) use 1-4 bytes depending on count
/// - The first byte has the sign bit XOR'd for memcmp ordering
/// - Negative values have every byte inverted
fn decode_decimal(data: &[u8], precision: u8, scale: u8) -> FieldValue {
    let intg = precision.saturating_sub(scale) as usize;
    let frac = scale as usize;
    let (intg_full, intg_left) = (intg / 9, intg % 9);
    let (frac_full, frac_left) = (frac / 9, frac % 9);

    let expected_len = intg_full * 4
        + decimal_leftover_bytes(intg_left)
        + frac_full * 4
        + decimal_leftover_bytes(frac_left);
    if expected_len == 0 || data.len() != expected_len {
        return FieldValue::Bytes(data.to_vec());
    }

    let mut buf = data.to_vec();
    let negative = buf[0] & 0x80 == 0;
    if negative {
        for b in &mut buf {
            *b ^= 0xFF;
        }
    }
    buf[0] &= 0x7F;

    let mut pos = 0;
    let mut take = |n: usize| {
        let v = be_uint(&buf[pos..pos + n]);
        pos += n;
        v
    };

    let mut int_part = String::new();
    if intg_left > 0 {
        int_part.push_str(&take(decimal_leftover_bytes(intg_left)).to_string());
    }
    for _ in 0..intg_full {
        let group = take(4);
        if int_part.is_empty() {
            int_part.push_str(&group.to_string());
        } else {
            int_part.push_str(&format!("{:09}", group));
        }
    }
    let int_part = match int_part.trim_start_matches('0') {
        "" => "0".to_string(),
        s => s.to_string(),
    };

    let mut result = String::new();
    if negative {
        result.push('-');
    }
    result.push_str(&int_part);

    if frac > 0 {
        result.push('.');
        for _ in 0..frac_full {
            result.push_str(&format!("{:09}", take(4)));
        }
        if frac_left > 0 {
            let v = take(decimal_leftover_bytes(frac_left));
            result.push_str(&format!("{:0width$}", v, width = frac_left));
        }
    }

    FieldValue::Decimal(result)
}

/// Decode an ENUM field (1 or 2 byte, 1-based index; 0 is the empty string).
fn decode_enum(data: &[u8], elements: &[String]) -> FieldValue {
    let idx = match data.len() {
        1 | 2 => be_uint(data) as usize,
        _ => return FieldValue::Bytes(data.to_vec()),
    };
    match idx {
        0 => FieldValue::Str(String::new()),
        i if i <= elements.len() => FieldValue::Str(elements[i - 1].clone()),
        i => FieldValue::Uint(i as u64),
    }
}

/// Decode a SET field (big-endian bitmask, bit i selects element i).
fn decode_set(data: &[u8], elements: &[String]) -> FieldValue {
    let bitmask = be_uint(data);
    let selected: Vec<&str> = elements
        .iter()
        .enumerate()
        .filter(|(i, _)| bitmask & (1u64 << i) != 0)
        .map(|(_, e)| e.as_str())
        .collect();
    FieldValue::Str(selected.join(","))
}

fn decode_bit(data: &[u8]) -> FieldValue {
    if data.len() > 8 {
        return FieldValue::Bytes(data.to_vec());
    }
    FieldValue::Uint(be_uint(data))
}
