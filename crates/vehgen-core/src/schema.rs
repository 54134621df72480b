//! Column spec for generated rows. Pure data; generation lives in `vehgen-synth`.
//!
//! The column list comes from the `toBeGenerated` setting: comma-separated
//! `name|type` pairs. The column *name* selects the special generators
//! (vin, timestamps, trace id, coordinates); every other column falls back
//! to its declared *type*. Neither is validated: an unknown name with an
//! unknown type simply yields empty values.

use serde::{Deserialize, Serialize};

/// Special-cased generator selected by column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    Vin,
    Timestamp,
    BackendTimestamp,
    TraceId,
    Longitude,
    Latitude,
    /// Dispatch on the declared type instead.
    Generic,
}

impl ColumnRole {
    pub fn from_name(name: &str) -> Self {
        match name {
            "vin" => ColumnRole::Vin,
            "ts" => ColumnRole::Timestamp,
            "backend_ts" => ColumnRole::BackendTimestamp,
            "traceId" => ColumnRole::TraceId,
            "gps_lon" => ColumnRole::Longitude,
            "gps_lat" => ColumnRole::Latitude,
            _ => ColumnRole::Generic,
        }
    }
}

/// Generic generator selected by declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    SmallDecimal,
    Decimal,
    BigDecimal,
    Varchar,
    /// Anything else. Always renders as an empty value.
    Unknown,
}

impl ValueType {
    pub fn from_declared(declared: &str) -> Self {
        match declared {
            "BOOLEAN" => ValueType::Boolean,
            "TINYINT" => ValueType::TinyInt,
            "SMALLINT" => ValueType::SmallInt,
            "INT" => ValueType::Int,
            "SMALLDECIMAL" => ValueType::SmallDecimal,
            "DECIMAL" => ValueType::Decimal,
            "BIGDECIMAL" => ValueType::BigDecimal,
            "VARCHAR" => ValueType::Varchar,
            _ => ValueType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
    pub role: ColumnRole,
    pub value_type: ValueType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let name = name.into();
        let declared_type = declared_type.into();
        Self {
            role: ColumnRole::from_name(&name),
            value_type: ValueType::from_declared(&declared_type),
            name,
            declared_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub columns: Vec<ColumnDef>,
}

impl ColumnSpec {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Parse `name|type,name|type,...`.
    ///
    /// Entries without a `|` are dropped. Only the first two `|`-separated
    /// parts are used. Surrounding whitespace is trimmed from both parts.
    pub fn parse(raw: &str) -> Self {
        let columns = raw
            .split(',')
            .filter(|entry| entry.contains('|'))
            .map(|entry| {
                let mut parts = entry.split('|');
                let name = parts.next().unwrap_or_default().trim();
                let declared = parts.next().unwrap_or_default().trim();
                ColumnDef::new(name, declared)
            })
            .collect();
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDef> {
        self.columns.iter()
    }

    /// Header line (without newline): column names joined by `,`.
    pub fn header(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_drops_entries_without_separator() {
        let spec = ColumnSpec::parse("vin|VARCHAR,garbage,ts|TIMESTAMP,,speed|DECIMAL");
        let names: Vec<_> = spec.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["vin", "ts", "speed"]);
        assert_eq!(spec.header(), "vin,ts,speed");
    }

    #[test]
    fn parse_uses_first_two_parts_only() {
        let spec = ColumnSpec::parse("odometer|INT|ignored");
        assert_eq!(spec.columns[0].name, "odometer");
        assert_eq!(spec.columns[0].declared_type, "INT");
        assert_eq!(spec.columns[0].value_type, ValueType::Int);
    }

    #[test]
    fn roles_are_case_sensitive() {
        assert_eq!(ColumnRole::from_name("traceId"), ColumnRole::TraceId);
        assert_eq!(ColumnRole::from_name("traceid"), ColumnRole::Generic);
        assert_eq!(ColumnRole::from_name("gps_lat"), ColumnRole::Latitude);
    }

    #[test]
    fn unknown_type_is_tagged_not_rejected() {
        let spec = ColumnSpec::parse("foo|UNKNOWN_TYPE, bar | BOOLEAN");
        assert_eq!(spec.columns[0].value_type, ValueType::Unknown);
        assert_eq!(spec.columns[1].name, "bar");
        assert_eq!(spec.columns[1].value_type, ValueType::Boolean);
    }

    #[test]
    fn empty_input_yields_empty_spec() {
        assert!(ColumnSpec::parse("").is_empty());
        assert!(ColumnSpec::parse("a,b,c").is_empty());
    }
}
