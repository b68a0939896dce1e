use std::fmt;

use serde::{Serialize, Serializer};

/// Kind of a schema field, as understood by tabular renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    String,
    Integer,
    Number,
    Percentage,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::String => "STRING",
            ItemType::Integer => "INTEGER",
            ItemType::Number => "NUMBER",
            ItemType::Percentage => "PERCENTAGE",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an indexed item takes its value from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ItemSource {
    Count,
    Min,
    Max,
    Avg,
    Sum,
    SumSquare,
    StdDev,
    /// Fraction below the boundary with this index.
    Threshold(usize),
    /// Position in the configured percentile list.
    Percentile(usize),
}

/// One entry of the indexed schema shared by the cumulative and interval views.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    pub kind: ItemType,
    pub(crate) source: ItemSource,
}

impl Item {
    pub(crate) fn new(name: impl Into<String>, kind: ItemType, source: ItemSource) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
        }
    }
}

/// Value of an indexed item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemValue {
    Integer(i128),
    Number(f64),
    Percentage(f64),
}

impl ItemValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ItemValue::Integer(v) => v as f64,
            ItemValue::Number(v) | ItemValue::Percentage(v) => v,
        }
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Integer(v) => write!(f, "{v}"),
            ItemValue::Number(v) => write!(f, "{v}"),
            ItemValue::Percentage(v) => write!(f, "{v:.1}%"),
        }
    }
}

/// Value in the display map produced by `StatisticsKeeper::as_map`.
///
/// Decimals and percentages render with one decimal place.
#[derive(Debug, Clone, PartialEq)]
pub enum MapValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Percentage(f64),
    Null,
}

impl MapValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MapValue::Null)
    }
}

impl fmt::Display for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapValue::Text(s) => f.write_str(s),
            MapValue::Integer(v) => write!(f, "{v}"),
            MapValue::Decimal(v) | MapValue::Percentage(v) => write!(f, "{v:.1}"),
            MapValue::Null => f.write_str("null"),
        }
    }
}

impl Serialize for MapValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MapValue::Text(s) => serializer.serialize_str(s),
            MapValue::Integer(v) => serializer.serialize_i64(*v),
            MapValue::Decimal(v) => serializer.serialize_f64((v * 10.0).round() / 10.0),
            MapValue::Percentage(v) => serializer.serialize_str(&format!("{v:.1}")),
            MapValue::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_value_rendering() {
        assert_eq!(MapValue::Decimal(4950.0).to_string(), "4950.0");
        assert_eq!(MapValue::Decimal(2901.149).to_string(), "2901.1");
        assert_eq!(MapValue::Percentage(10.0).to_string(), "10.0");
        assert_eq!(MapValue::Integer(9900).to_string(), "9900");
        assert_eq!(MapValue::Null.to_string(), "null");
    }

    #[test]
    fn map_value_json() {
        let json = serde_json::to_string(&vec![
            MapValue::Text("db".into()),
            MapValue::Decimal(2901.149),
            MapValue::Percentage(1.0),
            MapValue::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"["db",2901.1,"1.0",null]"#);
    }

    #[test]
    fn item_type_names() {
        assert_eq!(ItemType::Percentage.to_string(), "PERCENTAGE");
        assert_eq!(serde_json::to_string(&ItemType::Integer).unwrap(), r#""INTEGER""#);
    }
}
