//! Recognized field names and the field-bag input shape.
//!
//! A field-bag is a flat bag of named scalar values describing part of an
//! order, an order item or shipment data. Only the ten names in
//! [`Field::ALL`] carry meaning; everything else is kept but ignored.

use crate::core::{CollateError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// One of the ten recognized field names.
///
/// The declaration order is the output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OrderReference,
    Marketplace,
    Name,
    Surname,
    ItemNumber,
    Sku,
    PricePerUnit,
    Quantity,
    PostalService,
    Postcode,
}

/// Fields owned by the order itself. All six must be non-empty before any
/// of its items can be emitted.
pub const HEADER_FIELDS: [Field; 6] = [
    Field::OrderReference,
    Field::Marketplace,
    Field::Name,
    Field::Surname,
    Field::PostalService,
    Field::Postcode,
];

/// Fields owned by an order item.
pub const ITEM_FIELDS: [Field; 3] = [Field::Sku, Field::PricePerUnit, Field::Quantity];

impl Field {
    pub const ALL: [Field; 10] = [
        Field::OrderReference,
        Field::Marketplace,
        Field::Name,
        Field::Surname,
        Field::ItemNumber,
        Field::Sku,
        Field::PricePerUnit,
        Field::Quantity,
        Field::PostalService,
        Field::Postcode,
    ];

    /// The exact, case-sensitive name used in the input feed.
    pub fn name(self) -> &'static str {
        match self {
            Self::OrderReference => "order reference",
            Self::Marketplace => "marketplace",
            Self::Name => "name",
            Self::Surname => "surname",
            Self::ItemNumber => "order item number",
            Self::Sku => "sku",
            Self::PricePerUnit => "price per unit",
            Self::Quantity => "quantity",
            Self::PostalService => "postal service",
            Self::Postcode => "postcode",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    pub fn is_item_scoped(self) -> bool {
        ITEM_FIELDS.contains(&self)
    }

    /// Coerce a raw value to this field's semantic type.
    ///
    /// `Ok(None)` means the value is null or empty and must be treated as
    /// absent. Values that are present but cannot be coerced are reported as
    /// [`CollateError::MalformedInput`].
    pub fn coerce(self, raw: &Value) -> Result<Option<FieldValue>> {
        let Some(text) = scalar_text(self, raw)? else {
            return Ok(None);
        };

        match self {
            Self::PricePerUnit => {
                let price = match raw {
                    Value::Number(n) => n.as_f64(),
                    _ => text.trim().parse::<f64>().ok(),
                };
                match price {
                    Some(p) if p.is_finite() => Ok(Some(FieldValue::Price(p))),
                    _ => Err(self.malformed(&text)),
                }
            }
            Self::Quantity => {
                let quantity = match raw {
                    Value::Number(n) => n
                        .as_i64()
                        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                        .and_then(|i| i32::try_from(i).ok()),
                    _ => text.trim().parse::<i32>().ok(),
                };
                quantity
                    .map(|q| Some(FieldValue::Quantity(q)))
                    .ok_or_else(|| self.malformed(&text))
            }
            _ => Ok(Some(FieldValue::Text(text))),
        }
    }

    fn malformed(self, text: &str) -> CollateError {
        CollateError::MalformedInput(format!("'{}' cannot hold value '{}'", self.name(), text))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text form of a scalar value, `None` for null or an empty string.
fn scalar_text(field: Field, raw: &Value) -> Result<Option<String>> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(CollateError::MalformedInput(format!(
            "'{}' expects a scalar value",
            field.name()
        ))),
    }
}

/// A value after coercion to its field's semantic type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Price(f64),
    Quantity(i32),
}

/// An unordered bag of named values.
///
/// Names are kept verbatim; when a name repeats the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct FieldBag {
    entries: Vec<(String, Value)>,
}

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Build a bag from a JSON object. Any other JSON shape is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from(map)),
            other => Err(CollateError::MalformedInput(format!(
                "field-bag must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Raw value for a name, first occurrence.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn field(&self, field: Field) -> Option<&Value> {
        self.get(field.name())
    }

    /// Non-empty text of a field, `None` when absent, null or empty.
    pub fn text(&self, field: Field) -> Option<String> {
        self.field(field)
            .and_then(|raw| scalar_text(field, raw).ok().flatten())
    }

    /// Recognized fields in first-occurrence order, one entry per field.
    pub fn recognized(&self) -> impl Iterator<Item = (Field, &Value)> + '_ {
        let mut seen = Vec::with_capacity(Field::ALL.len());
        self.entries.iter().filter_map(move |(name, value)| {
            let field = Field::from_name(name)?;
            if seen.contains(&field) {
                return None;
            }
            seen.push(field);
            Some((field, value))
        })
    }
}

impl From<Map<String, Value>> for FieldBag {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("Order Reference"), None);
        assert_eq!(Field::from_name("colour"), None);
    }

    #[test]
    fn test_coerce_text_accepts_numbers() {
        assert_eq!(
            Field::OrderReference.coerce(&json!(1234)).unwrap(),
            Some(FieldValue::Text("1234".to_string()))
        );
        assert_eq!(Field::Name.coerce(&json!("")).unwrap(), None);
        assert_eq!(Field::Name.coerce(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_coerce_price() {
        assert_eq!(
            Field::PricePerUnit.coerce(&json!(9.5)).unwrap(),
            Some(FieldValue::Price(9.5))
        );
        assert_eq!(
            Field::PricePerUnit.coerce(&json!(" 3.25 ")).unwrap(),
            Some(FieldValue::Price(3.25))
        );
        assert!(Field::PricePerUnit.coerce(&json!("cheap")).is_err());
    }

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(
            Field::Quantity.coerce(&json!(2)).unwrap(),
            Some(FieldValue::Quantity(2))
        );
        assert_eq!(
            Field::Quantity.coerce(&json!(4.0)).unwrap(),
            Some(FieldValue::Quantity(4))
        );
        assert_eq!(
            Field::Quantity.coerce(&json!("7")).unwrap(),
            Some(FieldValue::Quantity(7))
        );
        assert!(Field::Quantity.coerce(&json!(2.5)).is_err());
        assert!(Field::Quantity.coerce(&json!("two")).is_err());
        assert!(Field::Quantity.coerce(&json!(5_000_000_000i64)).is_err());
    }

    #[test]
    fn test_coerce_rejects_nested_values() {
        assert!(Field::Sku.coerce(&json!(["a"])).is_err());
        assert!(Field::Sku.coerce(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let bag = FieldBag::new()
            .with("name", "Jo")
            .with("name", "Al")
            .with("colour", "red");

        assert_eq!(bag.text(Field::Name).as_deref(), Some("Jo"));
        let recognized: Vec<_> = bag.recognized().map(|(f, _)| f).collect();
        assert_eq!(recognized, vec![Field::Name]);
    }

    #[test]
    fn test_from_json_requires_object() {
        assert!(FieldBag::from_json(json!({"sku": "S1"})).is_ok());
        assert!(FieldBag::from_json(json!(["sku"])).is_err());
        assert!(FieldBag::from_json(json!(null)).is_err());
    }

    #[test]
    fn test_deserialize_batch_of_bags() {
        let bags: Vec<FieldBag> = serde_json::from_str(
            r#"[{"order reference": "A1", "quantity": 2}, {"sku": "S1", "colour": "red"}]"#,
        )
        .unwrap();

        assert_eq!(bags.len(), 2);
        assert_eq!(bags[0].text(Field::OrderReference).as_deref(), Some("A1"));
        assert_eq!(bags[0].field(Field::Quantity), Some(&json!(2)));
        assert_eq!(bags[1].len(), 2);
        assert!(serde_json::from_str::<FieldBag>("[1, 2]").is_err());
    }
}
