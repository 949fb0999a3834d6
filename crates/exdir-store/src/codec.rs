//! Conversion between [`AttrValue`] and YAML.
//!
//! Arrays are written as nested lists and quantities as
//! `{value, unit[, uncertainty]}`. On read, any mapping with exactly those
//! keys, a string `unit`, and numeric `value`/`uncertainty` comes back as a
//! [`Quantity`]. User data shaped the same way is read as a quantity too.

use exdir_types::{AttrMap, AttrValue, Quantity};
use serde_yaml::{Mapping, Number, Value};

/// Encode one attribute value.
pub fn to_yaml(value: &AttrValue) -> Value {
    match value {
        AttrValue::Null => Value::Null,
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Int(v) => Value::Number(Number::from(*v)),
        AttrValue::UInt(v) => Value::Number(Number::from(*v)),
        AttrValue::Float(v) => Value::Number(Number::from(*v)),
        AttrValue::String(s) => Value::String(s.clone()),
        AttrValue::List(items) => Value::Sequence(items.iter().map(to_yaml).collect()),
        AttrValue::Map(map) => map_to_yaml(map),
        AttrValue::Array(a) => to_yaml(&AttrValue::nested_from_array(a)),
        AttrValue::Quantity(q) => {
            let mut m = Mapping::new();
            m.insert("unit".into(), Value::String(q.unit.clone()));
            if let Some(u) = &q.uncertainty {
                m.insert("uncertainty".into(), to_yaml(&AttrValue::nested_from_array(u)));
            }
            m.insert("value".into(), to_yaml(&AttrValue::nested_from_array(&q.value)));
            Value::Mapping(m)
        }
    }
}

/// Encode a record, keys in sorted order.
pub fn map_to_yaml(map: &AttrMap) -> Value {
    Value::Mapping(
        map.iter()
            .map(|(k, v)| (Value::String(k.clone()), to_yaml(v)))
            .collect(),
    )
}

/// Decode one YAML value.
///
/// Non-string mapping keys are converted to their string form; YAML tags
/// are dropped.
pub fn from_yaml(value: &Value) -> Result<AttrValue, String> {
    Ok(match value {
        Value::Null => AttrValue::Null,
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => number(n),
        Value::String(s) => AttrValue::String(s.clone()),
        Value::Sequence(items) => {
            AttrValue::List(items.iter().map(from_yaml).collect::<Result<_, _>>()?)
        }
        Value::Mapping(m) => {
            let map = mapping_from_yaml(m)?;
            match as_quantity(&map) {
                Some(q) => AttrValue::Quantity(q),
                None => AttrValue::Map(map),
            }
        }
        Value::Tagged(tagged) => from_yaml(&tagged.value)?,
    })
}

/// Decode a whole record. The top level must be a mapping (or empty).
pub fn map_from_yaml(value: &Value) -> Result<AttrMap, String> {
    match value {
        Value::Null => Ok(AttrMap::new()),
        Value::Mapping(m) => mapping_from_yaml(m),
        other => Err(format!("expected a mapping at the top level, found {}", type_of(other))),
    }
}

fn mapping_from_yaml(m: &Mapping) -> Result<AttrMap, String> {
    let mut map = AttrMap::new();
    for (k, v) in m {
        let key = match k {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => return Err(format!("unsupported mapping key of type {}", type_of(other))),
        };
        map.insert(key, from_yaml(v)?);
    }
    Ok(map)
}

fn number(n: &Number) -> AttrValue {
    if let Some(v) = n.as_i64() {
        AttrValue::Int(v)
    } else if let Some(v) = n.as_u64() {
        AttrValue::UInt(v)
    } else {
        AttrValue::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn as_quantity(map: &AttrMap) -> Option<Quantity> {
    let keys_ok = match map.len() {
        2 => map.contains_key("value") && map.contains_key("unit"),
        3 => {
            map.contains_key("value") && map.contains_key("unit") && map.contains_key("uncertainty")
        }
        _ => false,
    };
    if !keys_ok {
        return None;
    }
    let unit = map.get("unit")?.as_str()?.to_string();
    let value = map.get("value")?.to_array()?;
    let uncertainty = match map.get("uncertainty") {
        Some(u) => Some(u.to_array()?),
        None => None,
    };
    Some(Quantity {
        value,
        unit,
        uncertainty,
    })
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
