//! Stored values as JSON. Text output prints the same values compactly.

use exdir::{ArrayValue, AttrMap, AttrValue, DatasetValue, Quantity};
use serde_json::{json, Value};

pub fn attr(value: &AttrValue) -> Value {
    match value {
        AttrValue::Null => Value::Null,
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Int(v) => json!(v),
        AttrValue::UInt(v) => json!(v),
        // Non-finite floats become null.
        AttrValue::Float(v) => json!(v),
        AttrValue::String(s) => Value::String(s.clone()),
        AttrValue::List(items) => Value::Array(items.iter().map(attr).collect()),
        AttrValue::Map(map) => attr_map(map),
        AttrValue::Array(a) => array(a),
        AttrValue::Quantity(q) => quantity(q),
    }
}

pub fn attr_map(map: &AttrMap) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), attr(v))).collect())
}

pub fn array(value: &ArrayValue) -> Value {
    attr(&AttrValue::nested_from_array(value))
}

pub fn quantity(q: &Quantity) -> Value {
    json!({
        "value": array(&q.value),
        "unit": q.unit,
        "uncertainty": q.uncertainty.as_ref().map(array),
    })
}

pub fn dataset(value: &DatasetValue) -> Value {
    match value {
        DatasetValue::Array(a) => array(a),
        DatasetValue::Quantity(q) => quantity(q),
    }
}

/// NumPy-style shape: `()`, `(3,)`, `(2, 4)`.
pub fn shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".into(),
        [n] => format!("({n},)"),
        dims => {
            let dims: Vec<String> = dims.iter().map(usize::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_nest_by_shape() {
        let grid = ArrayValue::full(exdir::DType::I32, &[2, 2], exdir::Scalar::Int(7));
        assert_eq!(array(&grid), json!([[7, 7], [7, 7]]));
        assert_eq!(array(&ArrayValue::from(vec![1.5f64])), json!([1.5]));
    }

    #[test]
    fn quantities_and_maps() {
        let q = Quantity::new(vec![1.0f64, 2.0], "mV").with_uncertainty(vec![0.5f64, 0.5]);
        assert_eq!(
            quantity(&q),
            json!({"value": [1.0, 2.0], "unit": "mV", "uncertainty": [0.5, 0.5]})
        );

        let mut map = AttrMap::new();
        map.insert("name".into(), AttrValue::from("probe"));
        map.insert("gain".into(), AttrValue::Float(f64::NAN));
        map.insert("rate".into(), AttrValue::Quantity(Quantity::scalar(30.0, "kHz")));
        assert_eq!(
            attr_map(&map),
            json!({
                "gain": null,
                "name": "probe",
                "rate": {"value": 30.0, "unit": "kHz", "uncertainty": null},
            })
        );
    }

    #[test]
    fn numpy_shapes() {
        assert_eq!(shape(&[]), "()");
        assert_eq!(shape(&[3]), "(3,)");
        assert_eq!(shape(&[2, 4, 1]), "(2, 4, 1)");
    }
}
