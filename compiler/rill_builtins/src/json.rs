//! `load_json` and `dump_json`.
//!
//! JSON objects become tables with their keys in document order. Numbers
//! without a fraction or exponent that fit in 64 bits become integers.

use crate::helpers::Kinds;
use rill_runtime::{Error, Handle, HashKey, ObjectData, Result, Runtime, Table, Variant};
use serde_json::{Map, Number, Value};
use std::rc::Rc;

/// Parse `text` into runtime values.
pub fn load(rt: &mut Runtime, text: &str) -> Result<Variant> {
    let value: Value = serde_json::from_str(text).map_err(|err| Error::syntax(format!("JSON: {err}")))?;
    Ok(from_json(rt, value))
}

fn from_json(rt: &mut Runtime, value: Value) -> Variant {
    match value {
        Value::Null => Variant::Null,
        Value::Bool(b) => Variant::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Variant::Integer(i),
            None => n.as_f64().map_or(Variant::Null, Variant::Float),
        },
        Value::String(s) => Variant::from(s),
        Value::Array(items) => {
            let items = items.into_iter().map(|item| from_json(rt, item)).collect();
            rt.new_list(items)
        }
        Value::Object(fields) => {
            let mut table = Table::default();
            for (key, field) in fields {
                let value = from_json(rt, field);
                table.insert(HashKey::String(Rc::from(key)), value);
            }
            rt.new_table(table)
        }
    }
}

/// Serialize `value` as compact JSON text.
pub fn dump(value: &Variant) -> Result<String> {
    let json = to_json(value, &mut Vec::new())?;
    serde_json::to_string(&json).map_err(|err| Error::runtime(format!("JSON: {err}")))
}

fn float(f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| Error::type_error(format!("{f} cannot be represented in JSON")))
}

fn key_text(key: &HashKey) -> String {
    match key {
        HashKey::String(s) => s.to_string(),
        other => other.to_variant().to_string(),
    }
}

fn to_json(value: &Variant, ancestors: &mut Vec<Handle>) -> Result<Value> {
    Ok(match value.resolve() {
        Variant::Null => Value::Null,
        Variant::Boolean(b) => Value::Bool(b),
        Variant::Integer(i) => Value::Number(i.into()),
        Variant::Float(f) => float(f)?,
        Variant::String(s) => Value::String(s.to_string()),
        Variant::Alias(_) => return Err(Error::internal("unresolved alias")),
        Variant::Object(handle) => {
            if ancestors.iter().any(|a| Rc::ptr_eq(a, &handle)) {
                return Err(Error::runtime("cannot serialize a cyclic structure to JSON"));
            }
            ancestors.push(Rc::clone(&handle));
            let json = object_to_json(&handle, ancestors);
            ancestors.pop();
            json?
        }
    })
}

fn object_to_json(handle: &Handle, ancestors: &mut Vec<Handle>) -> Result<Value> {
    let data = handle.data();
    Ok(match &*data {
        ObjectData::List(items) => {
            Value::Array(items.iter().map(|item| to_json(item, ancestors)).collect::<Result<_>>()?)
        }
        ObjectData::Table(table) => {
            let mut fields = Map::new();
            for (key, field) in table {
                fields.insert(key_text(key), to_json(field, ancestors)?);
            }
            Value::Object(fields)
        }
        ObjectData::Set(set) => {
            Value::Array(set.iter().map(|key| to_json(&key.to_variant(), ancestors)).collect::<Result<_>>()?)
        }
        ObjectData::Array(array) => {
            let row = |values: &[f64]| values.iter().map(|&f| float(f)).collect::<Result<Vec<_>>>().map(Value::Array);
            if array.rows() == 1 {
                row(array.as_slice())?
            } else {
                let cols = array.cols().max(1);
                Value::Array(array.as_slice().chunks(cols).map(row).collect::<Result<_>>()?)
            }
        }
        _ => {
            return Err(Error::type_error(format!(
                "a value of type {} cannot be converted to JSON",
                handle.class().name()
            )))
        }
    })
}

pub fn register(rt: &mut Runtime) -> Result<()> {
    let k = Kinds::of(rt);
    rt.add_global_function("load_json", |rt, a| load(rt, &a[0].to_text()?), &[Rc::clone(&k.string)], 0)?;
    rt.add_global_function("dump_json", |_, a| Ok(Variant::from(dump(&a[0])?)), &[Rc::clone(&k.table)], 0)?;
    rt.add_global_function("dump_json", |_, a| Ok(Variant::from(dump(&a[0])?)), &[Rc::clone(&k.list)], 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

    use super::*;
    use pretty_assertions::assert_eq;
    use rill_runtime::Category;

    #[test]
    fn objects_keep_document_order() {
        let mut rt = Runtime::new();
        let value = load(&mut rt, r#"{"z": 1, "a": [true, null, 2.5], "m": "x"}"#).unwrap();
        assert_eq!(value.to_string(), r#"{"z": 1, "a": [true, null, 2.5], "m": "x"}"#);
        assert_eq!(dump(&value).unwrap(), r#"{"z":1,"a":[true,null,2.5],"m":"x"}"#);
    }

    #[test]
    fn integers_and_floats_stay_distinct() {
        let mut rt = Runtime::new();
        let value = load(&mut rt, "[1, 1.0, 1e2, 18446744073709551615]").unwrap();
        let items = value.to_list().unwrap();
        assert!(matches!(items[0], Variant::Integer(1)));
        assert!(matches!(items[1], Variant::Float(_)));
        assert!(matches!(items[2], Variant::Float(_)));
        assert!(matches!(items[3], Variant::Float(_)));
    }

    #[test]
    fn malformed_text_is_a_syntax_error() {
        let mut rt = Runtime::new();
        let err = load(&mut rt, "{\"a\": }").unwrap_err();
        assert_eq!(err.category, Category::Syntax);
        assert!(err.message.starts_with("JSON:"));
    }

    #[test]
    fn non_json_values_are_rejected() {
        assert_eq!(dump(&Variant::Float(f64::NAN)).unwrap_err().category, Category::Type);

        let mut rt = Runtime::new();
        let list = rt.new_list(vec![Variant::Integer(1)]);
        let handle = list.as_handle().unwrap();
        if let ObjectData::List(items) = &mut *handle.data_mut() {
            items.push(list.clone());
        }
        assert_eq!(dump(&list).unwrap_err().category, Category::Runtime);
    }

    #[test]
    fn table_keys_become_strings() {
        let mut rt = Runtime::new();
        let mut table = Table::default();
        table.insert(HashKey::Integer(2), Variant::Boolean(false));
        let value = rt.new_table(table);
        assert_eq!(dump(&value).unwrap(), r#"{"2":false}"#);
    }
}
