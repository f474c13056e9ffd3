use serde_json::{Map, Value};

use crate::path::AccessPath;

/// Typed, absence-returning lookups over anything that can resolve a path.
///
/// Implementors provide [`lookup`](DocumentAccess::lookup); the typed
/// getters only add a kind check on the resolved value.
pub trait DocumentAccess {
    /// The value at `path`, or `None` if the path is absent or malformed.
    fn lookup(&self, path: &str) -> Option<&Value>;

    fn get_string(&self, path: &str) -> Option<&str> {
        self.lookup(path)?.as_str()
    }

    /// Integers representable as `i64`; integral floats such as `3.0` count.
    fn get_integer(&self, path: &str) -> Option<i64> {
        let Value::Number(number) = self.lookup(path)? else {
            return None;
        };
        if let Some(integer) = number.as_i64() {
            return Some(integer);
        }
        let float = number.as_f64()?;
        let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
        (float.fract() == 0.0 && in_range).then_some(float as i64)
    }

    fn get_number(&self, path: &str) -> Option<f64> {
        self.lookup(path)?.as_f64()
    }

    fn get_boolean(&self, path: &str) -> Option<bool> {
        self.lookup(path)?.as_bool()
    }

    fn get_array(&self, path: &str) -> Option<&[Value]> {
        self.lookup(path)?.as_array().map(Vec::as_slice)
    }

    fn get_object(&self, path: &str) -> Option<&Map<String, Value>> {
        self.lookup(path)?.as_object()
    }

    fn has(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Element count of arrays, entry count of objects, character count of
    /// strings.
    fn length(&self, path: &str) -> Option<usize> {
        match self.lookup(path)? {
            Value::Array(items) => Some(items.len()),
            Value::Object(members) => Some(members.len()),
            Value::String(text) => Some(text.chars().count()),
            _ => None,
        }
    }
}

impl DocumentAccess for Value {
    fn lookup(&self, path: &str) -> Option<&Value> {
        resolve(self, path)
    }
}

/// Resolve `path` against `document`.
pub fn resolve<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    AccessPath::parse(path).ok()?.resolve(document)
}

pub fn get_string<'v>(document: &'v Value, path: &str) -> Option<&'v str> {
    document.get_string(path)
}

pub fn get_integer(document: &Value, path: &str) -> Option<i64> {
    document.get_integer(path)
}

pub fn get_number(document: &Value, path: &str) -> Option<f64> {
    document.get_number(path)
}

pub fn get_boolean(document: &Value, path: &str) -> Option<bool> {
    document.get_boolean(path)
}

pub fn get_array<'v>(document: &'v Value, path: &str) -> Option<&'v [Value]> {
    document.get_array(path)
}

pub fn get_object<'v>(document: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
    document.get_object(path)
}

pub fn has(document: &Value, path: &str) -> bool {
    document.has(path)
}

pub fn length(document: &Value, path: &str) -> Option<usize> {
    document.length(path)
}
