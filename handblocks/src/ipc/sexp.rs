//! S-expression plist accessors and response formatting.

use lexpr::Value;
use nalgebra::Vector3;

// ── Responses ──────────────────────────────────────────────

pub fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

pub fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn sexp_bool(b: bool) -> &'static str {
    if b { "t" } else { "nil" }
}

/// `(x y z)` with three decimals.
pub fn format_vector(v: &Vector3<f32>) -> String {
    format!("({:.3} {:.3} {:.3})", v.x, v.y, v.z)
}

// ── Plist accessors ────────────────────────────────────────

/// Raw value following `:key` in a plist.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Value following `:key`, rendered as a string.  Keywords lose their
/// leading colon.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s = v.to_string();
            s.strip_prefix(':').unwrap_or(&s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => sexp_bool(*b).to_string(),
        Value::Null => "nil".to_string(),
        _ => val.to_string(),
    })
}

pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

pub fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Treats "nil" as false, anything else as true.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Elements of a proper list; `None` for atoms and dotted lists.
pub fn list_items(value: &Value) -> Option<Vec<&Value>> {
    let mut items = Vec::new();
    let mut current = value;
    loop {
        match current {
            Value::Cons(pair) => {
                items.push(pair.car());
                current = pair.cdr();
            }
            Value::Null => return Some(items),
            _ => return None,
        }
    }
}

/// A list of numbers, e.g. `(0.5 0.25 -0.01)`.
pub fn as_floats(value: &Value) -> Option<Vec<f64>> {
    list_items(value)?
        .into_iter()
        .map(|v| match v {
            Value::Number(n) => n.as_f64(),
            _ => None,
        })
        .collect()
}

/// A three-element numeric list.
pub fn as_vector3(value: &Value) -> Option<Vector3<f32>> {
    match as_floats(value)?.as_slice() {
        [x, y, z] => Some(Vector3::new(*x as f32, *y as f32, *z as f32)),
        _ => None,
    }
}

pub fn get_vector3(value: &Value, key: &str) -> Option<Vector3<f32>> {
    get_value(value, key).and_then(as_vector3)
}
