//! S-expression plist helpers shared by config loading and script replay.
//!
//! Plists look like `(:key value :key value ...)`. Keys may arrive as
//! `Value::Keyword("key")` or `Value::Symbol(":key")` depending on parser
//! options, so both are accepted.

use lexpr::Value;

/// Escape a string for s-expression output.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn is_key(value: &Value, key: &str) -> bool {
    match value {
        Value::Keyword(k) => k.as_ref() == key,
        Value::Symbol(s) => s.strip_prefix(':') == Some(key),
        _ => false,
    }
}

/// The raw value following `:key` in a plist. Walks key/value pairs, so
/// a keyword in value position never matches.
pub fn get_value<'a>(plist: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = plist;
    while let Value::Cons(pair) = current {
        let Value::Cons(next) = pair.cdr() else {
            return None;
        };
        if is_key(pair.car(), key) {
            return Some(next.car());
        }
        current = next.cdr();
    }
    None
}

/// Atom value following `:key`, rendered as a string. Keywords lose their
/// leading colon; `t`/`nil` stay as written.
pub fn get_keyword(plist: &Value, key: &str) -> Option<String> {
    let val = get_value(plist, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => v.strip_prefix(':').unwrap_or(v).to_string(),
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "t" } else { "nil" }).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        other => other.to_string(),
    })
}

pub fn get_string(plist: &Value, key: &str) -> Option<String> {
    get_keyword(plist, key)
}

pub fn get_int(plist: &Value, key: &str) -> Option<i64> {
    get_keyword(plist, key).and_then(|s| s.parse().ok())
}

pub fn get_float(plist: &Value, key: &str) -> Option<f64> {
    get_keyword(plist, key).and_then(|s| s.parse().ok())
}

/// Treats `nil` as false and anything else as true.
pub fn get_bool(plist: &Value, key: &str) -> Option<bool> {
    get_keyword(plist, key).map(|s| s != "nil")
}

/// Top-level elements of a proper list.
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        items.push(pair.car());
        current = pair.cdr();
    }
    items
}

/// Every number in a possibly nested list, depth first.
pub fn number_list(value: &Value) -> Vec<f64> {
    fn walk(v: &Value, out: &mut Vec<f64>) {
        match v {
            Value::Cons(pair) => {
                walk(pair.car(), out);
                walk(pair.cdr(), out);
            }
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    out.push(f);
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(value, &mut out);
    out
}

/// Format an event s-expression from pre-rendered field values.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}
