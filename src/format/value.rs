//! Argument values accepted by the level methods
//!
//! Arguments are heterogeneous, so they are carried as [`LogValue`]. Plain values are
//! owned trees and can never alias. [`SharedValue`] is the one node with identity: it may
//! be referenced from several places, including from inside itself.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A single argument passed to a level method
#[derive(Debug, Clone)]
pub enum LogValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<LogValue>),
    Object(Vec<(String, LogValue)>),
    Shared(SharedValue),
}

/// A reference-counted value that can appear more than once in an argument graph
#[derive(Clone)]
pub struct SharedValue(Arc<RwLock<LogValue>>);

impl SharedValue {
    pub fn new(value: impl Into<LogValue>) -> Self {
        Self(Arc::new(RwLock::new(value.into())))
    }

    /// Mutate the shared node in place, e.g. to make it point back at itself
    pub fn update(&self, f: impl FnOnce(&mut LogValue)) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never walk into the node: it may contain itself
        write!(f, "SharedValue({:#x})", self.id())
    }
}

/// Identities already serialized during one serialization pass
#[derive(Debug, Default)]
pub struct SeenSet(HashSet<usize>);

impl LogValue {
    /// Build a value from anything serde can serialize
    ///
    /// Serialization failures degrade to the error text.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => v.into(),
            Err(e) => LogValue::String(e.to_string()),
        }
    }

    /// Build an object from key/value pairs, keeping their order
    pub fn object<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<LogValue>,
    {
        LogValue::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether this argument is a structured value rather than a scalar or string
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            LogValue::Array(_) | LogValue::Object(_) | LogValue::Shared(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LogValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LogValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON, omitting repeated shared references
    pub fn to_json(&self) -> Value {
        self.to_json_with(&mut SeenSet::default())
            .unwrap_or(Value::Null)
    }

    /// Convert to JSON against a seen set shared with sibling values
    ///
    /// Returns `None` when this value is a shared node that was already emitted. Object
    /// members that come back `None` are dropped, array slots become `null`.
    pub fn to_json_with(&self, seen: &mut SeenSet) -> Option<Value> {
        let value = match self {
            LogValue::Null => Value::Null,
            LogValue::Bool(b) => Value::Bool(*b),
            LogValue::Number(n) => Value::Number(n.clone()),
            LogValue::String(s) => Value::String(s.clone()),
            LogValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json_with(seen).unwrap_or(Value::Null))
                    .collect(),
            ),
            LogValue::Object(members) => {
                let mut map = Map::with_capacity(members.len());
                for (key, member) in members {
                    if let Some(v) = member.to_json_with(seen) {
                        map.insert(key.clone(), v);
                    }
                }
                Value::Object(map)
            }
            LogValue::Shared(shared) => {
                if !seen.0.insert(shared.id()) {
                    return None;
                }
                let guard = shared.0.read().unwrap_or_else(PoisonError::into_inner);
                return guard.to_json_with(seen);
            }
        };
        Some(value)
    }
}

/// Snapshot a whole argument list with one seen set, as a single serialization
pub fn snapshot(args: &[LogValue]) -> Vec<Value> {
    let mut seen = SeenSet::default();
    args.iter()
        .map(|arg| arg.to_json_with(&mut seen).unwrap_or(Value::Null))
        .collect()
}

impl From<Value> for LogValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => LogValue::Null,
            Value::Bool(b) => LogValue::Bool(b),
            Value::Number(n) => LogValue::Number(n),
            Value::String(s) => LogValue::String(s),
            Value::Array(items) => LogValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                LogValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        LogValue::String(s.to_string())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        LogValue::String(s)
    }
}

impl From<&String> for LogValue {
    fn from(s: &String) -> Self {
        LogValue::String(s.clone())
    }
}

impl From<bool> for LogValue {
    fn from(b: bool) -> Self {
        LogValue::Bool(b)
    }
}

impl From<f64> for LogValue {
    fn from(n: f64) -> Self {
        // JSON has no NaN or infinity
        Number::from_f64(n).map_or(LogValue::Null, LogValue::Number)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for LogValue {
                fn from(n: $t) -> Self {
                    LogValue::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<SharedValue> for LogValue {
    fn from(shared: SharedValue) -> Self {
        LogValue::Shared(shared)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(LogValue::Null, Into::into)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(items: Vec<T>) -> Self {
        LogValue::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_round_trips_plain_values() {
        let original = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}});
        let value = LogValue::from(original.clone());
        assert_eq!(value.to_json(), original);
    }

    #[test]
    fn test_self_reference_is_elided() {
        let node = SharedValue::new(LogValue::object([("name", "root")]));
        let inner = node.clone();
        node.update(|v| {
            if let LogValue::Object(members) = v {
                members.push(("me".to_string(), LogValue::Shared(inner)));
            }
        });

        let json = LogValue::Shared(node).to_json();
        assert_eq!(json, json!({"name": "root"}));
    }

    #[test]
    fn test_repeated_sibling_reference_is_elided() {
        let shared = SharedValue::new(LogValue::object([("id", 7)]));
        let value = LogValue::object([
            ("first", LogValue::Shared(shared.clone())),
            ("second", LogValue::Shared(shared.clone())),
        ]);
        assert_eq!(value.to_json(), json!({"first": {"id": 7}}));

        let list = LogValue::Array(vec![
            LogValue::Shared(shared.clone()),
            LogValue::Shared(shared),
        ]);
        assert_eq!(list.to_json(), json!([{"id": 7}, null]));
    }

    #[test]
    fn test_snapshot_shares_seen_set_across_arguments() {
        let shared = SharedValue::new(LogValue::object([("id", 1)]));
        let args = vec![
            LogValue::Shared(shared.clone()),
            LogValue::from("between"),
            LogValue::Shared(shared),
        ];
        assert_eq!(snapshot(&args), vec![json!({"id": 1}), json!("between"), Value::Null]);
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let node = SharedValue::new(LogValue::Array(Vec::new()));
        let inner = node.clone();
        node.update(|v| {
            if let LogValue::Array(items) = v {
                items.push(LogValue::Shared(inner));
            }
        });
        assert!(format!("{:?}", node).starts_with("SharedValue("));
    }

    #[test]
    fn test_conversions() {
        assert!(LogValue::from(f64::NAN).is_null());
        assert!(LogValue::from(None::<i32>).is_null());
        assert_eq!(LogValue::from("x").as_str(), Some("x"));
        assert!(LogValue::from(vec![1, 2]).is_structured());
        assert!(!LogValue::from(3u8).is_structured());
        assert_eq!(
            LogValue::from_serialize(&std::collections::BTreeMap::from([("k", 1)])).to_json(),
            json!({"k": 1})
        );
    }
}
