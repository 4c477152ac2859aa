//! Payload helpers.
//!
//! Payloads are `serde_json::Value`. An array payload is spread into
//! positional listener arguments, anything else is passed as the only one.

use serde_json::Value;

/// Conversion from a listener or operator return value into a reply.
///
/// Lets callbacks return `()`, a plain value, an `Option`, or a `Result` with
/// any error type convertible into `anyhow::Error`.
pub trait IntoReply {
    /// Convert into the value collected by `emit`/`next`, or a fault.
    fn into_reply(self) -> anyhow::Result<Value>;
}

impl IntoReply for () {
    fn into_reply(self) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> anyhow::Result<Value> {
        Ok(self)
    }
}

macro_rules! reply_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> anyhow::Result<Value> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

reply_via_from!(bool, i32, i64, u32, u64, usize, f64, String, Vec<Value>);

impl IntoReply for &str {
    fn into_reply(self) -> anyhow::Result<Value> {
        Ok(Value::from(self))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> anyhow::Result<Value> {
        match self {
            Some(value) => value.into_reply(),
            None => Ok(Value::Null),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<anyhow::Error>,
{
    fn into_reply(self) -> anyhow::Result<Value> {
        self.map_err(Into::into)?.into_reply()
    }
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Positional arguments for a payload.
pub fn spread(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    }
}

/// Append a reply to an aggregate, flattening one level of arrays.
pub fn flatten_into(out: &mut Vec<Value>, reply: Value) {
    match reply {
        Value::Array(items) => out.extend(items),
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(0.0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(3)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!({})));
    }

    #[test]
    fn test_spread() {
        assert_eq!(spread(&json!([1, 2, 3])), &[json!(1), json!(2), json!(3)]);
        assert_eq!(spread(&json!("a")), &[json!("a")]);
        assert_eq!(spread(&Value::Null), &[Value::Null]);
        assert!(spread(&json!([])).is_empty());
    }

    #[test]
    fn test_flatten_one_level() {
        let mut out = Vec::new();
        flatten_into(&mut out, json!(1));
        flatten_into(&mut out, json!([2, [3]]));
        assert_eq!(out, vec![json!(1), json!(2), json!([3])]);
    }

    #[test]
    fn test_into_reply() {
        assert_eq!(().into_reply().unwrap(), Value::Null);
        assert_eq!(5i64.into_reply().unwrap(), json!(5));
        assert_eq!("reason".into_reply().unwrap(), json!("reason"));
        assert_eq!(None::<bool>.into_reply().unwrap(), Value::Null);

        let ok: Result<u32, std::io::Error> = Ok(7);
        assert_eq!(ok.into_reply().unwrap(), json!(7));

        let err: anyhow::Result<Value> = Err(anyhow::anyhow!("nope"));
        assert!(err.into_reply().is_err());
    }
}
