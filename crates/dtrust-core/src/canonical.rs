//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only input the signing layer accepts. It is built
//! by serializing a value to JSON, rejecting non-integer numbers, and
//! re-serializing with `serde_jcs` (RFC 8785: sorted keys, compact
//! separators). The same credential therefore always signs to the same
//! bytes regardless of struct field order.
//!
//! Amounts in credential and payment payloads are integers (minor currency
//! units) or strings; floats are refused because their JCS rendering has
//! edge cases across implementations.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced by JCS canonicalization.
///
/// The inner buffer is private; [`CanonicalBytes::new`] and
/// [`CanonicalBytes::from_value`] are the only constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::FloatRejected`] if the value contains
    /// a non-integer number, or [`CanonicalizationError::SerializationFailed`]
    /// if serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Self::from_value(serde_json::to_value(obj)?)
    }

    /// Canonicalize an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_str(cb: &CanonicalBytes) -> &str {
        std::str::from_utf8(cb.as_bytes()).unwrap()
    }

    #[test]
    fn keys_are_sorted_at_every_level() {
        let data = json!({
            "credentialSubject": {"email": "a@b.co", "company": "Acme"},
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "device"]
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(
            as_str(&cb),
            r#"{"@context":["https://www.w3.org/2018/credentials/v1"],"credentialSubject":{"company":"Acme","email":"a@b.co"},"type":["VerifiableCredential","device"]}"#
        );
    }

    #[test]
    fn struct_field_order_does_not_matter() {
        #[derive(Serialize)]
        struct Ab {
            a: u32,
            b: &'static str,
        }
        #[derive(Serialize)]
        struct Ba {
            b: &'static str,
            a: u32,
        }
        let x = CanonicalBytes::new(&Ab { a: 1, b: "x" }).unwrap();
        let y = CanonicalBytes::new(&Ba { b: "x", a: 1 }).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn floats_rejected_even_when_nested() {
        let err = CanonicalBytes::new(&json!({"plan": {"amount": 9.99}})).unwrap_err();
        assert!(matches!(err, CanonicalizationError::FloatRejected(f) if f == 9.99));
        assert!(CanonicalBytes::new(&json!([[0.5]])).is_err());
    }

    #[test]
    fn integers_and_scalars_pass() {
        let cb = CanonicalBytes::new(&json!({"amount": 1999, "n": -3, "ok": true, "x": null}))
            .unwrap();
        assert_eq!(as_str(&cb), r#"{"amount":1999,"n":-3,"ok":true,"x":null}"#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(CanonicalBytes::new(&json!({})).unwrap().as_bytes(), b"{}");
        assert_eq!(CanonicalBytes::new(&json!([])).unwrap().as_bytes(), b"[]");
        assert!(!CanonicalBytes::new(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn unicode_stays_utf8() {
        let cb = CanonicalBytes::new(&json!({"company": "Société"})).unwrap();
        assert!(as_str(&cb).contains("Société"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value_no_floats() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,30}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn canonicalization_is_deterministic(value in json_value_no_floats()) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonical_output_parses_back_to_same_value(value in json_value_no_floats()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let parsed: Value = serde_json::from_slice(cb.as_bytes()).unwrap();
            prop_assert_eq!(parsed, value);
        }
    }
}
