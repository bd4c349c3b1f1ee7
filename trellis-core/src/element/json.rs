//! JSON descriptors.
//!
//! Markup compilers that run out of process emit descriptors as JSON:
//!
//! ```json
//! { "$$typeof": "trellis.element", "type": "div", "key": "a",
//!   "props": { "id": "main", "children": ["hello", 1, { ... }] } }
//! ```
//!
//! Only host elements and fragments (`"type": "#fragment"`) can be expressed
//! this way; components need a function and refs need a live handle.

use serde_json::Value;
use tracing::warn;

use super::{Child, Element, ElementType, Props};
use crate::error::ReconcileError;

/// Value of the `$$typeof` field that marks an object as an element.
pub const ELEMENT_MARKER: &str = "trellis.element";

const FRAGMENT_TYPE: &str = "#fragment";

impl Child {
    /// Parse a JSON descriptor tree.
    ///
    /// Malformed JSON is an error. Well-formed JSON that is not a valid
    /// descriptor becomes [`Child::Unsupported`] at that position.
    pub fn from_json(json: &str) -> Result<Self, ReconcileError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(value))
    }

    /// Convert an already parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(_) => Child::Empty,
            Value::String(text) => Child::Text(text),
            Value::Number(number) => Child::Text(number.to_string()),
            Value::Array(items) => Child::List(items.into_iter().map(Child::from_value).collect()),
            Value::Object(_) => match element_from_value(&value) {
                Some(element) => element.into(),
                None => {
                    warn!(descriptor = %value, "object child is not an element descriptor");
                    Child::Unsupported(value)
                }
            },
        }
    }
}

fn element_from_value(value: &Value) -> Option<Element> {
    if value.get("$$typeof")?.as_str()? != ELEMENT_MARKER {
        return None;
    }

    let element_type = match value.get("type")?.as_str()? {
        "" => return None,
        FRAGMENT_TYPE => ElementType::Fragment,
        tag => ElementType::Host(tag.to_string()),
    };

    let key = match value.get("key") {
        Some(Value::String(key)) => Some(key.clone()),
        Some(Value::Number(key)) => Some(key.to_string()),
        _ => None,
    };

    let mut props = Props::new();
    if let Some(Value::Object(raw)) = value.get("props") {
        for (name, prop) in raw {
            if name == "children" {
                props.set_children(Child::from_value(prop.clone()));
            } else {
                props.set_attr(name.clone(), prop.clone());
            }
        }
    }

    Some(Element {
        element_type,
        key,
        node_ref: None,
        props,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_descriptor() {
        let json = r#"{
            "$$typeof": "trellis.element",
            "type": "ul",
            "props": {
                "class": "list",
                "children": [
                    {"$$typeof": "trellis.element", "type": "li", "key": 1, "props": {"children": "one"}},
                    2,
                    null
                ]
            }
        }"#;

        let Child::Element(ul) = Child::from_json(json).unwrap() else {
            panic!("expected element");
        };
        assert_eq!(ul.element_type, ElementType::Host("ul".into()));
        assert_eq!(ul.props.attr("class"), Some(&Value::from("list")));

        let Child::List(items) = ul.props.children() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        match &items[0] {
            Child::Element(li) => {
                assert_eq!(li.key.as_deref(), Some("1"));
                assert_eq!(li.props.text_content(), Some("one"));
            }
            other => panic!("expected li, got {other:?}"),
        }
        assert!(matches!(&items[1], Child::Text(t) if t == "2"));
        assert!(items[2].is_empty());
    }

    #[test]
    fn object_without_marker_is_unsupported() {
        let child = Child::from_json(r#"{"type": "div"}"#).unwrap();
        assert!(matches!(child, Child::Unsupported(_)));

        let child = Child::from_json(r#"{"$$typeof": "other", "type": "div"}"#).unwrap();
        assert!(matches!(child, Child::Unsupported(_)));
    }

    #[test]
    fn fragment_type_maps_to_fragment() {
        let json = r##"{"$$typeof": "trellis.element", "type": "#fragment", "props": {"children": ["a", "b"]}}"##;
        let Child::Element(element) = Child::from_json(json).unwrap() else {
            panic!("expected element");
        };
        assert_eq!(element.element_type, ElementType::Fragment);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Child::from_json("{not json").unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidDescriptor(_)));
    }
}
