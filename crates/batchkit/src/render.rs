//! Payload rendering for create and update calls.
//!
//! Every declared entity renders itself into a JSON-shaped [`Payload`]
//! that maps one-to-one onto the AWS Batch request shape. Two rules apply
//! to every field:
//!
//! - **Presence**: absent values, empty strings, empty lists and empty maps
//!   are omitted; `0` and `false` are kept.
//! - **Routing**: entities that only accept a subset of fields on update
//!   ([`Render::LIMITED_UPDATE`]) split fields into create-only,
//!   update-eligible and update-only (the resolved identifier).

use serde_json::{Map, Value};

/// Key/value body of a create or update call.
pub type Payload = Map<String, Value>;

/// Check whether a rendered value passes the presence rule.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Field collector that routes each field into the create and update payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    create: Payload,
    update: Payload,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field sent only on create (or always, for entities without
    /// limited update).
    pub fn field(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if is_present(&value) {
            self.create.insert(key.to_string(), value);
        }
        self
    }

    /// Add a field accepted by both create and update calls.
    pub fn updatable(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if is_present(&value) {
            self.update.insert(key.to_string(), value.clone());
            self.create.insert(key.to_string(), value);
        }
        self
    }

    /// Add the resolved identifier of an existing resource.
    ///
    /// Only update calls take it, and it is kept even when empty.
    pub fn identifier(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.update.insert(key.to_string(), value.into());
        self
    }

    /// Split into the create and update payloads.
    pub fn into_payloads(self) -> (Payload, Payload) {
        (self.create, self.update)
    }
}

/// An entity that renders into an AWS Batch request payload.
pub trait Render {
    /// Whether update calls accept only the update-eligible subset of fields.
    const LIMITED_UPDATE: bool = false;

    /// Collect this entity's fields.
    ///
    /// `for_update` is passed down to nested entities, whose own routing
    /// depends on the mode of the outer call.
    fn fields(&self, for_update: bool) -> Fields;

    /// Render the payload for a create (`false`) or update (`true`) call.
    fn render(&self, for_update: bool) -> Payload {
        let (create, update) = self.fields(for_update).into_payloads();
        if for_update && Self::LIMITED_UPDATE {
            update
        } else {
            create
        }
    }
}

/// Render a list of entities into a JSON array.
pub fn render_all<'a, R, I>(items: I, for_update: bool) -> Value
where
    R: Render + 'a,
    I: IntoIterator<Item = &'a R>,
{
    Value::Array(
        items
            .into_iter()
            .map(|item| Value::Object(item.render(for_update)))
            .collect(),
    )
}

/// Render a string map (tags, parameters) into a JSON object.
pub fn string_map<'a, I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Limited {
        id: &'static str,
        size: Option<i32>,
        tags: Vec<&'static str>,
    }

    impl Render for Limited {
        const LIMITED_UPDATE: bool = true;

        fn fields(&self, _for_update: bool) -> Fields {
            let mut f = Fields::new();
            f.identifier("thing", self.id)
                .field("thingName", "name")
                .updatable("size", self.size)
                .field("tags", self.tags.clone());
            f
        }
    }

    #[test]
    fn test_presence_rule() {
        assert!(!is_present(&Value::Null));
        assert!(!is_present(&json!("")));
        assert!(!is_present(&json!([])));
        assert!(!is_present(&json!({})));
        assert!(is_present(&json!(0)));
        assert!(is_present(&json!(false)));
        assert!(is_present(&json!("x")));
    }

    #[test]
    fn test_field_keeps_zero_and_false_drops_empty() {
        let mut f = Fields::new();
        f.field("zero", 0)
            .field("no", false)
            .field("none", Option::<String>::None)
            .field("empty", "")
            .field("list", Vec::<String>::new())
            .field("map", Payload::new());
        let (create, _) = f.into_payloads();

        assert_eq!(create.len(), 2);
        assert_eq!(create["zero"], json!(0));
        assert_eq!(create["no"], json!(false));
    }

    #[test]
    fn test_limited_routing() {
        let entity = Limited {
            id: "arn:thing",
            size: Some(0),
            tags: vec!["a"],
        };

        let create = entity.render(false);
        assert!(!create.contains_key("thing"));
        assert_eq!(create["thingName"], json!("name"));
        assert_eq!(create["size"], json!(0));
        assert_eq!(create["tags"], json!(["a"]));

        let update = entity.render(true);
        assert_eq!(update.len(), 2);
        assert_eq!(update["thing"], json!("arn:thing"));
        assert_eq!(update["size"], json!(0));
    }

    #[test]
    fn test_identifier_forced_present() {
        let entity = Limited {
            id: "",
            size: None,
            tags: vec![],
        };
        let update = entity.render(true);
        assert_eq!(update["thing"], json!(""));
        assert!(!update.contains_key("size"));
    }
}
