//! Request data visible to resource resolution

use serde_json::Value;
use std::collections::HashMap;

/// Route parameters and parsed JSON body of the request being authorized
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    route_params: HashMap<String, String>,
    body: Option<Value>,
}

impl RequestContext {
    pub fn new(route_params: HashMap<String, String>, body: Option<Value>) -> Self {
        Self { route_params, body }
    }

    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    /// Top-level field of a JSON object body
    pub fn body_field(&self, field: &str) -> Option<&Value> {
        self.body.as_ref()?.as_object()?.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_param_and_body_field() {
        let ctx = RequestContext::default()
            .with_route_param("categoryId", "3")
            .with_body(json!({ "threadId": 12, "title": "hello" }));

        assert_eq!(ctx.route_param("categoryId"), Some("3"));
        assert_eq!(ctx.route_param("threadId"), None);
        assert_eq!(ctx.body_field("threadId"), Some(&json!(12)));
        assert_eq!(ctx.body_field("missing"), None);
    }

    #[test]
    fn test_body_field_on_non_object() {
        let ctx = RequestContext::default().with_body(json!([1, 2, 3]));
        assert_eq!(ctx.body_field("threadId"), None);
    }
}
