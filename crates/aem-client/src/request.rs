//! Request and response shapes.

use reqwest::Method;
use serde_json::Value;

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded`, fields in emission order. Keys may repeat.
    Form(Vec<(String, String)>),
    /// `application/json`.
    Json(Value),
}

/// Description of a single call against the AEM HTTP API.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the base URL, starting with `/`.
    pub path: String,
    /// Query parameters in emission order. Keys may repeat.
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a form field, switching the body to a form if it was empty.
    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let field = (key.into(), value.into());
        match &mut self.body {
            RequestBody::Form(fields) => fields.push(field),
            body => *body = RequestBody::Form(vec![field]),
        }
        self
    }

    /// Set a JSON body.
    pub fn json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// State-changing requests carry the security token.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// First query value for `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All form values for `key`, in order.
    pub fn form_values(&self, key: &str) -> Vec<&str> {
        match &self.body {
            RequestBody::Form(fields) => fields
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// First form value for `key`.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form_values(key).into_iter().next()
    }
}

/// A decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The response declared a JSON content type.
    Json(Value),
    /// Anything else, verbatim.
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Text(_) => None,
        }
    }

    /// Convert into a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Json(v) => v,
            Payload::Text(s) => Value::String(s),
        }
    }
}
