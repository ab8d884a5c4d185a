//! Route building for REST endpoints.
//!
//! A [`Route`] is a verb plus a URL template such as
//! `entity/{entityType}/{entityId}`. Path parameters are substituted into the
//! template (string values percent-encoded) and query parameters are appended
//! as a form-encoded query string, in insertion order. The final URL is fixed
//! at construction time.

use std::fmt;

use thiserror::Error;

/// HTTP verb of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Errors raised while rendering a URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no value supplied for placeholder '{{{name}}}' in '{template}'")]
    MissingParameter { name: String, template: String },

    #[error("malformed URL template '{template}'")]
    Malformed { template: String },
}

/// A scalar route parameter.
///
/// Only [`ParamValue::Str`] is percent-encoded when placed in a path; the
/// numeric and boolean forms are inserted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    fn to_path_segment(&self) -> String {
        match self {
            // '/' stays literal so multi-segment values keep their shape
            ParamValue::Str(s) => s
                .split('/')
                .map(|part| urlencoding::encode(part).into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::UInt(u) => write!(f, "{}", u),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Str(s.clone())
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Int(i64::from(i))
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<u32> for ParamValue {
    fn from(u: u32) -> Self {
        ParamValue::UInt(u64::from(u))
    }
}

impl From<u64> for ParamValue {
    fn from(u: u64) -> Self {
        ParamValue::UInt(u)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// Insertion-ordered parameter map.
///
/// Setting a name that is already present replaces its value in place, so
/// ordering follows first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chained form of [`Params::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Sets the parameter only when a value is present.
    pub fn set_opt<V: Into<ParamValue>>(&mut self, name: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.set(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter().map(|(k, v)| (k, v.to_string())))
            .finish()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// A resolved API route. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    method: Method,
    template: String,
    path_params: Params,
    query_params: Params,
    url: String,
}

impl Route {
    /// Builds a route with no parameters.
    pub fn new(method: Method, template: impl Into<String>) -> Result<Self, TemplateError> {
        Self::build(method, template, Params::new(), Params::new())
    }

    /// Renders `template` with `path_params` and appends `query_params`.
    ///
    /// Fails if the template references a placeholder that has no path
    /// parameter, or if its braces are unbalanced.
    pub fn build(
        method: Method,
        template: impl Into<String>,
        path_params: Params,
        query_params: Params,
    ) -> Result<Self, TemplateError> {
        let template = template.into();
        let mut url = render_template(&template, &path_params)?;
        if !query_params.is_empty() {
            url.push('?');
            url.push_str(&query_params.to_query_string());
        }

        Ok(Self {
            method,
            template,
            path_params,
            query_params,
            url,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    /// The rendered URL, relative to the REST base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Identity of the endpoint independent of substituted values.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.template)
    }
}

fn render_template(template: &str, params: &Params) -> Result<String, TemplateError> {
    let malformed = || TemplateError::Malformed {
        template: template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            return Err(malformed());
        } else {
            let end = tail.find('}').ok_or_else(malformed)?;
            let name = &tail[1..end];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(malformed());
            }
            let value = params
                .get(name)
                .ok_or_else(|| TemplateError::MissingParameter {
                    name: name.to_string(),
                    template: template.to_string(),
                })?;
            out.push_str(&value.to_path_segment());
            rest = &tail[end + 1..];
        }
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REST_URL: &str = "https://rest123.bullhornstaffing.com/rest-services/1234/";

    #[test]
    fn test_route_without_params() {
        let route = Route::new(Method::Get, format!("{}ping", REST_URL)).unwrap();
        assert_eq!(
            route.url(),
            "https://rest123.bullhornstaffing.com/rest-services/1234/ping"
        );
    }

    #[test]
    fn test_route_with_path_and_query_params() {
        let route = Route::build(
            Method::Get,
            "entity/{entityType}/{entityId}",
            Params::new()
                .with("entityType", "Candidate")
                .with("entityId", "123456789"),
            Params::new()
                .with("fields", "firstName,lastName,address")
                .with("count", 5),
        )
        .unwrap();

        assert_eq!(
            route.url(),
            "entity/Candidate/123456789?fields=firstName%2ClastName%2Caddress&count=5"
        );
    }

    #[test]
    fn test_route_key_ignores_values() {
        let a = Route::build(
            Method::Get,
            "entity/{entityType}",
            Params::new().with("entityType", "Candidate"),
            Params::new(),
        )
        .unwrap();
        let b = Route::build(
            Method::Get,
            "entity/{entityType}",
            Params::new().with("entityType", "Placement"),
            Params::new().with("fields", "id"),
        )
        .unwrap();

        assert_eq!(a.key(), "GET entity/{entityType}");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.url(), b.url());
    }

    #[test]
    fn test_path_strings_are_percent_encoded() {
        let route = Route::build(
            Method::Get,
            "settings/{settings}",
            Params::new().with("settings", "a b,c&d/e"),
            Params::new(),
        )
        .unwrap();

        assert_eq!(route.url(), "settings/a%20b%2Cc%26d/e");
    }

    #[test]
    fn test_path_numbers_and_bools_are_verbatim() {
        let route = Route::build(
            Method::Delete,
            "entity/{entityType}/{entityId}/{flag}/{ratio}",
            Params::new()
                .with("entityType", "Placement")
                .with("entityId", 42i64)
                .with("flag", true)
                .with("ratio", 0.5),
            Params::new(),
        )
        .unwrap();

        assert_eq!(route.url(), "entity/Placement/42/true/0.5");
    }

    #[test]
    fn test_query_preserves_insertion_order() {
        let query = Params::new()
            .with("zeta", 1)
            .with("alpha", 2)
            .with("mid", "x y");
        let route = Route::build(Method::Get, "search/Candidate", Params::new(), query).unwrap();

        assert_eq!(route.url(), "search/Candidate?zeta=1&alpha=2&mid=x+y");
    }

    #[test]
    fn test_build_is_deterministic() {
        let build = || {
            Route::build(
                Method::Get,
                "query/{entityType}",
                Params::new().with("entityType", "JobOrder"),
                Params::new()
                    .with("where", "isOpen=true")
                    .with("fields", "id,title")
                    .with("count", 10)
                    .with("start", 0),
            )
            .unwrap()
        };

        assert_eq!(build().url().as_bytes(), build().url().as_bytes());
    }

    #[test]
    fn test_missing_placeholder_fails() {
        let err = Route::build(
            Method::Get,
            "entity/{entityType}/{entityId}",
            Params::new().with("entityType", "Candidate"),
            Params::new(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TemplateError::MissingParameter {
                name: "entityId".to_string(),
                template: "entity/{entityType}/{entityId}".to_string(),
            }
        );
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        for template in ["entity/{entityType", "entity/entityType}", "entity/{}"] {
            let err = Route::build(
                Method::Get,
                template,
                Params::new().with("entityType", "Candidate"),
                Params::new(),
            )
            .unwrap_err();
            assert!(matches!(err, TemplateError::Malformed { .. }), "{}", template);
        }
    }

    #[test]
    fn test_escaped_braces_render_literally() {
        let route = Route::build(
            Method::Get,
            "search/{entityType}/{{raw}}",
            Params::new().with("entityType", "Candidate"),
            Params::new(),
        )
        .unwrap();

        assert_eq!(route.url(), "search/Candidate/{raw}");
    }

    #[test]
    fn test_unused_path_params_are_ignored() {
        let route = Route::build(
            Method::Get,
            "ping",
            Params::new().with("unused", "value"),
            Params::new(),
        )
        .unwrap();

        assert_eq!(route.url(), "ping");
    }

    #[test]
    fn test_params_set_replaces_in_place() {
        let params = Params::new()
            .with("count", 10)
            .with("start", 0)
            .with("count", 20);

        let pairs: Vec<_> = params.iter().map(|(k, v)| (k, v.to_string())).collect();
        assert_eq!(
            pairs,
            vec![("count", "20".to_string()), ("start", "0".to_string())]
        );
    }

    #[test]
    fn test_params_set_opt_skips_none() {
        let mut params = Params::new();
        params.set_opt("sort", None::<&str>);
        params.set_opt("count", Some(5));

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("count"), Some(&ParamValue::Int(5)));
    }
}
