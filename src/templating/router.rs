use crate::templating::{Params, Router};
use crate::{Error, Result};
use ::itertools::Itertools;
use ::percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use ::serde_json::Value;
use ::std::collections::HashMap;

/// Named routes with `{placeholder}` path segments.
///
/// Parameters consumed by placeholders go into the path, the rest into the
/// query string in parameter order. Nested values use bracket notation,
/// e.g. `filter[tag]=rust` or `ids[]=1`.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    base_url: String,
    routes: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix of absolute urls, e.g. `https://example.com`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }
}

impl Router for RouteTable {
    fn generate(&self, route: &str, params: &Params, absolute: bool) -> Result<String> {
        let pattern = self
            .routes
            .get(route)
            .ok_or_else(|| Error::RouteNotFound(route.to_owned()))?;

        let mut consumed = vec![];
        let mut path = String::with_capacity(pattern.len());
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('{') {
            let Some(end) = rest[start..].find('}').map(|end| start + end) else {
                break;
            };
            path.push_str(&rest[..start]);
            let name = &rest[start + 1..end];
            consumed.push(name);
            let value = params
                .get(name)
                .and_then(scalar)
                .ok_or_else(|| Error::MissingRouteParameter {
                    route: route.to_owned(),
                    parameter: name.to_owned(),
                })?;
            path.push_str(&encode(&value));
            rest = &rest[end + 1..];
        }
        path.push_str(rest);

        let mut pairs = vec![];
        for (key, value) in params.iter().filter(|(key, _)| !consumed.contains(&key.as_str())) {
            query_pairs(key.clone(), value, &mut pairs);
        }
        let mut url = match absolute {
            true => format!("{}{path}", self.base_url),
            false => path,
        };
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(
                &pairs
                    .iter()
                    .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
                    .join("&"),
            );
        }
        Ok(url)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("1".into()),
        Value::Bool(false) => Some("0".into()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn query_pairs(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Array(values) => {
            for value in values {
                query_pairs(format!("{key}[]"), value, pairs);
            }
        }
        Value::Object(values) => {
            for (name, value) in values {
                query_pairs(format!("{key}[{name}]"), value, pairs);
            }
        }
        scalar_value => {
            if let Some(value) = scalar(scalar_value) {
                pairs.push((key, value));
            }
        }
    }
}

/// Everything but RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

fn encode(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(params) => params,
            _ => Params::new(),
        }
    }

    fn routes() -> RouteTable {
        RouteTable::new()
            .with_base_url("https://example.com/")
            .with_route("article_list", "/articles")
            .with_route("category", "/categories/{slug}/articles")
    }

    #[test]
    fn fills_placeholders_and_query_string() {
        let url = routes()
            .generate(
                "category",
                &params(json!({ "slug": "rust lang", "page": 2, "q": "a&b", "draft": null })),
                false,
            )
            .unwrap();
        assert_eq!(url, "/categories/rust%20lang/articles?page=2&q=a%26b");
    }

    #[test]
    fn encodes_non_ascii_and_reserved_characters() {
        let url = routes()
            .generate("article_list", &params(json!({ "q": "café au-lait_~.", "path": "a/b?c" })), false)
            .unwrap();
        assert_eq!(url, "/articles?q=caf%C3%A9%20au-lait_~.&path=a%2Fb%3Fc");
    }

    #[test]
    fn absolute_urls_use_base_url() {
        let url = routes().generate("article_list", &Params::new(), true).unwrap();
        assert_eq!(url, "https://example.com/articles");
    }

    #[test]
    fn nested_values_use_brackets() {
        let url = routes()
            .generate(
                "article_list",
                &params(json!({ "ids": [1, 2], "filter": { "tag": "db" }, "open": true })),
                false,
            )
            .unwrap();
        assert_eq!(url, "/articles?ids%5B%5D=1&ids%5B%5D=2&filter%5Btag%5D=db&open=1");
    }

    #[test]
    fn reports_unknown_routes_and_missing_parameters() {
        assert!(matches!(
            routes().generate("missing", &Params::new(), false),
            Err(Error::RouteNotFound(route)) if route == "missing"
        ));
        assert!(matches!(
            routes().generate("category", &Params::new(), false),
            Err(Error::MissingRouteParameter { parameter, .. }) if parameter == "slug"
        ));
    }
}
