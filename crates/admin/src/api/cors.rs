//! CORS policy built from `[server.cors]`.

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use rf_domain::config::CorsConfig;

/// One entry of `allowed_origins`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginRule {
    /// `*`
    Any,
    /// `http://host:*`, stored without the `*`.
    AnyPort(String),
    Exact(String),
}

impl OriginRule {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "*" => Self::Any,
            s => match s.strip_suffix('*') {
                Some(prefix) if prefix.ends_with(':') => Self::AnyPort(prefix.to_owned()),
                _ => Self::Exact(s.to_owned()),
            },
        }
    }

    fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => exact == origin,
            Self::AnyPort(prefix) => origin.strip_prefix(prefix.as_str()).is_some_and(|port| {
                !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
            }),
        }
    }
}

/// Dashboard-facing CORS layer. Only the methods the API routes use are
/// allowed.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let rules: Vec<OriginRule> = cors
        .allowed_origins
        .iter()
        .map(|raw| OriginRule::parse(raw))
        .collect();

    let allow_origin = if rules.contains(&OriginRule::Any) {
        tracing::warn!("CORS allows every origin");
        AllowOrigin::any()
    } else {
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .is_ok_and(|origin| rules.iter().any(|rule| rule.matches(origin)))
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
}
