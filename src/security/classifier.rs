//! Route classification: `Public` vs `Protected`.
//!
//! Rules are evaluated in declaration order and the first match wins. A request
//! that matches no rule is `Protected`, so a new route without a rule needs a
//! credential automatically.

use std::str::FromStr;

use axum::http::Method;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    Exact(Method),
}

impl MethodMatcher {
    fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(m) => m == method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Any,
    /// Matches the prefix itself and anything below it on a segment boundary.
    Prefix(String),
    Exact(String),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Any => true,
            PathMatcher::Exact(p) => p == path,
            PathMatcher::Prefix(prefix) => {
                let Some(rest) = path.strip_prefix(prefix.as_str()) else {
                    // `/api/auth/*` also covers `/api/auth`
                    return prefix
                        .strip_suffix('/')
                        .is_some_and(|trimmed| trimmed == path);
                };
                prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/')
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub method: MethodMatcher,
    pub path: PathMatcher,
    pub classification: Classification,
}

impl RouteRule {
    pub fn public(method: MethodMatcher, path: PathMatcher) -> Self {
        Self {
            method,
            path,
            classification: Classification::Public,
        }
    }

    pub fn protected(method: MethodMatcher, path: PathMatcher) -> Self {
        Self {
            method,
            path,
            classification: Classification::Protected,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        if !self.method.matches(method) {
            return false;
        }
        // A public exemption tied to a path never applies to a path that could be
        // rewritten into a different one downstream.
        if self.classification == Classification::Public
            && self.path != PathMatcher::Any
            && has_dot_segment(path)
        {
            return false;
        }
        self.path.matches(path)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteRuleError {
    #[error("route rule `{0}`: expected `<METHOD|*> <PATH> <public|protected>`")]
    Shape(String),
    #[error("route rule `{0}`: invalid method")]
    Method(String),
    #[error("route rule `{0}`: path must be `*` or start with `/`")]
    Path(String),
    #[error("route rule `{0}`: classification must be `public` or `protected`")]
    Classification(String),
}

impl FromStr for RouteRule {
    type Err = RouteRuleError;

    /// Parses `<METHOD|*> <PATH> <public|protected>`.
    ///
    /// `PATH` is `*` (any path), `/prefix/*` (prefix) or an exact path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entry = s.trim();
        let parts: Vec<&str> = entry.split_whitespace().collect();
        let [method, path, classification] = parts.as_slice() else {
            return Err(RouteRuleError::Shape(entry.to_string()));
        };

        let method = if *method == "*" {
            MethodMatcher::Any
        } else {
            Method::from_str(&method.to_ascii_uppercase())
                .map(MethodMatcher::Exact)
                .map_err(|_| RouteRuleError::Method(entry.to_string()))?
        };

        let path = if *path == "*" {
            PathMatcher::Any
        } else if !path.starts_with('/') {
            return Err(RouteRuleError::Path(entry.to_string()));
        } else if let Some(prefix) = path.strip_suffix('*') {
            PathMatcher::Prefix(prefix.to_string())
        } else {
            PathMatcher::Exact((*path).to_string())
        };

        let classification = match classification.to_ascii_lowercase().as_str() {
            "public" => Classification::Public,
            "protected" => Classification::Protected,
            _ => return Err(RouteRuleError::Classification(entry.to_string())),
        };

        Ok(Self {
            method,
            path,
            classification,
        })
    }
}

/// Parses a `;`-separated list of rules, keeping declaration order.
pub fn parse_rules(raw: &str) -> Result<Vec<RouteRule>, RouteRuleError> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RouteRule::from_str)
        .collect()
}

#[derive(Debug, Clone)]
pub struct RouteClassifier {
    rules: Vec<RouteRule>,
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new(Self::default_rules())
    }
}

impl RouteClassifier {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Preflight, `/api/auth/*`, health checks and the error page are public.
    pub fn default_rules() -> Vec<RouteRule> {
        vec![
            RouteRule::public(MethodMatcher::Exact(Method::OPTIONS), PathMatcher::Any),
            RouteRule::public(
                MethodMatcher::Any,
                PathMatcher::Prefix("/api/auth/".to_string()),
            ),
            RouteRule::public(
                MethodMatcher::Any,
                PathMatcher::Exact("/actuator/health".to_string()),
            ),
            RouteRule::public(
                MethodMatcher::Exact(Method::GET),
                PathMatcher::Exact("/health".to_string()),
            ),
            RouteRule::public(MethodMatcher::Any, PathMatcher::Exact("/error".to_string())),
        ]
    }

    pub fn classify(&self, method: &Method, path: &str) -> Classification {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.classification)
            .unwrap_or(Classification::Protected)
    }
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        !decoded.is_empty() && decoded.chars().all(|c| c == '.')
    })
}
