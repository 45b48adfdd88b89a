use crate::utils::error::{ImportError, Result};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Query parameters carrying the upload deadlines, all in milliseconds.
pub const TIMEOUT_PARAMS: [&str; 3] = ["connectionRequestTimeout", "connectTimeout", "socketTimeout"];

/// Maps the scheme of links returned by the workflow API to the scheme the
/// transport expects (e.g. `http` -> `http4`). Pure string transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeRewrite {
    rules: HashMap<String, String>,
}

impl SchemeRewrite {
    pub fn new(rules: HashMap<String, String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(from, to)| (from.to_ascii_lowercase(), to))
            .collect();
        Self { rules }
    }

    pub fn is_identity(&self) -> bool {
        self.rules.iter().all(|(from, to)| from.eq_ignore_ascii_case(to))
    }

    /// Only the leading scheme is rewritten. URLs without a scheme, or with a
    /// scheme that has no rule, come back unchanged.
    pub fn apply(&self, url: &str) -> String {
        let Some((scheme, rest)) = url.split_once(':') else {
            return url.to_string();
        };
        if !is_scheme(scheme) {
            return url.to_string();
        }
        match self.rules.get(&scheme.to_ascii_lowercase()) {
            Some(target) => format!("{}:{}", target, rest),
            None => url.to_string(),
        }
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Appends the request, connect and socket timeout parameters to `url`,
/// keeping any query it already has.
pub fn append_timeout_params(url: &str, timeout: Duration) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| ImportError::Unexpected {
        message: format!("Invalid upload URL '{}': {}", url, e),
    })?;
    let millis = timeout.as_millis().to_string();
    {
        let mut pairs = parsed.query_pairs_mut();
        for name in TIMEOUT_PARAMS {
            pairs.append_pair(name, &millis);
        }
    }
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pooled() -> SchemeRewrite {
        SchemeRewrite::new(HashMap::from([
            ("http".to_string(), "http4".to_string()),
            ("https".to_string(), "https4".to_string()),
        ]))
    }

    #[test]
    fn test_rewrite_leading_scheme_only() {
        let rewrite = pooled();
        assert_eq!(
            rewrite.apply("http://wf.local:8080/workflows/1?back=http://x"),
            "http4://wf.local:8080/workflows/1?back=http://x"
        );
        assert_eq!(rewrite.apply("https://wf.local/w/2"), "https4://wf.local/w/2");
        assert_eq!(rewrite.apply("HTTP://wf.local/w/3"), "http4://wf.local/w/3");
    }

    #[test]
    fn test_rewrite_passes_through_unknown_schemes() {
        let rewrite = pooled();
        assert_eq!(rewrite.apply("ftp://files/x"), "ftp://files/x");
        assert_eq!(rewrite.apply("/relative/path"), "/relative/path");
        assert_eq!(rewrite.apply("no scheme here"), "no scheme here");
    }

    #[test]
    fn test_default_rewrite_is_identity() {
        let rewrite = SchemeRewrite::default();
        assert!(rewrite.is_identity());
        assert_eq!(rewrite.apply("http://wf.local/w/1"), "http://wf.local/w/1");
        assert!(!pooled().is_identity());
    }

    #[test]
    fn test_append_timeout_params_to_url_with_query() {
        let url = append_timeout_params(
            "http://wf.local/workflows/1/upload?transition=7",
            Duration::from_secs(60),
        )
        .unwrap();
        assert_eq!(
            url,
            "http://wf.local/workflows/1/upload?transition=7&connectionRequestTimeout=60000&connectTimeout=60000&socketTimeout=60000"
        );
    }

    #[test]
    fn test_append_timeout_params_to_url_without_query() {
        let url = append_timeout_params("http4://wf.local/upload", Duration::from_millis(1500)).unwrap();
        assert_eq!(
            url,
            "http4://wf.local/upload?connectionRequestTimeout=1500&connectTimeout=1500&socketTimeout=1500"
        );
    }

    #[test]
    fn test_append_timeout_params_rejects_garbage() {
        assert!(append_timeout_params("not a url", Duration::from_secs(1)).is_err());
    }
}
