//! Download URL rewriting for slow hosts
//!
//! A rule matches chart URLs with a regular expression and routes matches
//! through a prefix-style mirror: `https://github.com/a/b.tgz` with mirror
//! `https://ghproxy.example.com` becomes
//! `https://ghproxy.example.com/https://github.com/a/b.tgz`.

use std::borrow::Cow;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, Result};

/// Mirror rule as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRule {
    /// Regular expression matched against the full download URL
    pub pattern: String,
    /// Mirror prefix prepended to matching URLs
    pub mirror: String,
}

impl MirrorRule {
    pub fn new(pattern: impl Into<String>, mirror: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mirror: mirror.into(),
        }
    }
}

/// Compiled mirror rules, first match wins
#[derive(Debug, Clone, Default)]
pub struct MirrorRewriter {
    rules: Vec<(Regex, String)>,
}

impl MirrorRewriter {
    /// Compile rules, rejecting invalid patterns
    pub fn new(rules: &[MirrorRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|e| RepoError::InvalidConfig {
                    message: format!("invalid mirror pattern '{}': {}", rule.pattern, e),
                })?;
                Ok((regex, rule.mirror.trim_end_matches('/').to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Rewrite a download URL, or return it unchanged
    pub fn rewrite<'a>(&self, url: &'a str) -> Cow<'a, str> {
        match self.rules.iter().find(|(regex, _)| regex.is_match(url)) {
            Some((_, mirror)) => {
                let rewritten = format!("{}/{}", mirror, url);
                tracing::debug!(from = url, to = %rewritten, "routing download through mirror");
                Cow::Owned(rewritten)
            }
            None => Cow::Borrowed(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_matching_host() {
        let rewriter = MirrorRewriter::new(&[MirrorRule::new(
            r"^https://github\.com/",
            "https://ghproxy.example.com/",
        )])
        .unwrap();

        assert_eq!(
            rewriter.rewrite("https://github.com/org/charts/releases/download/a-1.0.0.tgz"),
            "https://ghproxy.example.com/https://github.com/org/charts/releases/download/a-1.0.0.tgz"
        );
    }

    #[test]
    fn test_non_matching_url_untouched() {
        let rewriter =
            MirrorRewriter::new(&[MirrorRule::new(r"github\.com", "https://mirror")]).unwrap();
        let url = "https://charts.bitnami.com/bitnami/redis-17.0.0.tgz";
        assert!(matches!(rewriter.rewrite(url), Cow::Borrowed(_)));
        assert_eq!(rewriter.rewrite(url), url);
    }

    #[test]
    fn test_first_rule_wins() {
        let rewriter = MirrorRewriter::new(&[
            MirrorRule::new("example", "https://first"),
            MirrorRule::new("example.com", "https://second"),
        ])
        .unwrap();
        assert_eq!(
            rewriter.rewrite("https://example.com/a.tgz"),
            "https://first/https://example.com/a.tgz"
        );
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = MirrorRewriter::new(&[MirrorRule::new("(", "https://m")]).unwrap_err();
        assert!(matches!(err, RepoError::InvalidConfig { .. }));
    }

    #[test]
    fn test_empty_rewriter() {
        let rewriter = MirrorRewriter::default();
        assert_eq!(rewriter.rewrite("https://a/b.tgz"), "https://a/b.tgz");
    }
}
