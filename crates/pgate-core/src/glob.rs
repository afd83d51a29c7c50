//! Restricted path globs.
//!
//! Compiled with `globset`, `/` as the literal separator:
//!
//! - `**` matches zero or more whole segments, so `infra/**` matches
//!   `infra` itself and anything below it;
//! - `*` inside a segment matches any run of characters within that
//!   segment (`*.tf`, `deploy/*`), never a `/`;
//! - `?` matches one character;
//! - everything else matches literally.
//!
//! Leading `./` and surrounding slashes are ignored on both sides.

use globset::{GlobBuilder, GlobMatcher};

fn normalize(s: &str) -> &str {
    s.trim_start_matches("./").trim_matches('/')
}

fn matcher(pattern: &str) -> Option<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .ok()
        .map(|g| g.compile_matcher())
}

/// `true` if `path` matches `pattern`. A pattern that does not compile
/// matches nothing.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let pattern = normalize(pattern);
    let path = normalize(path);
    if let Some(prefix) = pattern.strip_suffix("/**") {
        if matcher(prefix).is_some_and(|m| m.is_match(path)) {
            return true;
        }
    }
    matcher(pattern).is_some_and(|m| m.is_match(path))
}

/// `true` if `path` matches any of `patterns`.
pub fn glob_match_any<S: AsRef<str>>(patterns: &[S], path: &str) -> bool {
    patterns.iter().any(|p| glob_match(p.as_ref(), path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_star_is_prefix_match() {
        assert!(glob_match("infra/**", "infra"));
        assert!(glob_match("infra/**", "infra/main.tf"));
        assert!(glob_match("infra/**", "infra/modules/vpc/main.tf"));
        assert!(!glob_match("infra/**", "infrastructure/main.tf"));
        assert!(!glob_match("infra/**", "app/infra/main.tf"));
    }

    #[test]
    fn single_star_stays_in_segment() {
        assert!(glob_match("deploy/*", "deploy/prod.yaml"));
        assert!(!glob_match("deploy/*", "deploy/prod/values.yaml"));
        assert!(!glob_match("deploy/*", "deploy"));
        assert!(glob_match("docs/adr/*.md", "docs/adr/0007-use-postgres.md"));
        assert!(!glob_match("docs/adr/*.md", "docs/adr/0007.txt"));
    }

    #[test]
    fn double_star_in_the_middle() {
        assert!(glob_match("services/**/Dockerfile", "services/Dockerfile"));
        assert!(glob_match("services/**/Dockerfile", "services/api/v2/Dockerfile"));
        assert!(!glob_match("services/**/Dockerfile", "services/api/Makefile"));
    }

    #[test]
    fn literal_and_question_mark() {
        assert!(glob_match("Makefile", "Makefile"));
        assert!(glob_match("./k8s/app.yaml", "k8s/app.yaml"));
        assert!(glob_match("v?.tf", "v1.tf"));
        assert!(!glob_match("v?.tf", "v10.tf"));
    }

    #[test]
    fn star_backtracks() {
        assert!(glob_match("*a*b", "xxaybzb"));
        assert!(!glob_match("*a*b", "xxaybz"));
    }

    #[test]
    fn malformed_pattern_matches_nothing() {
        assert!(!glob_match("infra/[", "infra/["));
    }

    #[test]
    fn match_any() {
        let patterns = ["infra/**", "terraform/*.tf"];
        assert!(glob_match_any(&patterns, "terraform/main.tf"));
        assert!(!glob_match_any(&patterns, "src/lib.rs"));
        let empty: [&str; 0] = [];
        assert!(!glob_match_any(&empty, "infra/main.tf"));
    }
}
