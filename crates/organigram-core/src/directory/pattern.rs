use std::sync::LazyLock;

use regex::Regex;

/// `(Dienstort X)` with the historical `Diensort` misspelling, or `-Dienstort-X`.
static DIENSTORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(Dien(?:st|s)ort\s+([^)]+)\)|-Dienstort-([^-\s]+)")
        .expect("dienstort pattern is a valid regex")
});

/// Result of looking for a branch-office annotation in a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchMatch {
    NoMatch,
    Match {
        /// Name with every annotation removed.
        canonical: String,
        /// Location token of the first annotation, e.g. `Bonn`.
        location: String,
    },
}

impl BranchMatch {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Split a display name into canonical name and location token.
#[must_use]
pub fn extract_branch(display: &str) -> BranchMatch {
    let Some(captures) = DIENSTORT_PATTERN.captures(display) else {
        return BranchMatch::NoMatch;
    };

    let location = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    BranchMatch::Match {
        canonical: strip_branch(display),
        location,
    }
}

/// Remove all branch-office annotations from a name.
///
/// Runs to a fixed point, so the result never matches again.
#[must_use]
pub fn strip_branch(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let next = DIENSTORT_PATTERN.replace_all(&current, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}
