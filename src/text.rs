//! Text normalisation and similarity primitives for sample titles and descriptions.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

/// Lower-cased alphanumeric tokens; punctuation and whitespace are separators.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Microarray names that often end up in sample titles but say nothing about the sample.
pub fn default_platform_markers() -> Vec<String> {
    [
        "u133a", "u133b", "u95a", "u95b", "u95c", "u95d", "u95e", "u74a", "u74b", "u74c", "av2",
        "chip a", "chip b", "chip c", "chipa", "chipb", "chipc",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Token sequences to drop from titles. Longer markers are tried first.
#[derive(Debug, Clone, Default)]
pub struct PlatformMarkers {
    markers: Vec<Vec<String>>,
}

impl PlatformMarkers {
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Self {
        let mut markers = markers
            .iter()
            .map(|marker| tokenize(marker.as_ref()))
            .filter(|tokens| !tokens.is_empty())
            .collect::<Vec<_>>();
        markers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        markers.dedup();
        Self { markers }
    }

    pub fn strip(&self, tokens: Vec<String>) -> Vec<String> {
        if self.markers.is_empty() {
            return tokens;
        }
        let mut kept = Vec::with_capacity(tokens.len());
        let mut idx = 0;
        while idx < tokens.len() {
            let hit = self
                .markers
                .iter()
                .find(|marker| tokens[idx..].starts_with(marker.as_slice()));
            match hit {
                Some(marker) => idx += marker.len(),
                None => {
                    kept.push(tokens[idx].clone());
                    idx += 1;
                }
            }
        }
        kept
    }
}

/// Tokens that appear in at least `fraction` of the given token lists.
///
/// Needs at least two lists; a single title has no boilerplate to speak of.
pub fn boilerplate_tokens(texts: &[Vec<String>], fraction: f64) -> BTreeSet<String> {
    let texts = texts
        .iter()
        .filter(|tokens| !tokens.is_empty())
        .collect::<Vec<_>>();
    if texts.len() < 2 {
        return BTreeSet::new();
    }

    let mut frequency = HashMap::<&str, usize>::new();
    for tokens in &texts {
        let unique = tokens.iter().map(String::as_str).collect::<BTreeSet<_>>();
        for token in unique {
            *frequency.entry(token).or_default() += 1;
        }
    }

    let required = ((fraction * texts.len() as f64 - 1e-9).ceil() as usize).max(1);
    frequency
        .into_iter()
        .filter(|(_, count)| *count >= required)
        .map(|(token, _)| token.to_string())
        .collect()
}

/// Drops boilerplate tokens, keeping the original tokens if nothing would remain.
pub fn strip_boilerplate(tokens: Vec<String>, boilerplate: &BTreeSet<String>) -> Vec<String> {
    let stripped = tokens
        .iter()
        .filter(|token| !boilerplate.contains(*token))
        .cloned()
        .collect::<Vec<_>>();
    if stripped.is_empty() { tokens } else { stripped }
}

/// `1 - levenshtein / max_len` over characters; empty input scores 0.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b) as f64;
    let longest = a.chars().count().max(b.chars().count()) as f64;
    (1.0 - distance / longest).max(0.0)
}

pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn tokenize_splits_punctuation() {
        assert_eq!(
            tokenize("C6-U133A (rep_1)"),
            vec!["c6", "u133a", "rep", "1"]
        );
    }

    #[test]
    fn markers_strip_multi_token_runs() {
        let markers = PlatformMarkers::new(&default_platform_markers());
        let tokens = tokenize("Brain Chip A replicate 2 U133B");
        assert_eq!(markers.strip(tokens), vec!["brain", "replicate", "2"]);
    }

    #[test]
    fn boilerplate_requires_two_titles() {
        let texts = vec![tokenize("sample 1 arraya")];
        assert!(boilerplate_tokens(&texts, 0.8).is_empty());
    }

    #[test]
    fn boilerplate_uses_fraction() {
        let texts = vec![
            tokenize("Sample 1 - ArrayA"),
            tokenize("Sample 2 - ArrayA"),
            tokenize("Sample 3 - ArrayA"),
            tokenize("Sample 4 - ArrayA"),
            tokenize("Pool - ArrayA"),
        ];
        assert_eq!(boilerplate_tokens(&texts, 0.8), set(&["arraya", "sample"]));
        assert_eq!(boilerplate_tokens(&texts, 1.0), set(&["arraya"]));
    }

    #[test]
    fn strip_boilerplate_keeps_tokens_when_everything_is_boilerplate() {
        let boilerplate = set(&["liver"]);
        assert_eq!(
            strip_boilerplate(vec!["liver".to_string()], &boilerplate),
            vec!["liver"]
        );
    }

    #[test]
    fn edit_similarity_bounds() {
        assert_eq!(edit_similarity("abc", "abc"), 1.0);
        assert_eq!(edit_similarity("", "abc"), 0.0);
        assert!((edit_similarity("c6", "c7") - 0.5).abs() < 1e-9);
        assert_eq!(edit_similarity("ab", "cd"), 0.0);
    }

    #[test]
    fn jaccard_on_word_sets() {
        let sim = jaccard_similarity(&set(&["liver", "male"]), &set(&["liver"]));
        assert!((sim - 0.5).abs() < 1e-9);
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 0.0);
    }
}
