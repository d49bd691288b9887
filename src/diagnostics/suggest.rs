//! Typo suggestion
//!
//! Case-insensitive Levenshtein distance against a candidate set, with a
//! prefix bonus so truncated identifiers still rank well. Suggestion
//! generation never fails; the worst case is an empty result.

/// Ranks candidate strings by edit distance to an input
#[derive(Debug, Clone)]
pub struct Suggester {
    /// Maximum adjusted distance a candidate may have
    threshold: usize,
    /// Maximum number of suggestions returned
    limit: usize,
}

impl Default for Suggester {
    fn default() -> Self {
        Self {
            threshold: 2,
            limit: 3,
        }
    }
}

impl Suggester {
    pub fn new(threshold: usize, limit: usize) -> Self {
        Self { threshold, limit }
    }

    /// Suggest the closest candidates for `input`
    ///
    /// An exact case-insensitive match yields no suggestions: the input is
    /// not a typo. Results sort by (distance, length difference, lexical)
    /// and are capped at the configured limit.
    pub fn suggest<S: AsRef<str>>(&self, input: &str, candidates: &[S]) -> Vec<String> {
        let input_lower = input.to_lowercase();

        let mut scored: Vec<(usize, usize, String)> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            let candidate_lower = candidate.to_lowercase();

            if candidate_lower == input_lower {
                return Vec::new();
            }

            let mut distance = levenshtein(&input_lower, &candidate_lower);
            if input_lower.starts_with(&candidate_lower) || candidate_lower.starts_with(&input_lower)
            {
                distance = distance.saturating_sub(1);
            }

            if distance <= self.threshold {
                let len_diff = input.chars().count().abs_diff(candidate.chars().count());
                scored.push((distance, len_diff, candidate.to_string()));
            }
        }

        scored.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        scored.into_iter().take(self.limit).map(|(_, _, s)| s).collect()
    }

    /// The single best suggestion, if any
    pub fn best<S: AsRef<str>>(&self, input: &str, candidates: &[S]) -> Option<String> {
        self.suggest(input, candidates).into_iter().next()
    }
}

/// Levenshtein edit distance, two-row Wagner-Fischer
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr_row[j + 1] = (curr_row[j] + 1)
                .min(prev_row[j + 1] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}
