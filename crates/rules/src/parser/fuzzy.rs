//! Levenshtein-based "did you mean …?" suggestions for misspelled DSL names.

/// Closest candidate by case-insensitive edit distance, if it is within half
/// the length of the longer of the two names. Ties go to the earlier candidate.
pub(crate) fn fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let needle = input.to_lowercase();
    candidates
        .iter()
        .map(|&candidate| (candidate, levenshtein(&needle, &candidate.to_lowercase())))
        .min_by_key(|&(_, distance)| distance)
        .filter(|&(candidate, distance)| distance <= input.len().max(candidate.len()) / 2)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein edit distance between two strings.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let m = a.len();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
