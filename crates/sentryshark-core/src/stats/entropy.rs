use std::collections::HashMap;
use std::hash::Hash;

/// Shannon entropy (log base 2) of the multiset of `values`.
///
/// Entropy of the empty multiset is `0.0`.
pub fn shannon_entropy<T: Eq + Hash>(values: &[T]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&T, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let total = values.len() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Per-character Shannon entropy (log base 2) of a label's bytes.
pub fn char_entropy(label: &str) -> f64 {
    let chars: Vec<char> = label.chars().collect();
    shannon_entropy(&chars)
}
