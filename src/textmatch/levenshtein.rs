//! Wagner-Fischer edit distance with O(min(|a|,|b|)) space: only two rows
//! of the full matrix are ever live, and the shorter string is always the
//! one spanning the row.

/// Levenshtein edit distance between `a` and `b`, operating on Unicode
/// scalar values (`char`), not bytes.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let (shorter, longer): (Vec<char>, Vec<char>) = if a.chars().count() <= b.chars().count() {
        (a.chars().collect(), b.chars().collect())
    } else {
        (b.chars().collect(), a.chars().collect())
    };

    if shorter.is_empty() {
        return longer.len();
    }

    let mut previous: Vec<usize> = (0..=shorter.len()).collect();
    let mut current = vec![0usize; shorter.len() + 1];

    for (i, &lc) in longer.iter().enumerate() {
        current[0] = i + 1;
        for (j, &sc) in shorter.iter().enumerate() {
            let cost = if lc == sc { 0 } else { 1 };
            current[j + 1] = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[shorter.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(levenshtein_distance("kitten", "kitten"), 0);
    }

    #[test]
    fn classic_kitten_sitting_example() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn empty_string_distance_is_other_length() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
    }

    #[test]
    fn is_symmetric() {
        assert_eq!(
            levenshtein_distance("flaw", "lawn"),
            levenshtein_distance("lawn", "flaw")
        );
    }
}
