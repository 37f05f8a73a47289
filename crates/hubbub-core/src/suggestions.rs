//! "Did you mean" support for misspelled channel names.

/// Edit distance between two strings (insertions, deletions and
/// substitutions each cost one).
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    if b.is_empty() {
        return a.chars().count();
    }

    // Single rolling row: `row[j]` is the distance between the prefix of `a`
    // seen so far and `b[..j]`.
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// The candidate closest to `unknown`, if any is within three edits.
pub fn closest_name<'a>(
    unknown: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|candidate| (candidate, levenshtein_distance(unknown, candidate)))
        .filter(|(_, distance)| *distance <= 3)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_empty() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn single_edits() {
        assert_eq!(levenshtein_distance("toast", "toast"), 0);
        assert_eq!(levenshtein_distance("toast", "roast"), 1);
        assert_eq!(levenshtein_distance("toasts", "toast"), 1);
        assert_eq!(levenshtein_distance("toast", "toasts"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn closest_name_within_three_edits() {
        let names = ["saved", "toasts", "logout"];
        assert_eq!(closest_name("toast", names), Some("toasts"));
        assert_eq!(closest_name("loguot", names), Some("logout"));
        assert_eq!(closest_name("unrelated", names), None);
    }
}
