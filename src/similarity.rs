//! Sequence-matching similarity (Ratcliff/Obershelp).
//!
//! [`SequenceMatcher::ratio`] returns `2·M / T`, where `T` is the total
//! number of characters in both strings and `M` the number of characters in
//! the matching blocks found by recursively taking the longest common
//! substring. The block search follows the classic `difflib` algorithm,
//! including the "popular element" heuristic for long sequences, so scores
//! and cutoffs behave exactly like `difflib.get_close_matches`.
//!
//! Comparison is by Unicode scalar value. Callers are responsible for any
//! case folding.

use std::collections::{HashMap, HashSet};

/// Sequences at least this long have their most frequent characters
/// excluded from match seeding.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Matcher with a fixed second sequence, compared against many first
/// sequences. Indexing `b` once makes scoring a list of candidates cheap.
pub struct SequenceMatcher {
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(b: &str) -> Self {
        let b: Vec<char> = b.chars().collect();
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            let popular: HashSet<char> = b2j
                .iter()
                .filter(|(_, idxs)| idxs.len() > ntest)
                .map(|(c, _)| *c)
                .collect();
            for c in popular {
                b2j.remove(&c);
            }
        }

        Self { b, b2j }
    }

    /// Similarity of `a` against the indexed sequence, in `[0.0, 1.0]`.
    pub fn ratio(&self, a: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let total = a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches = self.matching_characters(&a);
        2.0 * matches as f64 / total as f64
    }

    /// Upper bound on [`ratio`](Self::ratio) computed from lengths only.
    pub fn real_quick_ratio(&self, a: &str) -> f64 {
        let la = a.chars().count();
        let lb = self.b.len();
        let total = la + lb;
        if total == 0 {
            return 1.0;
        }
        2.0 * la.min(lb) as f64 / total as f64
    }

    fn matching_characters(&self, a: &[char]) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Among maximal blocks, the one starting earliest in `a` wins, then
    /// earliest in `b`.
    fn find_longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let b = &self.b;
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);

        // j2len[j] = length of the longest match ending with a[i-1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut new_j2len = HashMap::new();
            if let Some(js) = self.b2j.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j == 0 {
                        1
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                    };
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Popular characters never seed a match but may still extend one
        while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && a[besti + bestsize] == b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }
}

/// Convenience wrapper for a single comparison.
pub fn ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(b).ratio(a)
}

/// Best approximate matches for `word` among `possibilities`.
///
/// Keeps candidates scoring at least `cutoff`, returns at most `n` of them,
/// best first. Equal scores are ordered by candidate string, descending.
pub fn close_matches<'a, I>(word: &str, possibilities: I, n: usize, cutoff: f64) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if n == 0 {
        return Vec::new();
    }

    let matcher = SequenceMatcher::new(word);
    let mut scored: Vec<(f64, &'a str)> = possibilities
        .into_iter()
        .filter(|x| matcher.real_quick_ratio(x) >= cutoff)
        .filter_map(|x| {
            let score = matcher.ratio(x);
            (score >= cutoff).then_some((score, x))
        })
        .collect();

    scored.sort_by(|(sa, xa), (sb, xb)| sb.total_cmp(sa).then_with(|| xb.cmp(xa)));
    scored.truncate(n);
    scored.into_iter().map(|(_, x)| x).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ratio_identical() {
        assert!(approx(ratio("extincteur", "extincteur"), 1.0));
    }

    #[test]
    fn test_ratio_disjoint() {
        assert!(approx(ratio("abc", "xyz"), 0.0));
    }

    #[test]
    fn test_ratio_both_empty() {
        assert!(approx(ratio("", ""), 1.0));
    }

    #[test]
    fn test_ratio_one_empty() {
        assert!(approx(ratio("", "abc"), 0.0));
    }

    #[test]
    fn test_ratio_known_values() {
        // difflib.SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!(approx(ratio("abcd", "bcde"), 0.75));
        // "pompe" is a prefix of "pompe a": 2*5 / 12
        assert!(approx(ratio("pompe a", "pompe"), 10.0 / 12.0));
        assert!(approx(ratio("apple", "appel"), 0.8));
        assert!(approx(ratio("ape", "appel"), 0.75));
        assert!(approx(ratio("peach", "appel"), 0.4));
    }

    #[test]
    fn test_ratio_non_ascii() {
        // one substituted accented character out of ten
        let r = ratio("équipement", "equipement");
        assert!(approx(r, 18.0 / 20.0));
    }

    #[test]
    fn test_long_sequences_are_scored() {
        let long = "a".repeat(250);
        let r = ratio(&long, &long);
        assert!(approx(r, 1.0), "popular characters still extend matches: {}", r);
    }

    #[test]
    fn test_close_matches_classic_example() {
        let got = close_matches("appel", ["ape", "apple", "peach", "puppy"], 3, 0.6);
        assert_eq!(got, vec!["apple", "ape"]);
    }

    #[test]
    fn test_close_matches_respects_n() {
        let got = close_matches("pompe", ["pompe a", "pompe b", "pompe c"], 2, 0.5);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_close_matches_ties_descending_by_string() {
        let got = close_matches("pompe", ["pompe a", "pompe b"], 5, 0.5);
        assert_eq!(got, vec!["pompe b", "pompe a"]);
    }

    #[test]
    fn test_close_matches_cutoff_excludes() {
        let got = close_matches("zzzznonexistent", ["pompe a", "extincteur"], 5, 0.5);
        assert!(got.is_empty());
    }
}
