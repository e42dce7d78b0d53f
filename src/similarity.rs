//! Fuzzy string similarity used by the merchant map.
//!
//! The scorer sits behind the `Similarity` trait so that the merchant map does not care how the
//! score is computed, only that it is in `0..=100`.

use std::collections::BTreeSet;

/// A string similarity score in `0..=100`, where `100` means "the same".
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> u8;
}

/// Order-insensitive token overlap ratio.
///
/// Both strings are lowercased and every non-alphanumeric character is treated as a separator, so
/// `AMAZON.COM*AB12CD` tokenizes to `amazon com ab12cd`. The shared tokens are compared against
/// each side's full token list; the best of the three pairwise ratios wins. Consequently a string
/// whose tokens are a subset of the other's scores `100`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSetRatio;

impl Similarity for TokenSetRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        let a = preprocess(a);
        let b = preprocess(b);
        let t1: BTreeSet<&str> = a.split_whitespace().collect();
        let t2: BTreeSet<&str> = b.split_whitespace().collect();
        if t1.is_empty() || t2.is_empty() {
            return 0;
        }

        let sect = join(t1.intersection(&t2));
        let diff_1to2 = join(t1.difference(&t2));
        let diff_2to1 = join(t2.difference(&t1));

        let combined_1to2 = format!("{sect} {diff_1to2}").trim().to_string();
        let combined_2to1 = format!("{sect} {diff_2to1}").trim().to_string();

        ratio(&sect, &combined_1to2)
            .max(ratio(&sect, &combined_2to1))
            .max(ratio(&combined_1to2, &combined_2to1))
    }
}

fn preprocess(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect()
}

fn join<'a, 'b: 'a>(tokens: impl Iterator<Item = &'a &'b str>) -> String {
    tokens.copied().collect::<Vec<&str>>().join(" ")
}

/// `2 * LCS / (len(a) + len(b))` scaled to `0..=100`. Empty input scores `0`.
fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let total = (a.len() + b.len()) as f64;
    let common = lcs_len(&a, &b) as f64;
    (200.0 * common / total).round().clamp(0.0, 100.0) as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
