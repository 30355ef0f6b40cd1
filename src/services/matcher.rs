// src/services/matcher.rs

//! School-name resolution: exact, then substring, then edit distance.

use crate::models::School;
use crate::utils::log;

/// Resolve a human-typed school name against the roster.
///
/// Three passes, first hit wins: case-insensitive exact match, substring
/// match (shortest containing name wins on ambiguity), and finally
/// Levenshtein distance accepted within half the longer name.
pub fn match_school<'a>(roster: &'a [School], query: &str) -> Option<&'a School> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(school) = roster.iter().find(|s| s.name.to_lowercase() == needle) {
        return Some(school);
    }

    let mut containing: Vec<&School> = roster
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .collect();
    if !containing.is_empty() {
        containing.sort_by_key(|s| s.name.len());
        if containing.len() > 1 {
            log::warn(&format!(
                "\"{query}\" matches {} schools, using \"{}\"",
                containing.len(),
                containing[0].name
            ));
        }
        return Some(containing[0]);
    }

    let mut best: Option<(&School, usize)> = None;
    for school in roster {
        let dist = levenshtein(&needle, &school.name.to_lowercase());
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((school, dist));
        }
    }
    best.and_then(|(school, dist)| {
        let max_len = needle.len().max(school.name.len());
        (dist <= max_len / 2).then_some(school)
    })
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
