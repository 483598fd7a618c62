//! Dominant-emotion selection

use std::collections::BTreeMap;

/// The winning label of a reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dominant {
    pub label: String,
    pub score: f64,
}

/// Pick the label with the strictly greatest score.
///
/// Labels are visited in ascending order and only a strictly greater score
/// replaces the current best, so ties go to the lexicographically smallest
/// label. NaN scores never win. An empty mapping yields `("", 0.0)`.
pub fn classify(emotions: &BTreeMap<String, f64>) -> Dominant {
    let mut best: Option<(&str, f64)> = None;

    for (label, &score) in emotions {
        if score.is_nan() {
            continue;
        }
        let better = match best {
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if better {
            best = Some((label.as_str(), score));
        }
    }

    best.map(|(label, score)| Dominant {
        label: label.to_string(),
        score,
    })
    .unwrap_or_default()
}
