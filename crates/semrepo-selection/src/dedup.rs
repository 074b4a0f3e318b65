//! Removal of generic duplicate criteria.
//!
//! Within one `(function, interaction)` group, a criterion whose aspect is a
//! strict ancestor of another listed criterion's aspect adds nothing the
//! more specific one does not already say, so it is dropped. In an
//! ancestor chain only the deepest listed aspect survives; siblings are kept.
//! Device-class and function-only criteria never generalize anything.

use std::collections::{HashMap, HashSet};

use semrepo_core::{FilterCriteria, Interaction};

use crate::codec;
use crate::forest::AspectForest;

/// Drop exact repeats and strict generalizations, keeping the relative order
/// of the survivors. Idempotent.
pub fn filter_generic_duplicate_criteria(
    forest: &AspectForest,
    criteria: &[FilterCriteria],
) -> Vec<FilterCriteria> {
    if criteria.len() < 2 {
        return criteria.to_vec();
    }

    let mut keep = vec![true; criteria.len()];

    let mut seen = HashSet::new();
    for (i, c) in criteria.iter().enumerate() {
        if !seen.insert(codec::encode(c)) {
            keep[i] = false;
        }
    }

    let mut groups: HashMap<(&str, Interaction), Vec<usize>> = HashMap::new();
    for (i, c) in criteria.iter().enumerate() {
        if keep[i] && c.has_aspect() {
            groups
                .entry((c.function_id.as_str(), c.interaction))
                .or_default()
                .push(i);
        }
    }

    for members in groups.values() {
        for &a in members {
            let generic = members.iter().any(|&b| {
                a != b && forest.is_strict_ancestor(&criteria[a].aspect_id, &criteria[b].aspect_id)
            });
            if generic {
                tracing::debug!(
                    "Dropping generic criteria {}",
                    codec::encode(&criteria[a])
                );
                keep[a] = false;
            }
        }
    }

    criteria
        .iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then(|| c.clone()))
        .collect()
}
