//! Single criterion against single service tuple.

use semrepo_core::{ExpansionMode, FilterCriteria};

use crate::flatten::ServiceTuple;
use crate::forest::AspectForest;

/// Which aspect relatives of the criterion aspect also count as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HierarchyExpansion {
    pub ancestors: bool,
    pub descendants: bool,
}

impl HierarchyExpansion {
    pub const EXACT: Self = Self {
        ancestors: false,
        descendants: false,
    };
    pub const WITH_DESCENDANTS: Self = Self {
        ancestors: false,
        descendants: true,
    };
    pub const WITH_ANCESTORS: Self = Self {
        ancestors: true,
        descendants: false,
    };
}

impl From<ExpansionMode> for HierarchyExpansion {
    fn from(mode: ExpansionMode) -> Self {
        match mode {
            ExpansionMode::Exact => Self::EXACT,
            ExpansionMode::Descendants => Self::WITH_DESCENDANTS,
            ExpansionMode::Ancestors => Self::WITH_ANCESTORS,
        }
    }
}

/// Matches criteria against tuples over one forest snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaMatcher<'a> {
    forest: &'a AspectForest,
}

impl<'a> CriteriaMatcher<'a> {
    pub fn new(forest: &'a AspectForest) -> Self {
        Self { forest }
    }

    pub fn matches(
        &self,
        criterion: &FilterCriteria,
        tuple: &ServiceTuple,
        expansion: HierarchyExpansion,
    ) -> bool {
        if criterion.function_id != tuple.function_id {
            return false;
        }
        if !criterion.interaction.matches(&tuple.interaction) {
            return false;
        }
        if criterion.has_aspect() {
            return self.aspect_matches(&criterion.aspect_id, &tuple.aspect_id, expansion);
        }
        if criterion.has_device_class() {
            // Device classes are flat.
            return criterion.device_class_id == tuple.device_class_id;
        }
        true
    }

    fn aspect_matches(
        &self,
        criterion_aspect: &str,
        tuple_aspect: &str,
        expansion: HierarchyExpansion,
    ) -> bool {
        if !self.forest.contains(criterion_aspect) {
            tracing::debug!("Criteria aspect {} is not in the forest", criterion_aspect);
            return false;
        }
        if tuple_aspect.is_empty() {
            return false;
        }
        criterion_aspect == tuple_aspect
            || (expansion.descendants && self.forest.is_strict_descendant(tuple_aspect, criterion_aspect))
            || (expansion.ancestors && self.forest.is_strict_ancestor(tuple_aspect, criterion_aspect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semrepo_core::{AspectNode, Interaction};

    fn forest() -> AspectForest {
        AspectForest::new(vec![
            AspectNode::new("root", "Root"),
            AspectNode::new("mid", "Mid").with_parent("root"),
            AspectNode::new("leaf", "Leaf").with_parent("mid"),
        ])
    }

    #[test]
    fn test_descendant_expansion() {
        let forest = forest();
        let m = CriteriaMatcher::new(&forest);
        let tuple = ServiceTuple::output("f1", "leaf", Interaction::Event, "value");
        let c = FilterCriteria::with_aspect("f1", "root", Interaction::Event);

        assert!(m.matches(&c, &tuple, HierarchyExpansion::WITH_DESCENDANTS));
        assert!(!m.matches(&c, &tuple, HierarchyExpansion::EXACT));
        assert!(!m.matches(&c, &tuple, HierarchyExpansion::WITH_ANCESTORS));
    }

    #[test]
    fn test_ancestor_expansion() {
        let forest = forest();
        let m = CriteriaMatcher::new(&forest);
        let tuple = ServiceTuple::output("f1", "root", Interaction::Event, "value");
        let c = FilterCriteria::with_aspect("f1", "leaf", Interaction::Event);

        assert!(m.matches(&c, &tuple, HierarchyExpansion::WITH_ANCESTORS));
        assert!(!m.matches(&c, &tuple, HierarchyExpansion::WITH_DESCENDANTS));
    }

    #[test]
    fn test_device_class_is_exact() {
        let forest = forest();
        let m = CriteriaMatcher::new(&forest);
        let c = FilterCriteria::with_device_class("f2", "dc1", Interaction::Request);
        let other = ServiceTuple::input("f2", "dc2", Interaction::Request, "on");
        let same = ServiceTuple::input("f2", "dc1", Interaction::Request, "on");

        for expansion in [
            HierarchyExpansion::EXACT,
            HierarchyExpansion::WITH_DESCENDANTS,
            HierarchyExpansion::WITH_ANCESTORS,
            HierarchyExpansion {
                ancestors: true,
                descendants: true,
            },
        ] {
            assert!(!m.matches(&c, &other, expansion));
            assert!(m.matches(&c, &same, expansion));
        }
    }

    #[test]
    fn test_interaction_union_and_function() {
        let forest = forest();
        let m = CriteriaMatcher::new(&forest);
        let tuple = ServiceTuple::output("f1", "mid", Interaction::EventAndRequest, "v");

        let event = FilterCriteria::with_aspect("f1", "mid", Interaction::Event);
        assert!(m.matches(&event, &tuple, HierarchyExpansion::EXACT));

        let request_tuple = ServiceTuple::output("f1", "mid", Interaction::Request, "v");
        assert!(!m.matches(&event, &request_tuple, HierarchyExpansion::EXACT));

        let other_fn = FilterCriteria::with_aspect("f9", "mid", Interaction::Event);
        assert!(!m.matches(&other_fn, &tuple, HierarchyExpansion::EXACT));
    }

    #[test]
    fn test_missing_aspect_never_matches() {
        let forest = forest();
        let m = CriteriaMatcher::new(&forest);
        let tuple = ServiceTuple::output("f1", "ghost", Interaction::Event, "v");
        let c = FilterCriteria::with_aspect("f1", "ghost", Interaction::Event);
        assert!(!m.matches(&c, &tuple, HierarchyExpansion::WITH_DESCENDANTS));
    }

    #[test]
    fn test_function_only_ignores_aspect() {
        let forest = forest();
        let m = CriteriaMatcher::new(&forest);
        let tuple = ServiceTuple::output("f1", "leaf", Interaction::Event, "v");
        let c = FilterCriteria::function_only("f1", Interaction::Event);
        assert!(m.matches(&c, &tuple, HierarchyExpansion::EXACT));
    }

    #[test]
    fn test_expansion_from_mode() {
        assert_eq!(
            HierarchyExpansion::from(ExpansionMode::default()),
            HierarchyExpansion::WITH_DESCENDANTS
        );
        assert_eq!(
            HierarchyExpansion::from(ExpansionMode::Exact),
            HierarchyExpansion::EXACT
        );
    }
}
