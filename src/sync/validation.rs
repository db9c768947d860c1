//! # Reference Validation
//!
//! Visited-set walk over data that may reference values of its own kind
//! by key, detecting cycles and dangling references.
//!
//! A [`ValidationContext`] carries the path description and the set of
//! keys visited along the current descent. [`ValidationContext::enter_element`]
//! never mutates in place: each step returns a new context with the key
//! added, so sibling branches cannot see each other's visits.
//!
//! Findings are accumulated as structured [`Problem`] values on a shared
//! [`ProblemCollector`] rather than raised as errors — one walk can
//! surface every problem in the data at once. A cycle is reported at the
//! point of first repeated visit, and the walk never descends into it,
//! guaranteeing termination.

use crate::core::resource::ResourceId;
use crate::protocol::message::{Tag, TagSet};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// One finding from a validation walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Where the problem was found, as a `->`-separated descent path.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Accumulates problems across one validation walk.
#[derive(Debug, Default)]
pub struct ProblemCollector {
    problems: RefCell<Vec<Problem>>,
}

impl ProblemCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, path: impl Into<String>, message: impl Into<String>) {
        self.problems.borrow_mut().push(Problem {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.problems.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.borrow().len()
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems.into_inner()
    }
}

/// Threaded state of one validation descent.
pub struct ValidationContext<'a> {
    collector: &'a ProblemCollector,
    path: String,
    visited: HashSet<ResourceId>,
}

impl<'a> ValidationContext<'a> {
    /// Context at the top of a walk: empty path, nothing visited.
    pub fn root(collector: &'a ProblemCollector) -> Self {
        Self {
            collector,
            path: String::new(),
            visited: HashSet::new(),
        }
    }

    /// Descend into a named element, returning a new context whose visited
    /// set is this one's plus `key`.
    pub fn enter_element(&self, name: &str, key: &ResourceId) -> ValidationContext<'a> {
        let mut visited = self.visited.clone();
        visited.insert(key.clone());
        let path = if self.path.is_empty() {
            format!("{name} '{key}'")
        } else {
            format!("{} -> {name} '{key}'", self.path)
        };
        ValidationContext {
            collector: self.collector,
            path,
            visited,
        }
    }

    /// Has `key` been visited on this descent path?
    pub fn has_visited(&self, key: &ResourceId) -> bool {
        self.visited.contains(key)
    }

    /// Report a problem at the current path.
    pub fn report(&self, message: impl Into<String>) {
        self.collector.report(self.path.clone(), message);
    }
}

/// Validate the include graph reachable from one tag.
///
/// Reports a cycle at the first repeated visit of a tag name and a
/// dangling reference for each include that names no tag in the set.
pub fn validate_tag_references(set: &TagSet, root: &Tag, collector: &ProblemCollector) {
    let index: HashMap<&ResourceId, &Tag> =
        set.tags.iter().map(|tag| (&tag.name, tag)).collect();
    let ctx = ValidationContext::root(collector).enter_element("tag", &root.name);
    walk_includes(&ctx, root, &index);
}

fn walk_includes(
    ctx: &ValidationContext<'_>,
    tag: &Tag,
    index: &HashMap<&ResourceId, &Tag>,
) {
    for include in &tag.includes {
        if ctx.has_visited(include) {
            ctx.report(format!("include cycle: tag '{include}' already on this path"));
            continue;
        }
        match index.get(include) {
            Some(target) => {
                let child = ctx.enter_element("include", include);
                walk_includes(&child, target, index);
            }
            None => ctx.report(format!("include references unknown tag '{include}'")),
        }
    }
}

/// Validate every tag set: duplicate tag names, dangling includes, and
/// include cycles, accumulated into one collector.
pub fn validate_tag_sets(sets: &[TagSet], collector: &ProblemCollector) {
    for set in sets {
        let mut seen = HashSet::new();
        for tag in &set.tags {
            if !seen.insert(&tag.name) {
                collector.report(
                    format!("tag set '{}'", set.registry),
                    format!("duplicate tag name '{}'", tag.name),
                );
            }
        }
        for tag in &set.tags {
            validate_tag_references(set, tag, collector);
        }
    }
    if !collector.is_empty() {
        debug!(problems = collector.len(), "Tag validation found problems");
    }
}
