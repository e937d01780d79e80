//! Prerequisite dependency graph: "subject requires prerequisite" edges that
//! must stay acyclic. Every insertion is gated through `would_create_cycle`;
//! `resolve_chain` flattens the transitive closure in dependency order.
//!
//! Traversals are iterative with explicit stacks and visited sets, so a graph
//! that is already corrupt (cyclic) terminates with `CycleDetected` instead of
//! recursing forever.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::SubjectId;

/// Direct-prerequisite lookup. Implemented by `PrerequisiteGraph` and by plain
/// adjacency maps, so callers can pass a snapshot queried from their store.
pub trait PrerequisiteLookup {
    fn prerequisites_of(&self, subject: SubjectId) -> Vec<SubjectId>;
}

impl PrerequisiteLookup for HashMap<SubjectId, Vec<SubjectId>> {
    fn prerequisites_of(&self, subject: SubjectId) -> Vec<SubjectId> {
        self.get(&subject).cloned().unwrap_or_default()
    }
}

impl PrerequisiteLookup for HashMap<SubjectId, BTreeSet<SubjectId>> {
    fn prerequisites_of(&self, subject: SubjectId) -> Vec<SubjectId> {
        self.get(&subject)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// True if adding `subject requires prerequisite` would close a loop: the
/// prerequisite already depends, directly or transitively, on the subject.
/// A self-loop is a cycle without any traversal.
pub fn would_create_cycle(
    subject: SubjectId,
    prerequisite: SubjectId,
    lookup: &impl PrerequisiteLookup,
) -> bool {
    if subject == prerequisite {
        return true;
    }
    let mut visited = HashSet::new();
    let mut stack = vec![prerequisite];
    while let Some(cur) = stack.pop() {
        if !visited.insert(cur) {
            continue;
        }
        if cur == subject {
            return true;
        }
        stack.extend(lookup.prerequisites_of(cur));
    }
    false
}

struct Frame {
    node: SubjectId,
    prereqs: Vec<SubjectId>,
    next: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// Full transitive prerequisite closure of `subject`, ordered so that every
/// id appears after all of its own prerequisites. The subject itself is not
/// part of the result.
///
/// Fails with `CycleDetected` if a cycle is reachable from `subject` — that
/// should not happen when `would_create_cycle` gated every insertion, but a
/// corrupted store must not hang the traversal.
pub fn resolve_chain(
    subject: SubjectId,
    lookup: &impl PrerequisiteLookup,
) -> Result<Vec<SubjectId>, EngineError> {
    let mut order = Vec::new();
    let mut marks: HashMap<SubjectId, Mark> = HashMap::new();

    marks.insert(subject, Mark::InProgress);
    let mut stack = vec![Frame {
        node: subject,
        prereqs: lookup.prerequisites_of(subject),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.prereqs.len() {
            let child = frame.prereqs[frame.next];
            frame.next += 1;
            match marks.get(&child) {
                Some(Mark::InProgress) => return Err(EngineError::CycleDetected(child)),
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child, Mark::InProgress);
                    stack.push(Frame {
                        node: child,
                        prereqs: lookup.prerequisites_of(child),
                        next: 0,
                    });
                }
            }
        } else {
            let done = stack.pop().map(|f| f.node);
            if let Some(node) = done {
                marks.insert(node, Mark::Done);
                if node != subject {
                    order.push(node);
                }
            }
        }
    }

    Ok(order)
}

/// Owned adjacency structure with gated mutation. Hosts that keep the edge
/// set in their relational store can skip this and call the free functions on
/// a snapshot instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrerequisiteGraph {
    edges: HashMap<SubjectId, BTreeSet<SubjectId>>,
}

impl PrerequisiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one edge, rejecting self-loops and anything that would make the
    /// graph cyclic.
    pub fn add_edge(
        &mut self,
        subject: SubjectId,
        prerequisite: SubjectId,
    ) -> Result<(), EngineError> {
        if subject == prerequisite {
            return Err(EngineError::SelfPrerequisite(subject));
        }
        if would_create_cycle(subject, prerequisite, self) {
            return Err(EngineError::CycleDetected(subject));
        }
        self.edges.entry(subject).or_default().insert(prerequisite);
        Ok(())
    }

    /// Bulk insertion, all-or-nothing: on the first rejected edge the graph
    /// is left untouched.
    pub fn add_edges(
        &mut self,
        edges: impl IntoIterator<Item = (SubjectId, SubjectId)>,
    ) -> Result<(), EngineError> {
        let mut scratch = self.clone();
        for (subject, prerequisite) in edges {
            scratch.add_edge(subject, prerequisite)?;
        }
        *self = scratch;
        Ok(())
    }

    /// Remove one edge. Returns whether it existed. Edges are never mutated
    /// in place; an update is remove + add.
    pub fn remove_edge(&mut self, subject: SubjectId, prerequisite: SubjectId) -> bool {
        match self.edges.get_mut(&subject) {
            Some(set) => {
                let removed = set.remove(&prerequisite);
                if set.is_empty() {
                    self.edges.remove(&subject);
                }
                removed
            }
            None => false,
        }
    }

    pub fn direct_prerequisites(&self, subject: SubjectId) -> Vec<SubjectId> {
        self.prerequisites_of(subject)
    }

    pub fn chain(&self, subject: SubjectId) -> Result<Vec<SubjectId>, EngineError> {
        resolve_chain(subject, self)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|s| s.len()).sum()
    }
}

impl PrerequisiteLookup for PrerequisiteGraph {
    fn prerequisites_of(&self, subject: SubjectId) -> Vec<SubjectId> {
        self.edges
            .get(&subject)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}
