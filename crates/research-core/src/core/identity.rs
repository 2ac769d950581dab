// crates/research-core/src/core/identity.rs
// ============================================================================
// Module: Executive Identity Graph
// Description: Union-find over executive prospects with negative edges.
// Purpose: Resolve merge decisions into deterministic canonical identities.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Executives within a run form a forest under union-find with path
//! compression and union by rank. `mark_same` decisions union two members;
//! `keep_separate` decisions record a negative edge that no later union may
//! violate. The canonical member of a component is deterministic: earliest
//! `created_at`, then lowest id. The forest is rebuilt from the decision log
//! once per batch, so replays always converge on the same components.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::executive::VerificationStatus;
use crate::core::identifiers::ExecutiveId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by identity-forest mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The executive is not registered in the forest.
    #[error("unknown executive {0}")]
    UnknownExecutive(ExecutiveId),
    /// A union would violate a keep-separate decision.
    #[error("executives {left} and {right} are marked keep-separate")]
    SeparationViolated {
        /// One side of the separated pair.
        left: ExecutiveId,
        /// Other side of the separated pair.
        right: ExecutiveId,
    },
}

// ============================================================================
// SECTION: Identity Forest
// ============================================================================

/// Union-find forest over the executives of one run.
#[derive(Debug, Clone, Default)]
pub struct IdentityForest {
    /// Parent pointer per member index.
    parent: Vec<usize>,
    /// Union-by-rank counter per root index.
    rank: Vec<u32>,
    /// Creation time per member, for canonical selection.
    created_at: Vec<Timestamp>,
    /// Executive id per member index.
    ids: Vec<ExecutiveId>,
    /// Member index per executive id.
    index: BTreeMap<ExecutiveId, usize>,
    /// Negative edges recorded by keep-separate decisions.
    separated: BTreeSet<(ExecutiveId, ExecutiveId)>,
}

impl IdentityForest {
    /// Creates an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an executive as its own singleton component.
    ///
    /// Registering an already-known executive is a no-op.
    pub fn insert(&mut self, id: ExecutiveId, created_at: Timestamp) {
        if self.index.contains_key(&id) {
            return;
        }
        let slot = self.ids.len();
        self.parent.push(slot);
        self.rank.push(0);
        self.created_at.push(created_at);
        self.ids.push(id);
        self.index.insert(id, slot);
    }

    /// Returns the number of registered executives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true when no executives are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Records a keep-separate decision between two executives.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownExecutive`] for unregistered ids and
    /// [`IdentityError::SeparationViolated`] when the pair is already in one
    /// component.
    pub fn keep_separate(
        &mut self,
        left: ExecutiveId,
        right: ExecutiveId,
    ) -> Result<(), IdentityError> {
        let left_slot = self.slot_of(left)?;
        let right_slot = self.slot_of(right)?;
        if self.find(left_slot) == self.find(right_slot) && left != right {
            return Err(IdentityError::SeparationViolated { left, right });
        }
        self.separated.insert(ordered_pair(left, right));
        Ok(())
    }

    /// Returns true when the pair carries a keep-separate edge.
    #[must_use]
    pub fn is_separated(&self, left: ExecutiveId, right: ExecutiveId) -> bool {
        self.separated.contains(&ordered_pair(left, right))
    }

    /// Unions two executives into one component.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownExecutive`] for unregistered ids and
    /// [`IdentityError::SeparationViolated`] when any member pair across the
    /// two components carries a keep-separate edge.
    pub fn mark_same(
        &mut self,
        left: ExecutiveId,
        right: ExecutiveId,
    ) -> Result<(), IdentityError> {
        let left_slot = self.slot_of(left)?;
        let right_slot = self.slot_of(right)?;
        let left_root = self.find(left_slot);
        let right_root = self.find(right_slot);
        if left_root == right_root {
            return Ok(());
        }

        let left_members = self.members_of_root(left_root);
        let right_members = self.members_of_root(right_root);
        for a in &left_members {
            for b in &right_members {
                if self.separated.contains(&ordered_pair(*a, *b)) {
                    return Err(IdentityError::SeparationViolated { left: *a, right: *b });
                }
            }
        }

        if self.rank[left_root] < self.rank[right_root] {
            self.parent[left_root] = right_root;
        } else if self.rank[left_root] > self.rank[right_root] {
            self.parent[right_root] = left_root;
        } else {
            self.parent[right_root] = left_root;
            self.rank[left_root] += 1;
        }
        Ok(())
    }

    /// Resolves an executive to the canonical member of its component.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownExecutive`] for unregistered ids.
    pub fn canonical_of(&mut self, id: ExecutiveId) -> Result<ExecutiveId, IdentityError> {
        let slot = self.slot_of(id)?;
        let root = self.find(slot);
        Ok(self.canonical_in_root(root))
    }

    /// Returns all members of the component containing `id`, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::UnknownExecutive`] for unregistered ids.
    pub fn component_of(&mut self, id: ExecutiveId) -> Result<Vec<ExecutiveId>, IdentityError> {
        let slot = self.slot_of(id)?;
        let root = self.find(slot);
        let mut members = self.members_of_root(root);
        members.sort_unstable();
        Ok(members)
    }

    /// Returns the resolution map: every member paired with its canonical.
    ///
    /// Entries are sorted by member id, so the map renders deterministically.
    #[must_use]
    pub fn resolution_map(&mut self) -> Vec<(ExecutiveId, ExecutiveId)> {
        let mut entries = Vec::with_capacity(self.ids.len());
        for slot in 0..self.ids.len() {
            let root = self.find(slot);
            entries.push((self.ids[slot], self.canonical_in_root(root)));
        }
        entries.sort_unstable_by_key(|(member, _)| *member);
        entries
    }

    /// Returns the verification status a component presents: the maximum
    /// across its members.
    #[must_use]
    pub fn component_verification(
        &mut self,
        statuses: &BTreeMap<ExecutiveId, VerificationStatus>,
    ) -> BTreeMap<ExecutiveId, VerificationStatus> {
        let mut per_root: BTreeMap<usize, VerificationStatus> = BTreeMap::new();
        for slot in 0..self.ids.len() {
            let root = self.find(slot);
            let status = statuses
                .get(&self.ids[slot])
                .copied()
                .unwrap_or(VerificationStatus::Unverified);
            per_root
                .entry(root)
                .and_modify(|current| {
                    if status > *current {
                        *current = status;
                    }
                })
                .or_insert(status);
        }
        let mut out = BTreeMap::new();
        for slot in 0..self.ids.len() {
            let root = self.find(slot);
            if let Some(status) = per_root.get(&root) {
                out.insert(self.ids[slot], *status);
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    /// Returns the slot of an executive id.
    fn slot_of(&self, id: ExecutiveId) -> Result<usize, IdentityError> {
        self.index.get(&id).copied().ok_or(IdentityError::UnknownExecutive(id))
    }

    /// Finds the root of a slot with path compression.
    fn find(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cursor = slot;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    /// Collects the member ids under a root.
    fn members_of_root(&mut self, root: usize) -> Vec<ExecutiveId> {
        let mut members = Vec::new();
        for slot in 0..self.ids.len() {
            if self.find(slot) == root {
                members.push(self.ids[slot]);
            }
        }
        members
    }

    /// Picks the canonical member under a root: earliest created_at, then
    /// lowest id.
    fn canonical_in_root(&mut self, root: usize) -> ExecutiveId {
        let mut best: Option<(Timestamp, ExecutiveId)> = None;
        for slot in 0..self.ids.len() {
            if self.find(slot) != root {
                continue;
            }
            let key = (self.created_at[slot], self.ids[slot]);
            match best {
                Some(current) if current <= key => {}
                _ => best = Some(key),
            }
        }
        // A root always has at least itself as a member.
        best.map_or(self.ids[root], |(_, id)| id)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Orders a pair of ids so negative edges are direction-free.
fn ordered_pair(a: ExecutiveId, b: ExecutiveId) -> (ExecutiveId, ExecutiveId) {
    if a <= b { (a, b) } else { (b, a) }
}
