//! Collaborator seams: target-chain resolution, entity expansion, policy lookup
//!
//! The calculator only consumes already-resolved values. These traits name
//! what it expects from whoever fetches them; [`Hierarchy`] is an in-memory
//! implementation of the first two.

use std::collections::{BTreeSet, HashMap};

use crate::constants::MAX_HIERARCHY_DEPTH;
use crate::error::{CalcError, Result};
use crate::model::{EntityKind, EntityRef, PolicyRecord, TargetChain, TargetRef};

pub trait TargetResolver {
    /// Root-to-leaf chain ending at `leaf`, with shifts assigned
    fn resolve_chain(&self, leaf: &TargetRef) -> Result<TargetChain>;
}

pub trait EntityExpander {
    /// `entity` plus every ancestor whose policies also apply to it
    fn expand(&self, entity: &EntityRef) -> Vec<EntityRef>;
}

pub trait PolicySource {
    /// Every record on any of `targets`, including visibility sentinels
    fn policies_for(&self, targets: &[TargetRef]) -> Result<Vec<PolicyRecord>>;
}

impl PolicySource for [PolicyRecord] {
    fn policies_for(&self, targets: &[TargetRef]) -> Result<Vec<PolicyRecord>> {
        Ok(self.iter().filter(|p| targets.contains(&p.target)).cloned().collect())
    }
}

impl PolicySource for Vec<PolicyRecord> {
    fn policies_for(&self, targets: &[TargetRef]) -> Result<Vec<PolicyRecord>> {
        self.as_slice().policies_for(targets)
    }
}

/// Target containment and entity membership held in memory
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    targets: BTreeSet<TargetRef>,
    parents: HashMap<TargetRef, TargetRef>,
    user_groups: HashMap<u64, BTreeSet<u64>>,
    user_orgs: HashMap<u64, BTreeSet<u64>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: TargetRef) -> &mut Self {
        self.targets.insert(target);
        self
    }

    /// Register `child` under `parent` (e.g. section under project)
    pub fn add_child(&mut self, parent: TargetRef, child: TargetRef) -> Result<&mut Self> {
        if parent == child {
            return Err(CalcError::InvalidChain("Cannot reference self".into()));
        }
        if let Some(existing) = self.parents.get(&child) {
            if *existing != parent {
                return Err(CalcError::InvalidChain(format!("{} is already under {}", child, existing)));
            }
        }
        let mut cur = parent;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match self.parents.get(&cur) {
                Some(p) if *p == child => return Err(CalcError::InvalidChain("Circular reference".into())),
                Some(p) => cur = *p,
                None => break,
            }
        }
        self.targets.insert(parent);
        self.targets.insert(child);
        self.parents.insert(child, parent);
        Ok(self)
    }

    pub fn add_group_member(&mut self, group: u64, user: u64) -> &mut Self {
        self.user_groups.entry(user).or_default().insert(group);
        self
    }

    pub fn add_organization_member(&mut self, organization: u64, user: u64) -> &mut Self {
        self.user_orgs.entry(user).or_default().insert(organization);
        self
    }
}

impl TargetResolver for Hierarchy {
    fn resolve_chain(&self, leaf: &TargetRef) -> Result<TargetChain> {
        if !self.targets.contains(leaf) {
            return Err(CalcError::UnresolvedTarget(*leaf));
        }
        let mut path = vec![*leaf];
        let mut cur = *leaf;
        while let Some(p) = self.parents.get(&cur) {
            if path.len() > MAX_HIERARCHY_DEPTH {
                return Err(CalcError::InvalidChain(format!("{} exceeds max depth", leaf)));
            }
            path.push(*p);
            cur = *p;
        }
        path.reverse();
        TargetChain::from_targets(&path)
    }
}

impl EntityExpander for Hierarchy {
    /// Users expand to organizations, then groups, then themselves.
    /// Groups and organizations stand alone.
    fn expand(&self, entity: &EntityRef) -> Vec<EntityRef> {
        match entity.kind {
            EntityKind::User => {
                let mut out: Vec<EntityRef> = self
                    .user_orgs
                    .get(&entity.id)
                    .into_iter()
                    .flatten()
                    .map(|o| EntityRef::organization(*o))
                    .collect();
                out.extend(self.user_groups.get(&entity.id).into_iter().flatten().map(|g| EntityRef::group(*g)));
                out.push(*entity);
                out
            }
            EntityKind::Group | EntityKind::Organization => vec![*entity],
        }
    }
}
