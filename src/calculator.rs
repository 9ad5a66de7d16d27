//! Effective-permission calculator
//!
//! Builds one [`PermissionView`] per (target, entity) pair from stored
//! policies, ORs them per target and takes the leaf target's result as the
//! final permission. Edits recombine only the target they touch.

use num_bigint::BigUint;
use tracing::{debug, warn};

use crate::changeset::{ChangeSet, PolicyChange};
use crate::error::{CalcError, Result};
use crate::model::{EntityRef, Permission, PolicyRecord, TargetChain, TargetLevel, TargetRef};
use crate::plane::{extract_plane, inject_plane, or_planes, Plane};
use crate::resolve::{EntityExpander, PolicySource, TargetResolver};

/// One entity's plane on one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionView {
    pub target: TargetRef,
    pub entity: EntityRef,
    pub bit_shift: u32,
    pub policy_id: Option<u64>,
    /// Full stored permission the plane was taken from
    pub raw_permission: Option<BigUint>,
    pub bits: Plane,
    /// Snapshot taken at load or last commit
    pub original_bits: Plane,
    /// Forced `0-------` because ACLs on the target are not visible
    pub no_access: bool,
}

impl PermissionView {
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.bits != self.original_bits
    }
}

#[derive(Debug, Clone)]
struct TargetRow {
    level: TargetLevel,
    no_access: bool,
    cells: Vec<PermissionView>,
    combined: Plane,
}

impl TargetRow {
    fn combine(&mut self) {
        // ALL-entity denial masks every entity on the target
        self.combined = match self.cells.first() {
            Some(c) if self.no_access || (c.no_access && c.bits == Plane::NO_ACCESS) => Plane::NO_ACCESS,
            _ => or_planes(&self.cells.iter().map(|c| c.bits).collect::<Vec<_>>()),
        };
    }
}

#[derive(Debug, Clone)]
pub struct PermissionCalculator {
    chain: TargetChain,
    entities: Vec<EntityRef>,
    rows: Vec<TargetRow>,
    final_result: Plane,
}

impl PermissionCalculator {
    /// Build views for every (target, entity) pair in `chain` x `entities`.
    ///
    /// Records for targets outside the chain are ignored. Duplicate entities
    /// keep their first position.
    pub fn build(policies: &[PolicyRecord], chain: TargetChain, entities: &[EntityRef]) -> Self {
        let mut uniq: Vec<EntityRef> = Vec::with_capacity(entities.len());
        for e in entities {
            if !uniq.contains(e) {
                uniq.push(*e);
            }
        }

        let rows = chain
            .levels()
            .iter()
            .map(|level| build_row(policies, level, &uniq))
            .collect();

        let mut calc = PermissionCalculator {
            chain,
            entities: uniq,
            rows,
            final_result: Plane::UNKNOWN,
        };
        for row in &mut calc.rows {
            row.combine();
        }
        calc.finalize();
        debug!(
            targets = calc.rows.len(),
            entities = calc.entities.len(),
            final_result = %calc.final_result,
            "built permission calculator"
        );
        calc
    }

    /// Resolve the chain, expand the entity, fetch policies and build.
    pub fn load<R, E, S>(resolver: &R, expander: &E, source: &S, leaf: &TargetRef, entity: &EntityRef) -> Result<Self>
    where
        R: TargetResolver + ?Sized,
        E: EntityExpander + ?Sized,
        S: PolicySource + ?Sized,
    {
        let chain = resolver.resolve_chain(leaf)?;
        let entities = expander.expand(entity);
        let policies = source.policies_for(&chain.targets())?;
        Ok(Self::build(&policies, chain, &entities))
    }

    fn finalize(&mut self) {
        // Chain is never empty
        if let Some(leaf) = self.rows.last() {
            self.final_result = leaf.combined;
        }
    }

    fn row_index(&self, target: &TargetRef) -> Option<usize> {
        self.rows.iter().position(|r| r.level.target == *target)
    }

    fn locate(&self, target: &TargetRef, entity: &EntityRef) -> Result<(usize, usize)> {
        let unknown = || CalcError::UnknownCell { target: *target, entity: *entity };
        let r = self.row_index(target).ok_or_else(unknown)?;
        let c = self.rows[r].cells.iter().position(|c| c.entity == *entity).ok_or_else(unknown)?;
        Ok((r, c))
    }

    /// Replace one cell's bits and recombine its target
    fn edit<F>(&mut self, target: &TargetRef, entity: &EntityRef, f: F) -> Result<()>
    where
        F: FnOnce(&PermissionView) -> Result<Plane>,
    {
        let (r, c) = self.locate(target, entity)?;
        let row = &mut self.rows[r];
        if row.no_access || row.cells[c].no_access {
            warn!(policy_target = %target, %entity, "edit rejected: no ACL visibility");
            return Err(CalcError::NoVisibility { target: *target, entity: *entity });
        }
        let bits = f(&row.cells[c])?;
        row.cells[c].bits = bits;
        row.combine();
        debug!(policy_target = %target, %entity, %bits, combined = %row.combined, "recombined target");
        self.finalize();
        Ok(())
    }

    /// Set one bit (0 = EXIST ... 7 = ACL) of a cell
    pub fn set_bit(&mut self, target: &TargetRef, entity: &EntityRef, bit_index: usize, value: bool) -> Result<()> {
        self.edit(target, entity, |v| v.bits.with_bit(bit_index, value))
    }

    pub fn reset_row(&mut self, target: &TargetRef, entity: &EntityRef) -> Result<()> {
        self.edit(target, entity, |v| Ok(v.original_bits))
    }

    pub fn grant_row(&mut self, target: &TargetRef, entity: &EntityRef) -> Result<()> {
        self.edit(target, entity, |_| Ok(Plane::FULL))
    }

    /// Remove the policy entirely (`--------`), which is not the same as denying
    pub fn revoke_row(&mut self, target: &TargetRef, entity: &EntityRef) -> Result<()> {
        self.edit(target, entity, |_| Ok(Plane::UNKNOWN))
    }

    /// Reset every cell, recombining each target once
    pub fn reset_all(&mut self) {
        for row in &mut self.rows {
            let mut touched = false;
            for cell in &mut row.cells {
                if cell.is_edited() {
                    cell.bits = cell.original_bits;
                    touched = true;
                }
            }
            if touched {
                row.combine();
            }
        }
        self.finalize();
        debug!(final_result = %self.final_result, "reset all cells");
    }

    /// Classify every edited cell into the store operations it requires.
    pub fn compute_change_set(&self) -> Result<ChangeSet> {
        let mut out = ChangeSet::default();
        for cell in self.views().filter(|c| c.is_edited()) {
            let mut change = PolicyChange {
                policy_id: cell.policy_id,
                entity: cell.entity,
                target: cell.target,
                bit_shift: cell.bit_shift,
                plane: cell.bits,
                permission: None,
            };
            if cell.original_bits.is_unknown() {
                let base = cell.raw_permission.clone().unwrap_or_default();
                change.permission = Some(inject_plane(&base, cell.bit_shift, &cell.bits)?);
                out.create.push(change);
            } else if cell.bits.is_unknown() {
                out.delete.push(change);
            } else {
                let base = cell.raw_permission.clone().unwrap_or_default();
                change.permission = Some(inject_plane(&base, cell.bit_shift, &cell.bits)?);
                out.update.push(change);
            }
        }
        Ok(out)
    }

    /// Re-baseline cells after `changes` was saved.
    ///
    /// `created_ids` are the ids the store assigned to `changes.create`, in
    /// order. The saved plane becomes the cell's original; later edits stay
    /// pending.
    pub fn commit(&mut self, changes: &ChangeSet, created_ids: &[u64]) -> Result<()> {
        // Resolve every cell before mutating any
        let locate_all = |list: &[PolicyChange]| -> Result<Vec<(usize, usize)>> {
            list.iter().map(|ch| self.locate(&ch.target, &ch.entity)).collect()
        };
        let created = locate_all(&changes.create)?;
        let updated = locate_all(&changes.update)?;
        let deleted = locate_all(&changes.delete)?;

        for (i, (ch, (r, c))) in changes.create.iter().zip(created).enumerate() {
            let cell = &mut self.rows[r].cells[c];
            cell.policy_id = created_ids.get(i).copied().or(ch.policy_id);
            cell.raw_permission = ch.permission.clone();
            cell.original_bits = ch.plane;
        }
        for (ch, (r, c)) in changes.update.iter().zip(updated) {
            let cell = &mut self.rows[r].cells[c];
            cell.raw_permission = ch.permission.clone();
            cell.original_bits = ch.plane;
        }
        for (r, c) in deleted {
            let cell = &mut self.rows[r].cells[c];
            cell.policy_id = None;
            cell.raw_permission = None;
            cell.original_bits = Plane::UNKNOWN;
        }
        debug!(changes = changes.len(), "committed change set");
        Ok(())
    }

    pub fn chain(&self) -> &TargetChain {
        &self.chain
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn view(&self, target: &TargetRef, entity: &EntityRef) -> Option<&PermissionView> {
        let (r, c) = self.locate(target, entity).ok()?;
        Some(&self.rows[r].cells[c])
    }

    /// All views, root target first, entities in build order
    pub fn views(&self) -> impl Iterator<Item = &PermissionView> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }

    pub fn combined(&self, target: &TargetRef) -> Option<Plane> {
        self.row_index(target).map(|r| self.rows[r].combined)
    }

    pub fn combined_views(&self) -> Vec<(TargetRef, Plane)> {
        self.rows.iter().map(|r| (r.level.target, r.combined)).collect()
    }

    /// Effective permission: the leaf target's combined view
    pub fn final_result(&self) -> Plane {
        self.final_result
    }

    /// False when the caller cannot see ACLs on `target` (or it is unknown)
    pub fn can_operate(&self, target: &TargetRef) -> bool {
        self.row_index(target)
            .map(|r| !self.rows[r].no_access && !self.rows[r].cells.iter().any(|c| c.no_access))
            .unwrap_or(false)
    }

    pub fn is_dirty(&self) -> bool {
        self.views().any(|v| v.is_edited())
    }
}

fn build_row(policies: &[PolicyRecord], level: &TargetLevel, entities: &[EntityRef]) -> TargetRow {
    let target = level.target;
    let hidden = policies
        .iter()
        .any(|p| p.target == target && p.is_no_access_sentinel());

    let cells = entities
        .iter()
        .map(|entity| {
            let mut view = PermissionView {
                target,
                entity: *entity,
                bit_shift: level.bit_shift,
                policy_id: None,
                raw_permission: None,
                bits: Plane::UNKNOWN,
                original_bits: Plane::UNKNOWN,
                no_access: hidden,
            };
            if hidden {
                view.bits = Plane::NO_ACCESS;
            } else if let Some(rec) = policies.iter().find(|p| p.matches(entity, &target)) {
                view.policy_id = rec.id;
                match &rec.permission {
                    Permission::Granted(value) => {
                        // Shift is validated by the chain
                        view.bits = extract_plane(value, level.bit_shift).unwrap_or(Plane::UNKNOWN);
                        view.raw_permission = Some(value.clone());
                    }
                    Permission::NoAccess => {
                        view.bits = Plane::NO_ACCESS;
                        view.no_access = true;
                    }
                }
            }
            view.original_bits = view.bits;
            view
        })
        .collect();

    TargetRow { level: *level, no_access: hidden, cells, combined: Plane::UNKNOWN }
}
