//! Change-set classification and commit tests

use policycalc::*;

fn plane(s: &str) -> Plane {
    s.parse().unwrap()
}

/// project 1 -> version 2; a multi-plane policy for user 7 on the project
fn calculator() -> PermissionCalculator {
    let chain = TargetChain::from_targets(&[TargetRef::project(1), TargetRef::version(2)]).unwrap();
    let entities = [EntityRef::group(3), EntityRef::user(7)];
    let policies = vec![
        PolicyRecord::granted(Some(40), EntityRef::user(7), TargetRef::project(1), 0xAA_0F_01u32),
        PolicyRecord::granted(Some(41), EntityRef::group(3), TargetRef::version(2), 0x0103u32),
    ];
    PermissionCalculator::build(&policies, chain, &entities)
}

#[test]
fn test_unmodified_is_empty() {
    let cs = calculator().compute_change_set().unwrap();
    assert!(cs.create.is_empty());
    assert!(cs.update.is_empty());
    assert!(cs.delete.is_empty());
    assert!(cs.is_empty());
    assert_eq!(cs.len(), 0);
}

#[test]
fn test_update_preserves_sibling_planes() {
    let mut calc = calculator();
    let p = TargetRef::project(1);
    let u = EntityRef::user(7);
    assert_eq!(calc.view(&p, &u).unwrap().bits, plane("00001111"));

    calc.set_bit(&p, &u, 7, true).unwrap();
    let cs = calc.compute_change_set().unwrap();
    assert_eq!(cs.update.len(), 1);
    assert!(cs.create.is_empty() && cs.delete.is_empty());

    let ch = &cs.update[0];
    assert_eq!(ch.policy_id, Some(40));
    assert_eq!(ch.bit_shift, 8);
    assert_eq!(ch.plane, plane("10001111"));
    // Only the project plane [8:15] changes
    assert_eq!(ch.permission, Some(BigUint::from(0xAA_8F_01u32)));
}

#[test]
fn test_create_from_unknown() {
    let mut calc = calculator();
    let v = TargetRef::version(2);
    let u = EntityRef::user(7);

    calc.set_bit(&v, &u, 0, true).unwrap();
    calc.set_bit(&v, &u, 1, true).unwrap();
    let cs = calc.compute_change_set().unwrap();
    assert_eq!(cs.create.len(), 1);
    let ch = &cs.create[0];
    assert_eq!(ch.policy_id, None);
    assert_eq!(ch.plane, plane("------11"));
    assert_eq!(ch.permission, Some(BigUint::from(0x03u32)));
}

#[test]
fn test_create_on_parent_level_is_shifted() {
    let mut calc = calculator();
    calc.grant_row(&TargetRef::project(1), &EntityRef::group(3)).unwrap();
    let cs = calc.compute_change_set().unwrap();
    assert_eq!(cs.create.len(), 1);
    assert_eq!(cs.create[0].permission, Some(BigUint::from(0xFF00u32)));
}

#[test]
fn test_delete_on_revoke() {
    let mut calc = calculator();
    calc.revoke_row(&TargetRef::version(2), &EntityRef::group(3)).unwrap();
    let cs = calc.compute_change_set().unwrap();
    assert_eq!(cs.delete.len(), 1);
    assert_eq!(cs.delete[0].policy_id, Some(41));
    assert_eq!(cs.delete[0].permission, None);
    assert!(cs.create.is_empty() && cs.update.is_empty());
}

#[test]
fn test_grant_then_revoke_new_cell_is_noop() {
    let mut calc = calculator();
    let p = TargetRef::project(1);
    let g = EntityRef::group(3);
    calc.grant_row(&p, &g).unwrap();
    calc.revoke_row(&p, &g).unwrap();
    assert!(calc.compute_change_set().unwrap().is_empty());
}

#[test]
fn test_mixed_change_set() {
    let mut calc = calculator();
    calc.grant_row(&TargetRef::project(1), &EntityRef::group(3)).unwrap();
    calc.set_bit(&TargetRef::project(1), &EntityRef::user(7), 0, false).unwrap();
    calc.revoke_row(&TargetRef::version(2), &EntityRef::group(3)).unwrap();
    let cs = calc.compute_change_set().unwrap();
    assert_eq!((cs.create.len(), cs.update.len(), cs.delete.len()), (1, 1, 1));
    assert_eq!(cs.len(), 3);
}

#[test]
fn test_commit_rebaselines() {
    let mut calc = calculator();
    let p = TargetRef::project(1);
    let g = EntityRef::group(3);
    let u = EntityRef::user(7);
    calc.grant_row(&p, &g).unwrap();
    calc.set_bit(&p, &u, 7, true).unwrap();
    calc.revoke_row(&TargetRef::version(2), &g).unwrap();

    let cs = calc.compute_change_set().unwrap();
    calc.commit(&cs, &[77]).unwrap();

    assert!(!calc.is_dirty());
    assert!(calc.compute_change_set().unwrap().is_empty());

    let created = calc.view(&p, &g).unwrap();
    assert_eq!(created.policy_id, Some(77));
    assert_eq!(created.original_bits, Plane::FULL);
    assert_eq!(created.raw_permission, Some(BigUint::from(0xFF00u32)));

    let updated = calc.view(&p, &u).unwrap();
    assert_eq!(updated.raw_permission, Some(BigUint::from(0xAA_8F_01u32)));

    let deleted = calc.view(&TargetRef::version(2), &g).unwrap();
    assert_eq!(deleted.policy_id, None);
    assert_eq!(deleted.original_bits, Plane::UNKNOWN);

    // Resetting after commit keeps the committed state
    calc.reset_all();
    assert_eq!(calc.view(&p, &g).unwrap().bits, Plane::FULL);
}

#[test]
fn test_commit_keeps_later_edits_pending() {
    let mut calc = calculator();
    let p = TargetRef::project(1);
    let u = EntityRef::user(7);
    calc.set_bit(&p, &u, 7, true).unwrap();
    let cs = calc.compute_change_set().unwrap();
    calc.set_bit(&p, &u, 6, true).unwrap();
    calc.commit(&cs, &[]).unwrap();

    assert!(calc.is_dirty());
    let pending = calc.compute_change_set().unwrap();
    assert_eq!(pending.update.len(), 1);
    assert_eq!(pending.update[0].permission, Some(BigUint::from(0xAA_CF_01u32)));
}

#[test]
fn test_commit_unknown_cell() {
    let mut calc = calculator();
    let mut cs = ChangeSet::default();
    cs.update.push(PolicyChange {
        policy_id: Some(1),
        entity: EntityRef::user(99),
        target: TargetRef::project(1),
        bit_shift: 8,
        plane: Plane::FULL,
        permission: Some(BigUint::from(0xFF00u32)),
    });
    assert!(matches!(calc.commit(&cs, &[]), Err(CalcError::UnknownCell { .. })));
}

#[test]
fn test_failed_commit_leaves_state_intact() {
    let mut calc = calculator();
    let p = TargetRef::project(1);
    let u = EntityRef::user(7);
    calc.grant_row(&p, &u).unwrap();
    let mut cs = calc.compute_change_set().unwrap();
    cs.update.push(PolicyChange {
        policy_id: Some(1),
        entity: EntityRef::user(99),
        target: p,
        bit_shift: 8,
        plane: Plane::FULL,
        permission: Some(BigUint::from(0xFF00u32)),
    });

    assert!(matches!(calc.commit(&cs, &[5]), Err(CalcError::UnknownCell { .. })));
    assert!(calc.is_dirty());
    let v = calc.view(&p, &u).unwrap();
    assert_eq!(v.policy_id, Some(40));
    assert_eq!(v.original_bits, plane("00001111"));
    assert_eq!(v.raw_permission, Some(BigUint::from(0xAA_0F_01u32)));
    assert_eq!(calc.compute_change_set().unwrap().update.len(), 1);
}

#[test]
fn test_json_keeps_wide_permissions() {
    let u = EntityRef::user(7);
    let p = TargetRef::project(1);
    let wide = BigUint::from(0x01u8) << 100usize;
    let chain = TargetChain::from_targets(&[p]).unwrap();
    let mut calc = PermissionCalculator::build(&[PolicyRecord::granted(Some(5), u, p, wide.clone())], chain, &[u]);
    calc.set_bit(&p, &u, 0, true).unwrap();

    let cs = calc.compute_change_set().unwrap();
    let json = cs.to_json().unwrap();
    assert!(json.contains("\"00000001\""));
    assert!(json.contains(&(wide.clone() + 1u32).to_string()));

    let back = ChangeSet::from_json(&json).unwrap();
    assert_eq!(back, cs);
}
