//! Read API of the LMDB policy store and its [`PolicySource`] implementation

use heed::RoTxn;
use num_bigint::BigUint;

use crate::changeset::ChangeSet;
use crate::db::{decode_value, read, Dbs};
use crate::error::{err, CalcError, Result};
use crate::keys::{parse_policy_key, policy_key, target_key};
use crate::model::{EntityRef, PolicyRecord, TargetRef};
use crate::resolve::PolicySource;
use crate::tx::transact;

fn record(key: &[u8], value: &[u8]) -> Result<PolicyRecord> {
    let (target, entity) =
        parse_policy_key(key).ok_or_else(|| CalcError::Store("malformed policy key".into()))?;
    let (id, permission) = decode_value(value)?;
    Ok(PolicyRecord::granted(Some(id), entity, target, permission))
}

fn list_target(d: &Dbs, tx: &RoTxn, target: &TargetRef) -> Result<Vec<PolicyRecord>> {
    let mut r = Vec::new();
    for item in d.policies.prefix_iter(tx, &target_key(target)[..]).map_err(err)? {
        let (k, v) = item.map_err(err)?;
        r.push(record(k, v)?);
    }
    Ok(r)
}

pub fn get_policy(target: &TargetRef, entity: &EntityRef) -> Result<Option<PolicyRecord>> {
    read(|d, tx| {
        let k = policy_key(target, entity);
        match d.policies.get(tx, &k[..]).map_err(err)? {
            Some(v) => Ok(Some(record(&k, v)?)),
            None => Ok(None),
        }
    })
}

pub fn get_policy_by_id(id: u64) -> Result<Option<PolicyRecord>> {
    read(|d, tx| {
        let Some(k) = d.ids.get(tx, &id).map_err(err)? else { return Ok(None) };
        match d.policies.get(tx, k).map_err(err)? {
            Some(v) => Ok(Some(record(k, v)?)),
            None => Ok(None),
        }
    })
}

/// Every stored policy on `target` (sentinels excluded)
pub fn list_for_target(target: &TargetRef) -> Result<Vec<PolicyRecord>> {
    read(|d, tx| list_target(d, tx, target))
}

pub fn is_hidden(target: &TargetRef) -> Result<bool> {
    read(|d, tx| Ok(d.hidden.get(tx, &target_key(target)[..]).map_err(err)?.is_some()))
}

pub fn put_policy(entity: &EntityRef, target: &TargetRef, permission: &BigUint) -> Result<u64> {
    transact(|tx| tx.put_policy(entity, target, permission))
}

pub fn delete_policy(id: u64) -> Result<bool> {
    transact(|tx| tx.delete_policy(id))
}

pub fn hide_target(target: &TargetRef) -> Result<()> {
    transact(|tx| tx.hide_target(target))
}

pub fn unhide_target(target: &TargetRef) -> Result<bool> {
    transact(|tx| tx.unhide_target(target))
}

/// Apply a change set atomically; returns ids assigned to its creates
pub fn apply_change_set(changes: &ChangeSet) -> Result<Vec<u64>> {
    transact(|tx| tx.apply(changes))
}

/// The global LMDB store as a policy source
#[derive(Debug, Clone, Copy, Default)]
pub struct Store;

impl PolicySource for Store {
    fn policies_for(&self, targets: &[TargetRef]) -> Result<Vec<PolicyRecord>> {
        read(|d, tx| {
            let mut out = Vec::new();
            for t in targets {
                if d.hidden.get(tx, &target_key(t)[..]).map_err(err)?.is_some() {
                    out.push(PolicyRecord::no_access(*t));
                    continue;
                }
                out.extend(list_target(d, tx, t)?);
            }
            Ok(out)
        })
    }
}
