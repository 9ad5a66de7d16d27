//! Write transaction wrapper for policy mutations

use heed::RwTxn;
use num_bigint::BigUint;
use tracing::{debug, info};

use crate::changeset::ChangeSet;
use crate::db::{dbs, decode_value, encode_value, env, Dbs};
use crate::error::{err, CalcError, Result};
use crate::keys::{policy_key, target_key};
use crate::model::{EntityRef, TargetRef};

/// Transaction wrapper for batched writes
pub struct Tx {
    txn: RwTxn<'static>,
    dbs: &'static Dbs,
}

impl Tx {
    #[inline]
    pub(crate) fn new() -> Result<Self> {
        Ok(Tx {
            txn: env()?.write_txn().map_err(err)?,
            dbs: dbs()?,
        })
    }

    #[inline]
    pub(crate) fn commit(self) -> Result<()> {
        self.txn.commit().map_err(err)
    }

    fn next_id(&mut self) -> Result<u64> {
        let id = self.dbs.meta.get(&self.txn, "next_id").map_err(err)?.unwrap_or(1);
        self.dbs.meta.put(&mut self.txn, "next_id", &(id + 1)).map_err(err)?;
        Ok(id)
    }

    fn existing_id(&self, key: &[u8]) -> Result<Option<u64>> {
        match self.dbs.policies.get(&self.txn, key).map_err(err)? {
            Some(v) => Ok(Some(decode_value(v)?.0)),
            None => Ok(None),
        }
    }

    /// Store the full permission between `entity` and `target`, replacing any
    /// existing value. Returns the policy id (reused when one exists).
    pub fn put_policy(&mut self, entity: &EntityRef, target: &TargetRef, permission: &BigUint) -> Result<u64> {
        let k = policy_key(target, entity);
        let id = match self.existing_id(&k)? {
            Some(id) => id,
            None => self.next_id()?,
        };
        self.dbs.policies.put(&mut self.txn, &k[..], &encode_value(id, permission)[..]).map_err(err)?;
        self.dbs.ids.put(&mut self.txn, &id, &k[..]).map_err(err)?;
        Ok(id)
    }

    /// Overwrite the permission of an existing policy
    pub fn set_permission(&mut self, id: u64, permission: &BigUint) -> Result<()> {
        let k = self
            .dbs
            .ids
            .get(&self.txn, &id)
            .map_err(err)?
            .map(|k| k.to_vec())
            .ok_or_else(|| CalcError::Store(format!("no policy {}", id)))?;
        self.dbs.policies.put(&mut self.txn, &k[..], &encode_value(id, permission)[..]).map_err(err)
    }

    pub fn delete_policy(&mut self, id: u64) -> Result<bool> {
        let k = match self.dbs.ids.get(&self.txn, &id).map_err(err)? {
            Some(k) => k.to_vec(),
            None => return Ok(false),
        };
        self.dbs.ids.delete(&mut self.txn, &id).map_err(err)?;
        self.dbs.policies.delete(&mut self.txn, &k[..]).map_err(err)
    }

    pub fn delete_between(&mut self, entity: &EntityRef, target: &TargetRef) -> Result<bool> {
        let k = policy_key(target, entity);
        match self.existing_id(&k)? {
            Some(id) => self.delete_policy(id),
            None => Ok(false),
        }
    }

    /// Mark `target` as one whose ACL entries the caller cannot enumerate
    pub fn hide_target(&mut self, target: &TargetRef) -> Result<()> {
        let empty: &[u8] = &[];
        self.dbs.hidden.put(&mut self.txn, &target_key(target)[..], empty).map_err(err)
    }

    pub fn unhide_target(&mut self, target: &TargetRef) -> Result<bool> {
        self.dbs.hidden.delete(&mut self.txn, &target_key(target)[..]).map_err(err)
    }

    /// Apply a calculator change set. Returns ids assigned to creates, in order.
    pub fn apply(&mut self, changes: &ChangeSet) -> Result<Vec<u64>> {
        let mut created = Vec::with_capacity(changes.create.len());
        for ch in &changes.create {
            let perm = ch.permission.clone().unwrap_or_default();
            created.push(self.put_policy(&ch.entity, &ch.target, &perm)?);
        }
        for ch in &changes.update {
            let perm = ch.permission.clone().unwrap_or_default();
            match ch.policy_id {
                Some(id) => self.set_permission(id, &perm)?,
                None => {
                    self.put_policy(&ch.entity, &ch.target, &perm)?;
                }
            }
        }
        for ch in &changes.delete {
            let removed = match ch.policy_id {
                Some(id) => self.delete_policy(id)?,
                None => self.delete_between(&ch.entity, &ch.target)?,
            };
            if !removed {
                debug!(policy_target = %ch.target, entity = %ch.entity, "delete found no policy");
            }
        }
        info!(
            created = changes.create.len(),
            updated = changes.update.len(),
            deleted = changes.delete.len(),
            "applied change set"
        );
        Ok(created)
    }

    pub(crate) fn clear(&mut self) -> Result<()> {
        self.dbs.policies.clear(&mut self.txn).map_err(err)?;
        self.dbs.ids.clear(&mut self.txn).map_err(err)?;
        self.dbs.hidden.clear(&mut self.txn).map_err(err)?;
        self.dbs.meta.clear(&mut self.txn).map_err(err)
    }
}

/// Execute operations in a single transaction
pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(f: F) -> Result<T> {
    let mut tx = Tx::new()?;
    let r = f(&mut tx)?;
    tx.commit()?;
    Ok(r)
}
