//! Policy operations a persistence layer must issue after edits

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{CalcError, Result};
use crate::model::{decimal, EntityRef, TargetRef};
use crate::plane::Plane;

/// One create, update or delete against the policy store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyChange {
    pub policy_id: Option<u64>,
    pub entity: EntityRef,
    pub target: TargetRef,
    pub bit_shift: u32,
    /// Edited plane at `bit_shift`
    pub plane: Plane,
    /// Full permission to store; `None` for deletes
    #[serde(with = "decimal", default)]
    pub permission: Option<BigUint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub create: Vec<PolicyChange>,
    pub update: Vec<PolicyChange>,
    pub delete: Vec<PolicyChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CalcError::Encoding(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| CalcError::Encoding(e.to_string()))
    }
}
