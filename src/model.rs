//! Entities, targets, hierarchy chains and stored policy records

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::constants::PLANE_WIDTH;
use crate::error::{CalcError, Result};

/// Who a policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Group,
    Organization,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Organization => "organization",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Group => "Group",
            EntityKind::Organization => "Organization",
        }
    }
}

impl FromStr for EntityKind {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(EntityKind::User),
            "group" => Ok(EntityKind::Group),
            "organization" => Ok(EntityKind::Organization),
            _ => Err(CalcError::Store(format!("unknown entity kind {:?}", s))),
        }
    }
}

/// What a policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Project,
    Section,
    Version,
    Algorithm,
    Media,
    Localization,
    State,
    File,
    TargetOrganization,
    TargetGroup,
    JobCluster,
    Bucket,
    HostedTemplate,
}

impl TargetKind {
    pub const ALL: [TargetKind; 13] = [
        TargetKind::Project,
        TargetKind::Section,
        TargetKind::Version,
        TargetKind::Algorithm,
        TargetKind::Media,
        TargetKind::Localization,
        TargetKind::State,
        TargetKind::File,
        TargetKind::TargetOrganization,
        TargetKind::TargetGroup,
        TargetKind::JobCluster,
        TargetKind::Bucket,
        TargetKind::HostedTemplate,
    ];

    // (tag, label, level count)
    fn row(&self) -> (&'static str, &'static str, Option<u8>) {
        match self {
            TargetKind::Project => ("project", "Project", Some(5)),
            TargetKind::Section => ("section", "Section", Some(3)),
            TargetKind::Version => ("version", "Version", Some(2)),
            TargetKind::Algorithm => ("algorithm", "Algorithm", Some(1)),
            TargetKind::Media => ("media", "Media", None),
            TargetKind::Localization => ("localization", "Localization", None),
            TargetKind::State => ("state", "State", None),
            TargetKind::File => ("file", "File", None),
            TargetKind::TargetOrganization => ("target_organization", "Organization", Some(5)),
            TargetKind::TargetGroup => ("target_group", "Group", Some(1)),
            TargetKind::JobCluster => ("job_cluster", "Job Cluster", None),
            TargetKind::Bucket => ("bucket", "Bucket", None),
            TargetKind::HostedTemplate => ("hosted_template", "Hosted Template", Some(1)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.row().0
    }

    fn label(&self) -> &'static str {
        self.row().1
    }

    /// Number of byte planes a stored permission on this kind carries
    pub fn level_count(&self) -> Option<u8> {
        self.row().2
    }
}

impl FromStr for TargetKind {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        TargetKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| CalcError::Store(format!("unknown target kind {:?}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: u64) -> Self {
        EntityRef { kind, id }
    }
    pub fn user(id: u64) -> Self {
        Self::new(EntityKind::User, id)
    }
    pub fn group(id: u64) -> Self {
        Self::new(EntityKind::Group, id)
    }
    pub fn organization(id: u64) -> Self {
        Self::new(EntityKind::Organization, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: u64,
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: u64) -> Self {
        TargetRef { kind, id }
    }
    pub fn project(id: u64) -> Self {
        Self::new(TargetKind::Project, id)
    }
    pub fn section(id: u64) -> Self {
        Self::new(TargetKind::Section, id)
    }
    pub fn version(id: u64) -> Self {
        Self::new(TargetKind::Version, id)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.id)
    }
}

/// Validate that a shift addresses a whole plane
#[inline]
pub(crate) fn check_shift(bit_shift: u32) -> Result<()> {
    if bit_shift % PLANE_WIDTH != 0 {
        return Err(CalcError::InvalidBitWidth(format!(
            "shift {} is not a multiple of {}",
            bit_shift, PLANE_WIDTH
        )));
    }
    Ok(())
}

/// One link of a containment hierarchy, with the shift that selects its plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetLevel {
    pub target: TargetRef,
    pub bit_shift: u32,
}

impl TargetLevel {
    pub fn new(target: TargetRef, bit_shift: u32) -> Result<Self> {
        check_shift(bit_shift)?;
        Ok(TargetLevel { target, bit_shift })
    }
}

/// Ordered root-to-leaf hierarchy. Shifts strictly decrease and end at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetChain {
    levels: Vec<TargetLevel>,
}

impl TargetChain {
    pub fn new(levels: Vec<TargetLevel>) -> Result<Self> {
        let last = levels
            .last()
            .ok_or_else(|| CalcError::InvalidChain("chain is empty".into()))?;
        if last.bit_shift != 0 {
            return Err(CalcError::InvalidChain(format!(
                "leaf {} has shift {}, expected 0",
                last.target, last.bit_shift
            )));
        }
        for level in &levels {
            check_shift(level.bit_shift)?;
        }
        for (i, level) in levels.iter().enumerate() {
            if levels[..i].iter().any(|l| l.target == level.target) {
                return Err(CalcError::InvalidChain(format!("{} appears twice", level.target)));
            }
        }
        for w in levels.windows(2) {
            if w[0].bit_shift <= w[1].bit_shift {
                return Err(CalcError::InvalidChain(format!(
                    "shift of {} ({}) must exceed shift of {} ({})",
                    w[0].target, w[0].bit_shift, w[1].target, w[1].bit_shift
                )));
            }
        }
        Ok(TargetChain { levels })
    }

    /// Build a chain from root-to-leaf targets, one plane per step
    pub fn from_targets(targets: &[TargetRef]) -> Result<Self> {
        let n = targets.len() as u32;
        Self::new(
            targets
                .iter()
                .enumerate()
                .map(|(i, t)| TargetLevel { target: *t, bit_shift: (n - 1 - i as u32) * PLANE_WIDTH })
                .collect(),
        )
    }

    pub fn levels(&self) -> &[TargetLevel] {
        &self.levels
    }

    pub fn targets(&self) -> Vec<TargetRef> {
        self.levels.iter().map(|l| l.target).collect()
    }

    pub fn leaf(&self) -> &TargetLevel {
        // Non-empty by construction
        &self.levels[self.levels.len() - 1]
    }

    pub fn level(&self, target: &TargetRef) -> Option<&TargetLevel> {
        self.levels.iter().find(|l| l.target == *target)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Stored permission value, or the sentinel for "caller cannot see ACLs here"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Granted(BigUint),
    NoAccess,
}

/// The entity side of a record; `All` only appears on visibility sentinels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicySubject {
    Entity(EntityRef),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub id: Option<u64>,
    pub subject: PolicySubject,
    pub target: TargetRef,
    pub permission: Permission,
}

impl PolicyRecord {
    pub fn granted(id: Option<u64>, entity: EntityRef, target: TargetRef, permission: impl Into<BigUint>) -> Self {
        PolicyRecord {
            id,
            subject: PolicySubject::Entity(entity),
            target,
            permission: Permission::Granted(permission.into()),
        }
    }

    /// Sentinel signalling that ACL entries on `target` cannot be enumerated
    pub fn no_access(target: TargetRef) -> Self {
        PolicyRecord { id: None, subject: PolicySubject::All, target, permission: Permission::NoAccess }
    }

    pub fn is_no_access_sentinel(&self) -> bool {
        self.subject == PolicySubject::All && self.permission == Permission::NoAccess
    }

    pub fn matches(&self, entity: &EntityRef, target: &TargetRef) -> bool {
        self.subject == PolicySubject::Entity(*entity) && self.target == *target
    }
}

/// Decimal-string serde for permissions wider than 64 bits
pub(crate) mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<BigUint>, s: S) -> std::result::Result<S::Ok, S::Error> {
        match v {
            Some(n) => s.serialize_some(&n.to_str_radix(10)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<BigUint>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(|| serde::de::Error::custom(format!("invalid permission {:?}", s))))
            .transpose()
    }
}
