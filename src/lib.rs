//! policycalc - Effective-permission calculator over byte-plane shifted policies
//!
//! A stored permission carries one 8-bit plane per level of the object
//! hierarchy. The calculator extracts the plane each (target, entity) pair
//! contributes, ORs entities per target and reports the leaf target's
//! result as the effective permission. Edits are tracked per cell and
//! turned into create/update/delete operations for the policy store.

pub mod calculator;
pub mod changeset;
pub mod config;
pub mod constants;
pub mod db;
pub mod editor;
pub mod error;
pub mod keys;
pub mod model;
pub mod plane;
pub mod resolve;
pub mod store;
pub mod tx;

pub use calculator::{PermissionCalculator, PermissionView};
pub use changeset::{ChangeSet, PolicyChange};
pub use config::StoreConfig;
pub use constants::*;
pub use db::{clear_all, init, init_with, test_lock};
pub use editor::LevelEditor;
pub use error::{CalcError, Result};
pub use model::{
    EntityKind, EntityRef, Permission, PolicyRecord, PolicySubject, TargetChain, TargetKind, TargetLevel, TargetRef,
};
pub use plane::{
    extract_plane, extract_plane_str, inject_plane, inject_plane_str, or_plane_strs, or_planes, Bit, Plane,
};
pub use resolve::{EntityExpander, Hierarchy, PolicySource, TargetResolver};
pub use store::Store;
pub use tx::{transact, Tx};

pub use num_bigint::BigUint;
