//! Length-prefixed key encoding for the LMDB policy store.
//!
//! Keys are encoded as `[len1][bytes1][len2][bytes2]...` with no delimiters,
//! so a target prefix never matches a longer id (`project/1` vs `project/12`).
//!
//! Policy keys: `[target_kind][target_id][entity_kind][entity_id]`.

use crate::model::{EntityRef, TargetRef};

/// Build a length-prefixed key from parts
#[inline]
pub fn build_key(parts: &[&str]) -> Vec<u8> {
    let total_len: usize = parts.iter().map(|p| 1 + p.len()).sum();
    let mut key = Vec::with_capacity(total_len);
    for part in parts {
        key.push(part.len() as u8);
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// Parse a length-prefixed key into parts; stops at the first malformed part
pub fn parse_key(bytes: &[u8]) -> Vec<&str> {
    let mut parts = Vec::with_capacity(4);
    let mut i = 0;
    while i < bytes.len() {
        let len = bytes[i] as usize;
        if i + 1 + len > bytes.len() {
            break;
        }
        match std::str::from_utf8(&bytes[i + 1..i + 1 + len]) {
            Ok(part) => parts.push(part),
            Err(_) => break,
        }
        i += 1 + len;
    }
    parts
}

/// Key for the policy between `entity` and `target`
#[inline]
pub fn policy_key(target: &TargetRef, entity: &EntityRef) -> Vec<u8> {
    build_key(&[
        target.kind.as_str(),
        &target.id.to_string(),
        entity.kind.as_str(),
        &entity.id.to_string(),
    ])
}

/// Prefix covering every policy on `target`; also the hidden-target key
#[inline]
pub fn target_key(target: &TargetRef) -> Vec<u8> {
    build_key(&[target.kind.as_str(), &target.id.to_string()])
}

/// Decode a policy key back into (target, entity)
pub fn parse_policy_key(bytes: &[u8]) -> Option<(TargetRef, EntityRef)> {
    match parse_key(bytes).as_slice() {
        [tk, tid, ek, eid] => Some((
            TargetRef::new(tk.parse().ok()?, tid.parse().ok()?),
            EntityRef::new(ek.parse().ok()?, eid.parse().ok()?),
        )),
        _ => None,
    }
}
