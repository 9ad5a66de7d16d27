//! Permission bit constants and name mappings
//!
//! One plane is eight bits wide. A stored permission repeats the plane once
//! per hierarchy level below the object it is attached to: bits [0:7] apply
//! to the object itself, [8:15] to its children, [16:23] to grandchildren
//! and so on.

pub const EXIST: u8 = 0x01; // row may be listed or fetched
pub const READ: u8 = 0x02; // references may be accessed (presigned URLs)
pub const CREATE: u8 = 0x04;
pub const MODIFY: u8 = 0x08;
pub const DELETE: u8 = 0x10;
pub const EXECUTE: u8 = 0x20; // algorithms only
pub const UPLOAD: u8 = 0x40; // media upload
pub const ACL: u8 = 0x80; // may modify ACLs on the row
pub const FULL_CONTROL: u8 = 0xFF;

/// Bits per hierarchy level
pub const PLANE_WIDTH: u32 = 8;

// Ordered EXIST..ACL, i.e. by bit index
const BITS: &[(&str, u8)] = &[
    ("exist", EXIST),
    ("read", READ),
    ("create", CREATE),
    ("modify", MODIFY),
    ("delete", DELETE),
    ("execute", EXECUTE),
    ("upload", UPLOAD),
    ("acl", ACL),
];

/// Name of the bit at `bit_index` (0 = exist, 7 = acl)
pub fn bit_name(bit_index: usize) -> Option<&'static str> {
    BITS.get(bit_index).map(|(n, _)| *n)
}

/// Convert a plane mask to a list of bit names
pub fn mask_to_names(mask: u8) -> Vec<&'static str> {
    BITS.iter()
        .filter(|(_, b)| mask & b == *b)
        .map(|(n, _)| *n)
        .collect()
}

/// Convert a list of bit names to a plane mask; unknown names are ignored
pub fn names_to_mask(names: &[&str]) -> u8 {
    names
        .iter()
        .filter_map(|n| BITS.iter().find(|(k, _)| k.eq_ignore_ascii_case(n)).map(|(_, v)| v))
        .fold(0, |a, b| a | b)
}

/// Maximum parent links followed when resolving a target chain
pub const MAX_HIERARCHY_DEPTH: usize = 10;
