//! Database handles and global LMDB state

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use byteorder::{BigEndian, ByteOrder};
use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use num_bigint::BigUint;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::{err, CalcError, Result};

pub type DbBytes = Database<Bytes, Bytes>;
pub type DbIds = Database<U64<BigEndian>, Bytes>;
pub type DbMeta = Database<Str, U64<BigEndian>>;

/// All database handles
pub struct Dbs {
    /// policy key -> [id: u64 BE][permission: big-endian bytes]
    pub policies: DbBytes,
    /// policy id -> policy key
    pub ids: DbIds,
    /// target key -> empty; caller has no ACL visibility on the target
    pub hidden: DbBytes,
    pub meta: DbMeta,
}

// Global state
pub static ENV: OnceLock<Env> = OnceLock::new();
pub static DBS: OnceLock<Dbs> = OnceLock::new();
pub static TEST_LOCK: Mutex<()> = Mutex::new(());
pub static INIT_PATH: OnceLock<String> = OnceLock::new();

#[inline]
pub fn dbs() -> Result<&'static Dbs> {
    DBS.get().ok_or_else(|| CalcError::Store("Not initialized".into()))
}

#[inline]
pub fn env() -> Result<&'static Env> {
    ENV.get().ok_or_else(|| CalcError::Store("Not initialized".into()))
}

/// Execute a read-only operation
#[inline]
pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(f: F) -> Result<T> {
    f(dbs()?, &env()?.read_txn().map_err(err)?)
}

/// Encode a stored policy value
pub fn encode_value(id: u64, permission: &BigUint) -> Vec<u8> {
    let perm = permission.to_bytes_be();
    let mut v = vec![0u8; 8 + perm.len()];
    BigEndian::write_u64(&mut v[..8], id);
    v[8..].copy_from_slice(&perm);
    v
}

/// Decode a stored policy value into (id, permission)
pub fn decode_value(v: &[u8]) -> Result<(u64, BigUint)> {
    if v.len() < 8 {
        return Err(CalcError::Store(format!("policy value has {} bytes", v.len())));
    }
    Ok((BigEndian::read_u64(&v[..8]), BigUint::from_bytes_be(&v[8..])))
}

/// Initialize the store at `path` with default sizing
pub fn init(path: &str) -> Result<()> {
    init_with(&StoreConfig::with_path(path))
}

/// Initialize the store; idempotent for the same path
pub fn init_with(cfg: &StoreConfig) -> Result<()> {
    if let Some(p) = INIT_PATH.get() {
        return if *p == cfg.path {
            Ok(())
        } else {
            Err(CalcError::Store(format!("Already init at {}", p)))
        };
    }
    cfg.validate()?;
    std::fs::create_dir_all(&cfg.path).map_err(err)?;
    // SAFETY: LMDB requires no other processes access this path concurrently during open.
    let e = unsafe {
        EnvOpenOptions::new()
            .map_size(cfg.map_size)
            .max_dbs(cfg.max_dbs)
            .open(Path::new(&cfg.path))
            .map_err(err)?
    };
    let mut tx = e.write_txn().map_err(err)?;
    let d = Dbs {
        policies: e.create_database(&mut tx, Some("policies")).map_err(err)?,
        ids: e.create_database(&mut tx, Some("ids")).map_err(err)?,
        hidden: e.create_database(&mut tx, Some("hidden")).map_err(err)?,
        meta: e.create_database(&mut tx, Some("meta")).map_err(err)?,
    };
    tx.commit().map_err(err)?;
    let _ = (ENV.set(e), DBS.set(d), INIT_PATH.set(cfg.path.clone()));
    info!(path = %cfg.path, map_size = cfg.map_size, "policy store initialized");
    Ok(())
}

/// Clear all databases (for testing)
pub fn clear_all() -> Result<()> {
    crate::tx::transact(|tx| tx.clear())
}

/// Get the test lock (for single-threaded tests)
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}
