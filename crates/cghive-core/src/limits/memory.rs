//! Memory controller limits.

use cghive_common::constants::CG_MEMORY;
use cghive_common::error::Result;
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Writes a named `memory.*` limit in bytes.
///
/// # Errors
///
/// Propagates parameter-write failures; an absent control file surfaces as
/// a not-present error so unsupported limits can be skipped.
pub fn set_memory(reg: &Registry, ctid: &CtId, name: &str, value: u64) -> Result<()> {
    params::set_u64(reg, Some(ctid), CG_MEMORY, name, value)
}

/// Reads a named `memory.*` value in bytes.
///
/// # Errors
///
/// Propagates read and parse failures.
pub fn get_memory(reg: &Registry, ctid: &CtId, name: &str) -> Result<u64> {
    params::get_u64(reg, Some(ctid), CG_MEMORY, name)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use cghive_common::config::CgroupConfig;

    use super::*;

    fn fixture(dir: &Path) -> Registry {
        let cg = dir.join("memory/machine.slice/8");
        std::fs::create_dir_all(&cg).expect("mkdir");
        std::fs::write(cg.join("memory.limit_in_bytes"), "0\n").expect("seed");
        let table = dir.join("mounts");
        std::fs::write(
            &table,
            format!("cgroup {} cgroup rw,memory 0 0\n", dir.join("memory").display()),
        )
        .expect("write mounts");
        Registry::new(CgroupConfig {
            mount_table: table,
            ..CgroupConfig::default()
        })
    }

    #[test]
    fn limit_round_trips() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reg = fixture(tmp.path());
        let id = CtId::new("8");
        set_memory(&reg, &id, "memory.limit_in_bytes", 1 << 30).expect("set");
        assert_eq!(
            get_memory(&reg, &id, "memory.limit_in_bytes").expect("get"),
            1 << 30
        );
    }

    #[test]
    fn unsupported_limit_is_not_present() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reg = fixture(tmp.path());
        let err = set_memory(&reg, &CtId::new("8"), "memory.swmax", 1).expect_err("absent file");
        assert!(err.is_not_present());
    }
}
