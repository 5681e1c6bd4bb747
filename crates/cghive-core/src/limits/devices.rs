//! Device access rules.
//!
//! Rules are preformatted by the configuration layer in the kernel's
//! `<type> <major>:<minor> <access>` syntax and passed through verbatim.

use cghive_common::constants::CG_DEVICES;
use cghive_common::error::Result;
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Adds a rule to the allow list.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn allow(reg: &Registry, ctid: &CtId, rule: &str) -> Result<()> {
    params::set_param(reg, Some(ctid), CG_DEVICES, "devices.allow", rule)
}

/// Adds a rule to the deny list.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn deny(reg: &Registry, ctid: &CtId, rule: &str) -> Result<()> {
    params::set_param(reg, Some(ctid), CG_DEVICES, "devices.deny", rule)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use cghive_common::config::CgroupConfig;

    use super::*;

    fn fixture(dir: &Path) -> Registry {
        let cg = dir.join("devices/machine.slice/2");
        std::fs::create_dir_all(&cg).expect("mkdir");
        std::fs::write(cg.join("devices.allow"), "").expect("seed");
        let table = dir.join("mounts");
        std::fs::write(
            &table,
            format!(
                "cgroup {} cgroup rw,devices 0 0\n",
                dir.join("devices").display()
            ),
        )
        .expect("write mounts");
        Registry::new(CgroupConfig {
            mount_table: table,
            ..CgroupConfig::default()
        })
    }

    #[test]
    fn rules_pass_through_verbatim() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reg = fixture(tmp.path());
        allow(&reg, &CtId::new("2"), "b 8:0 rwm").expect("allow");
        let written =
            std::fs::read_to_string(tmp.path().join("devices/machine.slice/2/devices.allow"))
                .expect("read");
        assert_eq!(written, "b 8:0 rwm");
    }
}
