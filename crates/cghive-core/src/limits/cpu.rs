//! CPU scheduling limits: shares, bandwidth rate, and vcpu count.

use cghive_common::constants::CG_CPU;
use cghive_common::error::Result;
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Sets the relative CPU weight. Configuration units are per-mille of a
/// nominal 1024-share cgroup, so the value is scaled by 1024/1000.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_cpuunits(reg: &Registry, ctid: &CtId, cpuunits: u32) -> Result<()> {
    let shares = u64::from(cpuunits) * 1024 / 1000;
    params::set_u64(reg, Some(ctid), CG_CPU, "cpu.shares", shares)
}

/// Sets the CPU bandwidth cap from a percentage of one CPU (100.0 = one
/// full CPU). The kernel expects 1024ths, so the value is scaled by
/// 1024/100.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_cpulimit(reg: &Registry, ctid: &CtId, percent: f64) -> Result<()> {
    let rate = (percent * 1024.0 / 100.0) as u64;
    params::set_u64(reg, Some(ctid), CG_CPU, "cpu.rate", rate)
}

/// Reads the CPU bandwidth cap back as a percentage, inverting the
/// [`set_cpulimit`] scaling.
///
/// # Errors
///
/// Propagates read and parse failures.
pub fn get_cpulimit(reg: &Registry, ctid: &CtId) -> Result<f64> {
    let rate = params::get_u64(reg, Some(ctid), CG_CPU, "cpu.rate")?;
    Ok(rate as f64 * 100.0 / 1024.0)
}

/// Sets the number of virtual CPUs visible to the container.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_vcpus(reg: &Registry, ctid: &CtId, vcpus: u32) -> Result<()> {
    params::set_u64(reg, Some(ctid), CG_CPU, "cpu.nr_cpus", u64::from(vcpus))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use cghive_common::config::CgroupConfig;

    use super::*;

    fn fixture(dir: &Path) -> Registry {
        let cg = dir.join("cpu/machine.slice/3");
        std::fs::create_dir_all(&cg).expect("mkdir");
        for file in ["cpu.shares", "cpu.rate", "cpu.nr_cpus"] {
            std::fs::write(cg.join(file), "").expect("seed");
        }
        let table = dir.join("mounts");
        std::fs::write(
            &table,
            format!("cgroup {} cgroup rw,cpu 0 0\n", dir.join("cpu").display()),
        )
        .expect("write mounts");
        Registry::new(CgroupConfig {
            mount_table: table,
            ..CgroupConfig::default()
        })
    }

    #[test]
    fn cpuunits_scale_to_shares() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reg = fixture(tmp.path());
        let id = CtId::new("3");
        set_cpuunits(&reg, &id, 1000).expect("set");
        let shares =
            std::fs::read_to_string(tmp.path().join("cpu/machine.slice/3/cpu.shares")).expect("read");
        assert_eq!(shares, "1024");
    }

    #[test]
    fn cpulimit_round_trips_through_the_rate_scaling() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reg = fixture(tmp.path());
        let id = CtId::new("3");
        set_cpulimit(&reg, &id, 50.0).expect("set");
        let rate =
            std::fs::read_to_string(tmp.path().join("cpu/machine.slice/3/cpu.rate")).expect("read");
        assert_eq!(rate, "512");
        assert!((get_cpulimit(&reg, &id).expect("get") - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vcpus_write_verbatim() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let reg = fixture(tmp.path());
        set_vcpus(&reg, &CtId::new("3"), 4).expect("set");
        let vcpus =
            std::fs::read_to_string(tmp.path().join("cpu/machine.slice/3/cpu.nr_cpus")).expect("read");
        assert_eq!(vcpus, "4");
    }
}
