//! Network classifier and per-container IP allow/deny lists.

use cghive_common::constants::{CG_NET_CLS, CG_VE};
use cghive_common::error::{CgError, Result};
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Tags the container's traffic with a classid for the packet classifier.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_classid(reg: &Registry, ctid: &CtId, classid: u32) -> Result<()> {
    params::set_u32(reg, Some(ctid), CG_NET_CLS, "net_cls.classid", classid)
}

/// Whether an address literal is IPv6, judged by syntax alone.
fn is_ipv6(ip: &str) -> bool {
    ip.contains(':')
}

/// Grants the container an IP address, routed to the v4 or v6 allow file
/// by address syntax.
///
/// # Errors
///
/// Returns [`CgError::AddressInUse`] when the kernel reports the address
/// is held by another container, and ordinary write failures otherwise.
pub fn add_ip(reg: &Registry, ctid: &CtId, ip: &str) -> Result<()> {
    let name = if is_ipv6(ip) {
        "ve.ip6_allow"
    } else {
        "ve.ip_allow"
    };
    params::set_param(reg, Some(ctid), CG_VE, name, ip).map_err(|e| classify_add_error(e, ip))
}

/// Revokes an IP address, routed to the v4 or v6 deny file by syntax.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn del_ip(reg: &Registry, ctid: &CtId, ip: &str) -> Result<()> {
    let name = if is_ipv6(ip) {
        "ve.ip6_deny"
    } else {
        "ve.ip_deny"
    };
    params::set_param(reg, Some(ctid), CG_VE, name, ip)
}

/// Reads back the container's assigned addresses from both the v4 and v6
/// list files, as the kernel prints them. A list file a kernel does not
/// provide is treated as empty.
///
/// # Errors
///
/// Propagates path-resolution and read failures.
pub fn get_ips(reg: &Registry, ctid: &CtId) -> Result<Vec<String>> {
    let mut ips = Vec::new();
    for name in ["ve.ip_list", "ve.ip6_list"] {
        let path = reg.cgroup_path(Some(ctid), CG_VE, name)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(CgError::Io { path, source: e }),
        };
        ips.extend(content.lines().map(str::to_owned));
    }
    Ok(ips)
}

fn classify_add_error(err: CgError, ip: &str) -> CgError {
    match err {
        CgError::Io { ref source, .. }
            if source.raw_os_error() == Some(libc::EADDRINUSE) =>
        {
            CgError::AddressInUse { ip: ip.into() }
        }
        other => other,
    }
}
