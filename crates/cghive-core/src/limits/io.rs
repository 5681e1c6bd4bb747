//! Beancounter limits: barrier/limit pairs and the block-I/O bandwidth
//! triplets.

use cghive_common::constants::CG_UB;
use cghive_common::error::Result;
use cghive_common::types::CtId;

use crate::params;
use crate::registry::Registry;

/// Per-second bandwidth limiter settings shared by the throughput and IOPS
/// limiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthLimit {
    /// Sustained rate.
    pub speed: u32,
    /// Burst allowance above the sustained rate.
    pub burst: u32,
    /// Latency target in milliseconds.
    pub latency: u32,
}

/// Sets a beancounter's barrier and limit.
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_ub(reg: &Registry, ctid: &CtId, name: &str, barrier: u64, limit: u64) -> Result<()> {
    params::set_u64(
        reg,
        Some(ctid),
        CG_UB,
        &format!("beancounter.{name}.barrier"),
        barrier,
    )?;
    params::set_u64(
        reg,
        Some(ctid),
        CG_UB,
        &format!("beancounter.{name}.limit"),
        limit,
    )
}

/// Applies the disk throughput limiter (bytes per second).
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_iolimit(reg: &Registry, ctid: &CtId, limit: BandwidthLimit) -> Result<()> {
    set_bandwidth(reg, ctid, "iolimit", limit)
}

/// Applies the disk operation-rate limiter (operations per second).
///
/// # Errors
///
/// Propagates parameter-write failures.
pub fn set_iopslimit(reg: &Registry, ctid: &CtId, limit: BandwidthLimit) -> Result<()> {
    set_bandwidth(reg, ctid, "iopslimit", limit)
}

fn set_bandwidth(reg: &Registry, ctid: &CtId, name: &str, limit: BandwidthLimit) -> Result<()> {
    for (leaf, value) in [
        (format!("beancounter.{name}.speed"), limit.speed),
        (format!("beancounter.{name}.burst"), limit.burst),
        (format!("beancounter.{name}.latency"), limit.latency),
    ] {
        params::set_u64(reg, Some(ctid), CG_UB, &leaf, u64::from(value))?;
    }
    Ok(())
}
