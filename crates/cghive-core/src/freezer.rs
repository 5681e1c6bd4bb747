//! Freezer controller state machine.
//!
//! A transition writes the target state and then polls `freezer.state`
//! until the kernel reports it. The wait is deliberately unbounded: a
//! transition stuck in the kernel blocks the caller indefinitely, and
//! callers rely on eventual-completion semantics.

use std::time::Duration;

use cghive_common::constants::CG_FREEZER;
use cghive_common::error::Result;
use cghive_common::types::{CtId, FreezerState};

use crate::params;
use crate::registry::Registry;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives the container's freezer into `state`, blocking until the
/// controller reports the transition complete.
///
/// # Errors
///
/// Returns an error if the state file cannot be written or read back;
/// an absent freezer controller surfaces as a not-present error.
pub fn set_state(reg: &Registry, ctid: &CtId, state: FreezerState) -> Result<()> {
    tracing::info!(ctid = %ctid, state = %state, "freezer transition");
    params::set_param(reg, Some(ctid), CG_FREEZER, "freezer.state", state.as_str())?;
    wait_converged(
        || params::get_param(reg, Some(ctid), CG_FREEZER, "freezer.state"),
        state.as_str(),
        std::thread::sleep,
    )
}

/// Freezes every process in the container.
///
/// # Errors
///
/// See [`set_state`].
pub fn freeze(reg: &Registry, ctid: &CtId) -> Result<()> {
    set_state(reg, ctid, FreezerState::Frozen)
}

/// Resumes a frozen container.
///
/// # Errors
///
/// See [`set_state`].
pub fn thaw(reg: &Registry, ctid: &CtId) -> Result<()> {
    set_state(reg, ctid, FreezerState::Thawed)
}

/// Polls `read` once per interval until its value starts with `target`.
/// The kernel may report transitional states (`FREEZING`), so the match is
/// a prefix match on the requested state.
fn wait_converged(
    mut read: impl FnMut() -> Result<String>,
    target: &str,
    mut sleep: impl FnMut(Duration),
) -> Result<()> {
    loop {
        if read()?.starts_with(target) {
            return Ok(());
        }
        sleep(POLL_INTERVAL);
    }
}
