//! # cghive-core
//!
//! Orchestration of the legacy multi-controller cgroup hierarchy for
//! OS-level containers.
//!
//! This crate provides:
//! - **Registry**: controller descriptors, lazy mount-point resolution, and
//!   controller-aware path construction.
//! - **Parameter I/O**: raw and typed access to controller control files
//!   with a preserved not-present / hard-error distinction.
//! - **Lifecycle**: all-or-nothing creation and best-effort destruction of
//!   a container's cgroup across every mounted controller.
//! - **Tree removal**: a descriptor-relative depth-first remover that never
//!   re-derives paths from strings once the walk has started.
//! - **Projection**: the bind-mounted `/sys/fs/cgroup` view inside a
//!   container's root filesystem.
//! - **Limits and freezer**: typed resource setters and the blocking
//!   freezer state transition.

pub mod freezer;
pub mod lifecycle;
pub mod limits;
pub mod params;
pub mod projection;
pub mod registry;
pub mod rmtree;
pub mod ve;

pub use cghive_common::error::{CgError, Result};
pub use cghive_common::types::{CtId, FreezerState};
pub use registry::Registry;
