//! Typed resource setters over parameter I/O.
//!
//! Each submodule is a thin, validated mapping from a configuration value
//! onto the control files of one controller.

pub mod cpu;
pub mod cpuset;
pub mod devices;
pub mod io;
pub mod memory;
pub mod net;
