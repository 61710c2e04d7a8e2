//! Deterministic, pure logic shared by the coordinator and workers.
//!
//! Core modules must be free of I/O side effects.

pub mod draft;
pub mod handoff;
pub mod limits;
pub mod status;
pub mod transcript;
