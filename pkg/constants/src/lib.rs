//! Centralized constants for the kubevend project.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod kube;
pub mod storage;
pub mod wal;
