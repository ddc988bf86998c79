//! Shared data types for the kubevend credentials engine.

pub mod rbac;
pub mod request;
pub mod role;
pub mod validate;
