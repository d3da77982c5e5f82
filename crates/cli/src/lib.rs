//! auditcoal command implementations

pub mod cmd;
pub mod input;
