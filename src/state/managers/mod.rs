//! Process-wide managers.

pub mod lifecycle;
