//! Page-level flows.
//!
//! ARCHITECTURE
//! ============
//! Each page module owns its form validation and orchestration, and
//! delegates HTTP to `net` and session bookkeeping to `state`.

pub mod admin;
pub mod login;
