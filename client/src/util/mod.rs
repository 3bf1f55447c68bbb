//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` persists credentials behind a localStorage-shaped trait; `auth`
//! decides what a guarded route shows.

pub mod auth;
pub mod storage;
