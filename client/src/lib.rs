//! Client-side session gate and backend API access for the blog.
//!
//! ARCHITECTURE
//! ============
//! `net` talks to the backend REST API, `state` owns the process-wide session
//! store, `util` holds credential storage and the route guard, and `pages`
//! carries page-level flows (login, article authoring) that tie them together.
//!
//! Everything in `state` and `util::auth` is single-threaded: handles are
//! `Rc`-based and notifications run synchronously on the calling thread.

pub mod net;
pub mod pages;
pub mod state;
pub mod util;
