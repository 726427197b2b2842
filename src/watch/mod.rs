// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Declaring which source areas rebuild which task ([`rules`]).
//! - Compiling rule globs into matchers ([`patterns`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing so metadata-only events do not rebuild anything.
//!
//! It does **not** know about the DAG; it only turns filesystem changes
//! into task-level triggers.

pub mod event_handler;
pub mod hash;
pub mod patterns;
pub mod rules;
pub mod watcher;

pub use event_handler::WatchContext;
pub use hash::{ContentTracker, compute_file_hash};
pub use patterns::{TaskWatchProfile, build_globset, build_task_watch_profiles, compile_glob};
pub use rules::{WatchRule, standard_rules};
pub use watcher::{WatcherHandle, spawn_watcher};
