//! Lab console forms - form state and validation engine
//!
//! Shared by every create/edit modal of the lab operations console
//! (personnel, equipment, materials, work orders, shifts). The engine keeps
//! values, errors and touched flags for one form, evaluates synchronous and
//! asynchronous rules, and exposes explicit field bindings and watchers so
//! any rendering layer can drive it.

pub mod config;
pub mod forms;

pub use forms::{create_form, FormInstance, FormOptions, Rule};
