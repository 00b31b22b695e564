//! In-memory code-mode script storage plus structural validation.
//!
//! See [`store`] for the `create`/`update`/`view` store and [`validator`]
//! for the package-whitelist / default-export-shape / no-`any`-or-`unknown`
//! checks run against every script on save.

pub mod store;
pub mod validator;

pub use store::{CreateResult, Replacement, ReplacementFailure, Script, ScriptStore, StoreError, UpdateResult};
pub use validator::{Rule, ValidationResult, Violation, validate};
