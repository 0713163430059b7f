//! # codectx units
//!
//! The shared entity every other crate in the workspace consumes: a *unit* is
//! one named code entity of an application (model, controller, service, job,
//! mailer, GraphQL type, ...) together with its forward dependency edges.
//!
//! Units are produced by an external extractor and arrive here as JSON:
//!
//! ```text
//! extractor ──> [Unit] ──┬──> DependencyGraph / GraphAnalyzer
//!                        ├──> metadata + vector stores
//!                        └──> retrieval pipeline (rank, assemble)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codectx_units::{parse_units, UnitType};
//!
//! let units = parse_units(r#"[
//!     {"identifier": "Admin::User", "type": "model",
//!      "file_path": "app/models/admin/user.rb",
//!      "dependencies": [{"target": "Account"}]}
//! ]"#).unwrap();
//!
//! assert_eq!(units[0].unit_type, UnitType::Model);
//! assert_eq!(units[0].effective_namespace(), Some("Admin"));
//! ```

mod error;
mod tokens;
mod types;

pub use error::{Result, UnitError};
pub use tokens::{HeuristicEstimator, TokenEstimator};
pub use types::{parse_units, Dependency, Unit, UnitType};
