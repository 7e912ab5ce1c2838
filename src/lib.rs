//! # Conductor
//!
//! Workflow orchestration for multi-specialist code generation.
//!
//! Conductor turns a development request into an ordered plan of
//! domain-tagged steps, dispatches each task to the specialist registered for
//! its domain, keeps the git working copy on a safe branch, and routes failed
//! verifications back to the specialist most likely to fix them.
//!
//! ## Components
//!
//! - [`analyzer`] - structural analysis of the project tree
//! - [`git`] - branch naming, creation, merge validation and merging
//! - [`collab`] - shared per-component context and agent mailboxes
//! - [`workflow`] - planning, execution and failure routing
//! - [`init`] - project scaffolding
//!
//! ## Quick Start
//!
//! ```bash
//! conductor init --name shop
//! cd shop
//! conductor new-feature billing
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::use_self)]

pub mod analyzer;
pub mod collab;
pub mod core;
pub mod git;
pub mod init;
pub mod workflow;

// Re-export commonly used types
pub use analyzer::{ProjectAnalysis, ProjectAnalyzer, Violation};
pub use collab::{CollaborationStore, ComponentContext, Message, Recipient};
pub use core::{Config, Domain};
pub use git::{BranchInfo, BranchKind, BranchSpec, MergeStrategy, RepositoryManager, ValidationResult};
pub use workflow::{
    Orchestrator, Specialist, SpecialistRegistry, SpecialistRequest, SpecialistResponse, Workflow,
    WorkflowOutcome, WorkflowRequest, WorkflowStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "conductor";
