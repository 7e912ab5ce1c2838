//! Core types shared across Conductor.
//!
//! Configuration and the specialist domain tags.

pub mod config;
mod domain;

pub use config::{
    AnalyzerConfig, Config, GeneralConfig, GitConfig, InitConfig, OrchestrationConfig,
    SpecialistConfig, SpecialistProtocol,
};
pub use domain::Domain;
