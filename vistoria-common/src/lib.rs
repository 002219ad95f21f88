//! # Vistoria Common Library
//!
//! Shared code for the Vistoria inspection backend including:
//! - Domain enums (inspection status, checklist answers, roles)
//! - Error taxonomy
//! - Configuration loading
//! - Database initialization and schema

pub mod config;
pub mod db;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ChecklistAnswer, InspectionStatus, ModuleType, PendingStatus, UserRole};
