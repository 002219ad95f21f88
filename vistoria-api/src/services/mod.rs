//! Business services: scoring, permissions, evidence gateway, inspection
//! lifecycle and offline sync reconciliation

pub mod gateway;
pub mod inspections;
pub mod permissions;
pub mod scoring;
pub mod sync;

pub use gateway::{CloudinaryGateway, EvidenceGateway, UploadedAsset};
pub use inspections::InspectionsService;
