pub mod engine;
pub mod history;
pub mod manager;
pub mod manifest;
pub mod verify;

pub use engine::{plan, run_manifest, run_placements, PlacedArtifact, PlanItem, RunOptions, RunReport, StagePlan};
pub use history::RunRecord;
pub use manager::{StagingManager, Strategy};
pub use manifest::{ArtifactEntry, Manifest, Placement};
pub use verify::{verify, VerifyReport};
