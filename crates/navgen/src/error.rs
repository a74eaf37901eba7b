// error.rs - zone export fault taxonomy

use thiserror::Error;

use crate::mesh::SinkError;

/// Faults that terminate one zone's export. Recoverable conditions (missing
/// models, malformed ladder parts, rejected batches) are logged and skipped
/// instead of surfacing here.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no collision geometry found for fixture {fixture_id} (model: {model})")]
    NoCollisionGeometry { fixture_id: u32, model: String },

    /// Flipped placements would need mirrored winding everywhere; failing
    /// beats silently exporting wrong geometry.
    #[error("fixture {fixture_id} requests flipping, which is not implemented")]
    FlipNotImplemented { fixture_id: u32 },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
