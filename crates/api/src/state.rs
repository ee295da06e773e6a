use std::sync::Arc;

use siglabel_store::StoreLayout;

use crate::config::ServerConfig;
use crate::engine::MergePipeline;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Storage layout used by the read-only handlers.
    pub layout: Arc<StoreLayout>,
    /// Annotation buffer plus the drain-and-merge paths.
    pub pipeline: Arc<MergePipeline>,
}

impl AppState {
    /// Build state around a fresh, empty annotation buffer.
    pub fn new(config: ServerConfig, layout: StoreLayout) -> Self {
        let layout = Arc::new(layout);
        let pipeline = Arc::new(MergePipeline::new(
            Arc::new(siglabel_core::AnnotationBuffer::new()),
            Arc::clone(&layout),
        ));
        Self {
            config: Arc::new(config),
            layout,
            pipeline,
        }
    }
}
