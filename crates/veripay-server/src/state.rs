//! Application state and dependency injection.

use std::sync::Arc;

use veripay_core::Result;
use veripay_gateway::GatewayClient;
use veripay_pipeline::RecognitionPipeline;
use veripay_tesseract::LocalEngine;
use veripay_upload::UploadManager;
use veripay_vision::{CloudEngine, VisionClient};

use crate::config::ServiceConfig;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct AppState {
    upload: Arc<UploadManager>,
    pipeline: Arc<RecognitionPipeline>,
}

impl AppState {
    /// Initializes application state from configuration.
    ///
    /// Builds both engines, the gateway client serving as verifier and
    /// usage ledger, and the upload manager. No collaborator is contacted
    /// here; missing credentials surface per request.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let local = Arc::new(LocalEngine::new(config.tesseract.clone()));
        let cloud = Arc::new(CloudEngine::new(VisionClient::new(config.vision.clone())?));
        let gateway = Arc::new(GatewayClient::new(config.gateway.clone())?);

        let pipeline = RecognitionPipeline::new(
            config.pipeline.clone(),
            local,
            cloud,
            gateway.clone(),
            gateway,
        );

        Ok(Self {
            upload: Arc::new(UploadManager::new(config.upload.clone())),
            pipeline: Arc::new(pipeline),
        })
    }

    /// Creates state from already built subsystems.
    pub fn new(upload: Arc<UploadManager>, pipeline: Arc<RecognitionPipeline>) -> Self {
        Self { upload, pipeline }
    }

    /// Returns the upload manager, for maintenance outside the router.
    pub fn upload(&self) -> Arc<UploadManager> {
        self.upload.clone()
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<AppState> for $t {
            fn from_ref(state: &AppState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(upload: Arc<UploadManager>);
impl_di!(pipeline: Arc<RecognitionPipeline>);
