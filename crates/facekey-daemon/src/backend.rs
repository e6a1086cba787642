//! Face encoder selection

use std::sync::Arc;
use tracing::info;

use facekey_core::FaceEncoder;

use crate::config::DaemonConfig;
use crate::error::Result;

/// Encoder for this build, or `None` when the daemon runs proximity-only
///
/// With the `dlib` feature a missing or unloadable model is a startup error.
pub fn load_encoder(config: &DaemonConfig) -> Result<Option<Arc<dyn FaceEncoder>>> {
    if !config.face_unlock_enabled {
        info!("Face unlock disabled in config");
        return Ok(None);
    }

    #[cfg(feature = "dlib")]
    {
        use facekey_core::backend::{DlibEncoder, DlibModelPaths};

        let paths = DlibModelPaths::in_dir(&config.model_dir);
        let encoder = DlibEncoder::load(&paths)?;
        info!("Loaded dlib face models from {:?}", config.model_dir);
        Ok(Some(Arc::new(encoder)))
    }

    #[cfg(not(feature = "dlib"))]
    {
        tracing::warn!("Built without a face encoder backend, running proximity-only");
        Ok(None)
    }
}
