//! Exposure sequence plans

use async_trait::async_trait;
use chrono::Local;
use dk154_ccd3::ExposureParameters;

/// A sequence of frames sharing one parameter set.
#[derive(Debug, Clone)]
pub struct ExposurePlan {
    pub n_exp: u32,
    pub parameters: ExposureParameters,
    /// Remote directory on the camera host; `/data` is prepended there.
    pub remote_dir: String,
    /// Stem of every frame filename (FITS OBJECT-ish).
    pub object_name: String,
}

impl ExposurePlan {
    pub fn new(
        n_exp: u32,
        parameters: ExposureParameters,
        remote_dir: impl Into<String>,
        object_name: impl Into<String>,
    ) -> Self {
        Self {
            n_exp,
            parameters,
            remote_dir: remote_dir.into(),
            object_name: object_name.into(),
        }
    }

    /// Remote path of frame `index`, stamped with an hour-minute string so
    /// repeated runs in one night do not collide.
    pub fn frame_path(&self, hm: &str, index: u32) -> String {
        format!(
            "{}/{}_{}_{:03}.fits",
            self.remote_dir.trim_end_matches('/'),
            self.object_name,
            hm,
            index
        )
    }
}

/// Hour-minute stamp for frame names.
pub(crate) fn hm_stamp() -> String {
    Local::now().format("%Hh%Mm").to_string()
}

/// External collaborator notified as each frame lands on the camera host,
/// e.g. the SCP backup and FITS header rewriter. Failures there are that
/// collaborator's concern; the sequence keeps going.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn frame_ready(&self, remote_path: &str);
}
