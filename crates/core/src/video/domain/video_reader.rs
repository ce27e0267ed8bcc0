use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::media_asset::MediaAsset;

/// Reads frames from a video container.
///
/// Implementations handle codec and container details while the pipeline
/// works with the abstract [`Frame`] and [`MediaAsset`] types. A reader may
/// be reopened after `close`.
pub trait VideoReader: Send {
    /// Opens a video file and returns its probed properties.
    fn open(&mut self, path: &Path) -> Result<MediaAsset, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
