use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::Result;
use crate::geometry::{ImageDimensions, TilingGeometry};
use crate::neural_style::StyleRequest;
use crate::tiles::TileCollection;

/// Image operations the pipeline delegates: probing, cropping, compositing.
///
/// The orchestrator only sequences these calls; implementations either shell
/// out to an image tool or do the work in-process.
#[async_trait]
pub trait ImageToolkit: Send + Sync {
    /// Reads the source image's pixel dimensions.
    ///
    /// Fails with [`GridifyError::Probe`](crate::GridifyError::Probe) when the
    /// file is missing or cannot be decoded.
    async fn probe_dimensions(&self, image: &Path) -> Result<ImageDimensions>;

    /// Cuts `image` into square tiles named `tiles_<index>.png` inside
    /// `tiles_dir`, indices in raster order.
    async fn crop_tiles(
        &self,
        image: &Path,
        geometry: &TilingGeometry,
        tiles_dir: &Path,
    ) -> Result<()>;

    /// Composites every tile at its offset and writes one image of the
    /// original footprint to `output`.
    async fn reassemble(
        &self,
        tiles: &TileCollection,
        geometry: &TilingGeometry,
        dimensions: ImageDimensions,
        output: &Path,
    ) -> Result<()>;
}

/// A style-transfer tool that works inside one shared directory.
///
/// Only one request may be in flight at a time: the tool reads its content
/// image from, and writes its results to, [`working_dir`](Self::working_dir).
#[async_trait]
pub trait StyleTransfer: Send + Sync {
    /// Directory the content image is staged into and results appear in.
    fn working_dir(&self) -> &Path;

    /// Renders the request and returns the path of the stylized image.
    async fn stylize(&self, request: &StyleRequest) -> Result<PathBuf>;
}
