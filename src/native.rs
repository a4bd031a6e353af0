//! In-process backend on the `image` crate, for machines without ImageMagick.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{imageops, GenericImageView, ImageFormat, RgbaImage};
use tracing::debug;

use crate::errors::{GridifyError, Result};
use crate::geometry::{ImageDimensions, TilingGeometry};
use crate::tiles::{tile_file_name, TileCollection};
use crate::traits::ImageToolkit;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeToolkit;

impl NativeToolkit {
    pub const fn new() -> Self {
        Self
    }
}

/// Runs codec work off the async executor.
async fn blocking<T, F>(operation: &str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GridifyError::ImageProcessing {
            path: "unknown".to_string(),
            operation: operation.to_string(),
            source: Box::new(e),
        })?
}

fn image_error(path: &Path, operation: &str, source: image::ImageError) -> GridifyError {
    GridifyError::ImageProcessing {
        path: path.display().to_string(),
        operation: operation.to_string(),
        source: Box::new(source),
    }
}

fn crop_into(image: &Path, geometry: TilingGeometry, tiles_dir: &Path) -> Result<usize> {
    let source = image::open(image).map_err(|e| image_error(image, "image loading", e))?;
    let (width, height) = source.dimensions();

    let mut index = 0;
    for row in 0..geometry.rows {
        for column in 0..geometry.columns {
            let x = column * geometry.tile_size;
            let y = row * geometry.tile_size;
            let tile = source.crop_imm(
                x,
                y,
                geometry.tile_size.min(width - x),
                geometry.tile_size.min(height - y),
            );
            let path = tiles_dir.join(tile_file_name(index));
            tile.save_with_format(&path, ImageFormat::Png)
                .map_err(|e| image_error(&path, "tile saving", e))?;
            index += 1;
        }
    }
    Ok(index)
}

fn mosaic(
    tiles: Vec<(PathBuf, (u32, u32))>,
    dimensions: ImageDimensions,
    output: &Path,
) -> Result<()> {
    let mut canvas = RgbaImage::new(dimensions.width, dimensions.height);
    for (path, (x, y)) in tiles {
        let tile = image::open(&path)
            .map_err(|e| image_error(&path, "tile loading", e))?
            .to_rgba8();
        imageops::replace(&mut canvas, &tile, i64::from(x), i64::from(y));
    }
    canvas
        .save_with_format(output, ImageFormat::Png)
        .map_err(|e| image_error(output, "image saving", e))
}

#[async_trait]
impl ImageToolkit for NativeToolkit {
    async fn probe_dimensions(&self, image: &Path) -> Result<ImageDimensions> {
        let path = image.to_path_buf();
        blocking("dimension probe", move || {
            let (width, height) =
                image::image_dimensions(&path).map_err(|e| GridifyError::Probe {
                    reason: e.to_string(),
                    path,
                })?;
            Ok(ImageDimensions::new(width, height))
        })
        .await
    }

    async fn crop_tiles(
        &self,
        image: &Path,
        geometry: &TilingGeometry,
        tiles_dir: &Path,
    ) -> Result<()> {
        let image = image.to_path_buf();
        let tiles_dir = tiles_dir.to_path_buf();
        let geometry = *geometry;
        let count = blocking("tile cropping", move || {
            crop_into(&image, geometry, &tiles_dir)
        })
        .await?;
        debug!("Cropped {} tiles", count);
        Ok(())
    }

    async fn reassemble(
        &self,
        tiles: &TileCollection,
        geometry: &TilingGeometry,
        dimensions: ImageDimensions,
        output: &Path,
    ) -> Result<()> {
        let placed = tiles
            .iter()
            .map(|tile| (tile.path.clone(), tile.offset(geometry)))
            .collect();
        let output = output.to_path_buf();
        blocking("reassembly", move || mosaic(placed, dimensions, &output)).await
    }
}
