//! ImageMagick backend: `identify` for probing, `convert` for cropping and
//! the page-offset mosaic.

use std::path::Path;

use async_trait::async_trait;

use crate::errors::{GridifyError, Result};
use crate::geometry::{ImageDimensions, TilingGeometry};
use crate::runner::{path_arg, ExternalCommand, ProcessRunner};
use crate::tiles::{crop_pattern, TileCollection};
use crate::traits::ImageToolkit;

#[derive(Debug, Clone, Default)]
pub struct MagickToolkit {
    runner: ProcessRunner,
}

impl MagickToolkit {
    pub const fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    pub fn probe_command(image: &Path) -> ExternalCommand {
        ExternalCommand::new("identify")
            .args(["-ping", "-format", "%w %h\\n"])
            .arg(path_arg(image))
    }

    pub fn crop_command(
        image: &Path,
        geometry: &TilingGeometry,
        tiles_dir: &Path,
    ) -> ExternalCommand {
        let size = geometry.tile_size;
        ExternalCommand::new("convert")
            .arg(path_arg(image))
            .args(["+gravity", "-crop"])
            .arg(format!("{}x{}", size, size))
            .arg(path_arg(&tiles_dir.join(crop_pattern())))
    }

    pub fn mosaic_command(
        tiles: &TileCollection,
        geometry: &TilingGeometry,
        output: &Path,
    ) -> ExternalCommand {
        let mut command = ExternalCommand::new("convert");
        for tile in tiles {
            let (x, y) = tile.offset(geometry);
            command = command
                .arg("-page")
                .arg(format!("+{}+{}", x, y))
                .arg(path_arg(&tile.path));
        }
        command
            .args(["-background", "none", "-mosaic"])
            .arg(path_arg(output))
    }
}

/// Parses `identify -format "%w %h"` output; multi-frame files print one
/// line per frame, the first one wins.
pub(crate) fn parse_dimensions(stdout: &str) -> Option<ImageDimensions> {
    let mut fields = stdout.lines().next()?.split_whitespace();
    let width = fields.next()?.parse().ok()?;
    let height = fields.next()?.parse().ok()?;
    (width > 0 && height > 0).then_some(ImageDimensions::new(width, height))
}

#[async_trait]
impl ImageToolkit for MagickToolkit {
    async fn probe_dimensions(&self, image: &Path) -> Result<ImageDimensions> {
        if !image.is_file() {
            return Err(GridifyError::Probe {
                path: image.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }

        let stdout = self
            .runner
            .output(&Self::probe_command(image))
            .await
            .map_err(|e| GridifyError::Probe {
                path: image.to_path_buf(),
                reason: e.to_string(),
            })?;

        parse_dimensions(&stdout).ok_or_else(|| GridifyError::Probe {
            path: image.to_path_buf(),
            reason: format!("unexpected identify output `{}`", stdout.trim()),
        })
    }

    async fn crop_tiles(
        &self,
        image: &Path,
        geometry: &TilingGeometry,
        tiles_dir: &Path,
    ) -> Result<()> {
        self.runner
            .run(&Self::crop_command(image, geometry, tiles_dir))
            .await
    }

    async fn reassemble(
        &self,
        tiles: &TileCollection,
        geometry: &TilingGeometry,
        _dimensions: ImageDimensions,
        output: &Path,
    ) -> Result<()> {
        self.runner
            .run(&Self::mosaic_command(tiles, geometry, output))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::tile_file_name;
    use std::path::PathBuf;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(
            parse_dimensions("1000 700\n"),
            Some(ImageDimensions::new(1000, 700))
        );
        assert_eq!(
            parse_dimensions("64 32\n64 32\n"),
            Some(ImageDimensions::new(64, 32))
        );
        assert_eq!(parse_dimensions(""), None);
        assert_eq!(parse_dimensions("0 10"), None);
        assert_eq!(parse_dimensions("identify: not an image"), None);
    }

    #[test]
    fn test_crop_command() {
        let geometry = TilingGeometry {
            tile_size: 350,
            columns: 3,
            rows: 2,
        };
        let command = MagickToolkit::crop_command(
            Path::new("/in/art.png"),
            &geometry,
            Path::new("/p/tiles"),
        );
        assert_eq!(
            command.to_string(),
            "convert /in/art.png +gravity -crop 350x350 /p/tiles/tiles_%d.png"
        );
    }

    #[test]
    fn test_mosaic_places_tiles_by_index() {
        let geometry = TilingGeometry {
            tile_size: 350,
            columns: 3,
            rows: 2,
        };
        let tiles = TileCollection::from_paths(
            [5, 0, 4].map(|i| PathBuf::from("/p/tiles").join(tile_file_name(i))),
        );
        let command =
            MagickToolkit::mosaic_command(&tiles, &geometry, Path::new("/p/output/output.png"));
        assert_eq!(
            command.to_string(),
            "convert -page +0+0 /p/tiles/tiles_0.png \
             -page +350+350 /p/tiles/tiles_4.png \
             -page +700+350 /p/tiles/tiles_5.png \
             -background none -mosaic /p/output/output.png"
        );
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_probe_error() {
        let toolkit = MagickToolkit::default();
        let result = toolkit
            .probe_dimensions(Path::new("/definitely/not/here.png"))
            .await;
        assert!(matches!(result, Err(GridifyError::Probe { .. })));
    }
}
