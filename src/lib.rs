pub mod config;
pub mod errors;
pub mod geometry;
pub mod magick;
pub mod native;
pub mod neural_style;
pub mod progress;
pub mod runner;
pub mod sequence;
pub mod stylize;
pub mod tiles;
pub mod traits;
pub mod workspace;

pub mod mocks;

use std::path::PathBuf;

use tracing::info;

pub use config::{Backend, Cli, Config, FailurePolicy};
pub use errors::{BestEffort, GridifyError, Result};
pub use geometry::{ImageDimensions, TilingGeometry};
pub use magick::MagickToolkit;
pub use native::NativeToolkit;
pub use neural_style::{NeuralStyle, StyleRequest};
pub use runner::{ExternalCommand, ProcessRunner};
pub use stylize::{StylePipeline, StyleSummary};
pub use tiles::{collect_tiles, list_tiles, Tile, TileCollection};
pub use traits::*;

#[cfg(test)]
pub use mocks::*;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub dimensions: ImageDimensions,
    pub geometry: TilingGeometry,
    pub tile_count: usize,
    pub summary: StyleSummary,
    pub output: PathBuf,
}

/// Runs the whole pipeline: reset directories, probe, tile, stylize,
/// reassemble.
pub struct Gridify<T: ImageToolkit, S: StyleTransfer> {
    toolkit: T,
    transfer: S,
    config: Config,
}

impl<T: ImageToolkit, S: StyleTransfer> Gridify<T, S> {
    pub const fn new(toolkit: T, transfer: S, config: Config) -> Self {
        Self {
            toolkit,
            transfer,
            config,
        }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn style_transfer(&self) -> &S {
        &self.transfer
    }

    pub async fn run(&self) -> Result<RunReport> {
        let config = &self.config;

        info!("Emptying temporary directories...");
        workspace::reset_directories(&config.tiles_dir, &config.output_dir).await?;

        info!("Calculating optimal tile dimensions...");
        let dimensions = self.toolkit.probe_dimensions(&config.input).await?;
        let geometry = TilingGeometry::compute(dimensions, config.max_tile_size)?;
        info!(
            "Rendering tiles of {}x{}px in {} columns",
            geometry.tile_size, geometry.tile_size, geometry.columns
        );

        info!("Breaking input image {} into tiles...", config.input.display());
        self.toolkit
            .crop_tiles(&config.input, &geometry, &config.tiles_dir)
            .await?;

        info!("Counting tiles...");
        let tiles = collect_tiles(&config.tiles_dir).await?;
        info!("{} tiles generated.", tiles.len());
        if tiles.is_empty() {
            return Err(GridifyError::Geometry {
                reason: format!("cropping {} produced no tiles", config.input.display()),
            });
        }

        let summary = if config.skip_style_transfer {
            StyleSummary::skipped(tiles.len())
        } else {
            StylePipeline::new(config, &self.transfer, geometry)
                .run(&tiles)
                .await?
        };

        info!("Re-assembling image...");
        let output = config.output_file();
        self.toolkit
            .reassemble(&tiles, &geometry, dimensions, &output)
            .await?;
        info!(
            "Final image saved to {} ({} stylized, {} untouched, {} failed)",
            output.display(),
            summary.stylized,
            summary.passed_through,
            summary.failed
        );

        Ok(RunReport {
            dimensions,
            geometry,
            tile_count: tiles.len(),
            summary,
            output,
        })
    }
}
