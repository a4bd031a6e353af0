//! Sequential style transfer over the tile collection.
//!
//! Each tile goes Staged → Processing → Retrieved → Archived → Done before
//! the next one is staged: the style tool reads and writes one shared
//! working directory and, on GPU, holds the device for the whole run.

use std::path::Path;

use tracing::{error, info, warn};

use crate::config::{Config, FailurePolicy};
use crate::errors::{BestEffort, GridifyError, Result};
use crate::geometry::TilingGeometry;
use crate::neural_style::{is_output_name, StyleRequest};
use crate::progress::{TileProgress, TileStage};
use crate::sequence::TaskQueue;
use crate::tiles::{is_tile_name, Tile, TileCollection};
use crate::traits::StyleTransfer;
use crate::workspace;

/// Tile counts after the style-transfer stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleSummary {
    pub stylized: usize,
    /// Tiles outside the processed prefix, reassembled as cropped.
    pub passed_through: usize,
    /// Tiles the tool failed on and that were put back untouched.
    pub failed: usize,
}

impl StyleSummary {
    /// Summary for a run that bypassed style transfer entirely.
    pub const fn skipped(tile_count: usize) -> Self {
        Self {
            stylized: 0,
            passed_through: tile_count,
            failed: 0,
        }
    }
}

/// `out.png` and the intermediate `out_<n>.png` frames.
fn is_tool_output(path: &Path) -> bool {
    file_name_matches(path, is_output_name)
}

/// Files the pipeline stages or the tool writes. The working directory is
/// shared with the user's checkout, so nothing else in it is touched.
fn is_pipeline_file(path: &Path) -> bool {
    file_name_matches(path, |name| is_output_name(name) || is_tile_name(name))
}

fn file_name_matches(path: &Path, matches: impl Fn(&str) -> bool) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(matches)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileOutcome {
    Stylized,
    Failed,
}

pub struct StylePipeline<'a, S: StyleTransfer> {
    config: &'a Config,
    transfer: &'a S,
    geometry: TilingGeometry,
}

impl<'a, S: StyleTransfer> StylePipeline<'a, S> {
    pub const fn new(config: &'a Config, transfer: &'a S, geometry: TilingGeometry) -> Self {
        Self {
            config,
            transfer,
            geometry,
        }
    }

    /// Stylizes the selected prefix of `tiles` in place, one tile at a time.
    pub async fn run(&self, tiles: &TileCollection) -> Result<StyleSummary> {
        let limit = self
            .config
            .tile_limit()
            .map_or(tiles.len(), |limit| limit.min(tiles.len()));
        let selected = &tiles.as_slice()[..limit];
        info!(
            "Stylizing {} of {} tiles ({} iterations each)",
            selected.len(),
            tiles.len(),
            self.config.iterations()
        );

        let progress = TileProgress::new(selected.len(), self.config.verbose);
        let mut queue = TaskQueue::new();
        for tile in selected {
            let progress = &progress;
            queue.push(move || self.process_tile(tile, progress));
        }
        let outcomes = queue.drain().await;
        progress.finish();
        let outcomes = outcomes?;

        let failed = outcomes
            .iter()
            .filter(|outcome| **outcome == TileOutcome::Failed)
            .count();
        Ok(StyleSummary {
            stylized: outcomes.len() - failed,
            passed_through: tiles.len() - limit,
            failed,
        })
    }

    fn request(&self, staged: &Path) -> StyleRequest {
        StyleRequest {
            content: staged.to_path_buf(),
            style: self.config.style.clone(),
            blend: self.config.blend,
            image_size: self.geometry.tile_size,
            iterations: self.config.iterations(),
            use_gpu: self.config.use_gpu,
            original_colors: self.config.original_colors,
        }
    }

    async fn process_tile(&self, tile: &Tile, progress: &TileProgress) -> Result<TileOutcome> {
        progress.suspend(|| info!("Processing file {}...", tile.file_name()));
        let working_dir = self.transfer.working_dir();

        // leftovers from an interrupted run
        let cleared = workspace::remove_files_in(working_dir, is_pipeline_file).await;
        progress.suspend(|| cleared.best_effort("clearing the style working directory"));

        let staged = working_dir.join(tile.file_name());
        workspace::move_file(&tile.path, &staged).await?;
        progress.stage(tile, TileStage::Staged);

        progress.stage(tile, TileStage::Processing);
        let stylized = match self.transfer.stylize(&self.request(&staged)).await {
            Ok(stylized) => stylized,
            Err(e) => return self.handle_failure(tile, &staged, progress, e).await,
        };

        workspace::copy_file(&stylized, &tile.path).await?;
        progress.stage(tile, TileStage::Retrieved);

        workspace::remove_file(&staged).await?;
        let archive = tile.path.with_extension("");
        workspace::create_dir(&archive).await?;
        for image in workspace::files_in(working_dir, is_tool_output).await? {
            if let Some(name) = image.file_name() {
                workspace::move_file(&image, &archive.join(name)).await?;
            }
        }
        progress.stage(tile, TileStage::Archived);

        progress.stage(tile, TileStage::Done);
        Ok(TileOutcome::Stylized)
    }

    async fn handle_failure(
        &self,
        tile: &Tile,
        staged: &Path,
        progress: &TileProgress,
        err: GridifyError,
    ) -> Result<TileOutcome> {
        match self.config.failure_policy {
            FailurePolicy::Abort => {
                progress.suspend(|| {
                    error!(
                        "Style transfer failed on {}; its staged copy is at {}",
                        tile.file_name(),
                        staged.display()
                    )
                });
                Err(err)
            }
            FailurePolicy::SkipTile => {
                progress.suspend(|| {
                    warn!(
                        "Style transfer failed on {}, keeping it unstyled: {}",
                        tile.file_name(),
                        err
                    )
                });
                workspace::move_file(staged, &tile.path).await?;
                let cleared =
                    workspace::remove_files_in(self.transfer.working_dir(), is_pipeline_file).await;
                progress.suspend(|| cleared.best_effort("clearing the style working directory"));
                progress.skip();
                Ok(TileOutcome::Failed)
            }
        }
    }
}
