use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::tiles::Tile;

/// Where a tile is in the style-transfer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStage {
    Staged,
    Processing,
    Retrieved,
    Archived,
    Done,
}

/// Progress bar over the stylized tiles.
///
/// Hidden in verbose mode so forwarded subprocess output stays readable.
pub(crate) struct TileProgress {
    progress_bar: ProgressBar,
}

impl TileProgress {
    pub(crate) fn new(len: usize, verbose: bool) -> Self {
        if verbose {
            return Self {
                progress_bar: ProgressBar::hidden(),
            };
        }

        let progress_bar = ProgressBar::new(len as u64);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        Self { progress_bar }
    }

    pub(crate) fn stage(&self, tile: &Tile, stage: TileStage) {
        tracing::debug!("{} -> {:?}", tile.file_name(), stage);
        self.progress_bar
            .set_message(format!("{} {:?}", tile.file_name(), stage));
        if stage == TileStage::Done {
            self.progress_bar.inc(1);
        }
    }

    /// Hides the bar while `f` runs, so log lines are not drawn over it.
    pub(crate) fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.progress_bar.suspend(f)
    }

    pub(crate) fn skip(&self) {
        self.progress_bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_suspend_runs_closure_and_keeps_position() {
        let progress = TileProgress::new(2, false);
        let tile = Tile::from_path(PathBuf::from("/p/tiles/tiles_0.png")).unwrap();

        progress.stage(&tile, TileStage::Done);
        let logged = progress.suspend(|| tile.index + 1);

        assert_eq!(logged, 1);
        assert_eq!(progress.progress_bar.position(), 1);
        progress.finish();
    }

    #[test]
    fn test_verbose_progress_is_hidden() {
        let progress = TileProgress::new(4, true);
        assert!(progress.progress_bar.is_hidden());
        assert_eq!(progress.suspend(|| "shown"), "shown");
    }
}
