//! Tile naming, enumeration and numeric ordering.
//!
//! Tiles are written as `tiles_<index>.png` by the crop step. Directory
//! listings come back in arbitrary or lexicographic order (`tiles_10` before
//! `tiles_2`), while reassembly derives each tile's position from its index,
//! so every collection here is sorted by the parsed index.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::errors::{GridifyError, Result};
use crate::geometry::TilingGeometry;
use crate::workspace::is_image;

pub const TILE_PREFIX: &str = "tiles";
pub const TILE_EXTENSION: &str = "png";

pub fn tile_file_name(index: usize) -> String {
    format!("{}_{}.{}", TILE_PREFIX, index, TILE_EXTENSION)
}

/// printf-style output pattern handed to the crop tool.
pub fn crop_pattern() -> String {
    format!("{}_%d.{}", TILE_PREFIX, TILE_EXTENSION)
}

/// Whether `name` is exactly `<prefix>_<digits>.<extension>`.
pub(crate) fn is_numbered_name(name: &str, prefix: &str, extension: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(extension))
        .and_then(|rest| rest.strip_suffix('.'))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether `name` is a file name the crop step writes.
pub fn is_tile_name(name: &str) -> bool {
    is_numbered_name(name, TILE_PREFIX, TILE_EXTENSION)
}

/// First run of ASCII digits in the file name, if any.
pub fn index_from_name(name: &str) -> Option<usize> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: String = name[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// One cropped tile in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub index: usize,
    pub path: PathBuf,
}

impl Tile {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let index = index_from_name(path.file_name()?.to_str()?)?;
        Some(Self { index, path })
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// File name without extension; names the tile's archive directory.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    pub const fn grid_position(&self, geometry: &TilingGeometry) -> (u32, u32) {
        geometry.grid_position(self.index)
    }

    pub const fn offset(&self, geometry: &TilingGeometry) -> (u32, u32) {
        geometry.offset(self.index)
    }
}

/// All tiles of a run in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileCollection {
    tiles: Vec<Tile>,
}

impl TileCollection {
    pub fn new(mut tiles: Vec<Tile>) -> Self {
        tiles.sort_by_key(|tile| tile.index);
        Self { tiles }
    }

    /// Builds a collection from file paths, dropping names without an index.
    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let tiles = paths
            .into_iter()
            .filter_map(|path| {
                let tile = Tile::from_path(path.clone());
                if tile.is_none() {
                    warn!("Ignoring file without a tile index: {}", path.display());
                }
                tile
            })
            .collect();
        Self::new(tiles)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn as_slice(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.tiles.iter().map(Tile::file_name).collect()
    }
}

impl<'a> IntoIterator for &'a TileCollection {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

/// Lists the tile images directly inside `dir`, ordered by index.
///
/// Subdirectories (per-tile archives) and non-image files are skipped.
pub fn list_tiles(dir: &Path) -> Result<TileCollection> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| GridifyError::FileSystem {
            path: dir.to_path_buf(),
            operation: "tile listing".to_string(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(TileCollection::from_paths(paths))
}

/// [`list_tiles`] on the blocking pool, for use inside the pipeline.
pub async fn collect_tiles(dir: &Path) -> Result<TileCollection> {
    let owned = dir.to_path_buf();
    tokio::task::spawn_blocking(move || list_tiles(&owned))
        .await
        .map_err(|e| GridifyError::FileSystem {
            path: dir.to_path_buf(),
            operation: "tile listing".to_string(),
            source: std::io::Error::other(e),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        assert_eq!(tile_file_name(0), "tiles_0.png");
        assert_eq!(tile_file_name(12), "tiles_12.png");
        assert_eq!(crop_pattern(), "tiles_%d.png");
    }

    #[test]
    fn test_index_from_name() {
        assert_eq!(index_from_name("tiles_0.png"), Some(0));
        assert_eq!(index_from_name("tiles_117.png"), Some(117));
        assert_eq!(index_from_name("tiles.png"), None);
        assert_eq!(index_from_name(".DS_Store"), None);
    }

    #[test]
    fn test_is_tile_name() {
        assert!(is_tile_name("tiles_0.png"));
        assert!(is_tile_name("tiles_117.png"));
        assert!(!is_tile_name("tiles_.png"));
        assert!(!is_tile_name("tiles_3.jpg"));
        assert!(!is_tile_name("tiles_3"));
        assert!(!is_tile_name("my_tiles_3.png"));
        assert!(!is_tile_name("tiles_3a.png"));
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        let mut names: Vec<String> = (0..12).map(tile_file_name).collect();
        names.sort();
        assert_eq!(names[2], "tiles_10.png");

        let collection = TileCollection::from_paths(names.into_iter().map(PathBuf::from));
        let ordered = collection.file_names();
        let expected: Vec<String> = (0..12).map(tile_file_name).collect();
        assert_eq!(ordered, expected);

        let two = ordered.iter().position(|n| *n == "tiles_2.png").unwrap();
        let ten = ordered.iter().position(|n| *n == "tiles_10.png").unwrap();
        assert!(two < ten);
    }

    #[test]
    fn test_tile_stem_and_offsets() {
        let tile = Tile::from_path(PathBuf::from("/tmp/tiles/tiles_4.png")).unwrap();
        assert_eq!(tile.index, 4);
        assert_eq!(tile.file_name(), "tiles_4.png");
        assert_eq!(tile.stem(), "tiles_4");

        let geometry = TilingGeometry {
            tile_size: 350,
            columns: 3,
            rows: 2,
        };
        assert_eq!(tile.grid_position(&geometry), (1, 1));
        assert_eq!(tile.offset(&geometry), (350, 350));
    }

    #[test]
    fn test_list_tiles_skips_directories_and_other_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        for index in [10, 2, 0, 1, 11, 9] {
            std::fs::write(temp_dir.path().join(tile_file_name(index)), b"x")?;
        }
        std::fs::create_dir(temp_dir.path().join("tiles_3"))?;
        std::fs::write(temp_dir.path().join("notes.txt"), b"x")?;

        let tiles = list_tiles(temp_dir.path())?;
        let indices: Vec<usize> = tiles.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 9, 10, 11]);
        Ok(())
    }

    #[tokio::test]
    async fn test_collect_tiles_off_the_runtime() -> Result<()> {
        let temp_dir = TempDir::new()?;
        for index in [3, 12, 0] {
            std::fs::write(temp_dir.path().join(tile_file_name(index)), b"x")?;
        }
        std::fs::create_dir(temp_dir.path().join("tiles_1"))?;

        let tiles = collect_tiles(temp_dir.path()).await?;
        assert_eq!(tiles.file_names(), vec!["tiles_0.png", "tiles_3.png", "tiles_12.png"]);

        let missing = collect_tiles(&temp_dir.path().join("nope")).await;
        assert!(matches!(missing, Err(GridifyError::FileSystem { .. })));
        Ok(())
    }

    #[test]
    fn test_list_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_tiles(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(GridifyError::FileSystem { .. })));
    }
}
