use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::errors::{GridifyError, Result};
use crate::neural_style::{BlendWeights, FAST_ITERATIONS, FULL_ITERATIONS, HALF_ITERATIONS};

/// Number of leading tiles stylized under `--fast`.
pub const FAST_TILE_LIMIT: usize = 3;

pub const TILES_DIR: &str = "tiles";
pub const OUTPUT_DIR: &str = "output";
pub const OUTPUT_FILE: &str = "output.png";

/// Which implementation does probing, cropping and reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// ImageMagick `identify` / `convert`
    Magick,
    /// Built-in decoder and compositor
    Native,
}

/// What to do when the style tool fails on one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run; tiles finished so far stay on disk.
    #[default]
    Abort,
    /// Put the tile back untouched and carry on with the next one.
    SkipTile,
}

/// Split an image into tiles, stylize each tile with neural-style and
/// reassemble the result.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input image, relative to the project root
    #[arg(long, default_value = "algorithm14.png")]
    pub file: PathBuf,

    /// Style reference image [default: the input image]
    #[arg(long)]
    pub style: Option<PathBuf>,

    /// Bypass style transfer; tiles are reassembled unmodified
    #[arg(long = "skip-nn")]
    pub skip_nn: bool,

    /// Only stylize the first 3 tiles, 5 iterations each
    #[arg(long)]
    pub fast: bool,

    /// Use 500 iterations instead of 1500
    #[arg(long)]
    pub half: bool,

    /// Run the style tool on the CPU
    #[arg(long = "no-gpu")]
    pub no_gpu: bool,

    /// Echo every subprocess command and forward its output
    #[arg(long)]
    pub verbose: bool,

    #[arg(long, default_value_t = 512, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_tile_size: u32,

    /// Directory holding `tiles/` and `output/`
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    /// neural-style checkout; the tool's shared working directory
    #[arg(long, default_value = "~/torch/neural-style")]
    pub neural_style_dir: String,

    #[arg(long, value_enum, default_value_t = Backend::Magick)]
    pub backend: Backend,

    /// Style and content weights when blending the tile in as a second style
    #[arg(long, default_value = "7,2")]
    pub style_blend: BlendWeights,

    /// Use the style image alone
    #[arg(long)]
    pub no_blend: bool,

    /// Keep going when a tile fails to stylize, leaving it untouched
    #[arg(long)]
    pub skip_failed_tiles: bool,
}

/// Run configuration, resolved once at startup and read everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub style: PathBuf,
    pub max_tile_size: u32,
    pub tiles_dir: PathBuf,
    pub output_dir: PathBuf,
    pub neural_style_dir: PathBuf,
    pub backend: Backend,
    pub skip_style_transfer: bool,
    pub fast: bool,
    pub half: bool,
    pub use_gpu: bool,
    pub verbose: bool,
    pub blend: Option<BlendWeights>,
    pub original_colors: bool,
    pub failure_policy: FailurePolicy,
}

impl Config {
    /// Resolves paths against the project root and checks that the input
    /// and style images exist. A missing file is reported here as
    /// [`GridifyError::Configuration`], before any directory is reset; the
    /// dimension probe only reports [`GridifyError::Probe`] for files that
    /// vanish or fail to decode after this point.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let root = absolute(&cli.project_root)?;
        let input = root.join(&cli.file);
        let style = cli.style.map_or_else(|| input.clone(), |style| root.join(style));

        for (what, path) in [("input image", &input), ("style image", &style)] {
            if !path.is_file() {
                return Err(GridifyError::Configuration {
                    message: format!("{} {} does not exist", what, path.display()),
                });
            }
        }

        Ok(Self {
            input,
            style,
            max_tile_size: cli.max_tile_size,
            tiles_dir: root.join(TILES_DIR),
            output_dir: root.join(OUTPUT_DIR),
            neural_style_dir: expand_home(&cli.neural_style_dir)?,
            backend: cli.backend,
            skip_style_transfer: cli.skip_nn,
            fast: cli.fast,
            half: cli.half,
            use_gpu: !cli.no_gpu,
            verbose: cli.verbose,
            blend: (!cli.no_blend).then_some(cli.style_blend),
            original_colors: true,
            failure_policy: if cli.skip_failed_tiles {
                FailurePolicy::SkipTile
            } else {
                FailurePolicy::Abort
            },
        })
    }

    pub const fn iterations(&self) -> u32 {
        if self.fast {
            FAST_ITERATIONS
        } else if self.half {
            HALF_ITERATIONS
        } else {
            FULL_ITERATIONS
        }
    }

    /// How many leading tiles get stylized; `None` means all of them.
    pub const fn tile_limit(&self) -> Option<usize> {
        if self.fast {
            Some(FAST_TILE_LIMIT)
        } else {
            None
        }
    }

    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| GridifyError::file_system(path, "current directory lookup", e))
}

/// Resolves a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let Some(rest) = path.strip_prefix("~/").or_else(|| (path == "~").then_some("")) else {
        return Ok(PathBuf::from(path));
    };
    let home = dirs::home_dir().ok_or_else(|| GridifyError::Configuration {
        message: format!("cannot resolve {}: home directory unknown", path),
    })?;
    Ok(home.join(rest))
}
