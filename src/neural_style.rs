use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;

use crate::errors::Result;
use crate::runner::{path_arg, ExternalCommand, ProcessRunner};
use crate::tiles::{is_numbered_name, TILE_EXTENSION};
use crate::traits::StyleTransfer;

pub const FULL_ITERATIONS: u32 = 1500;
pub const HALF_ITERATIONS: u32 = 500;
pub const FAST_ITERATIONS: u32 = 5;

/// Output file name the tool writes into its working directory.
pub const OUTPUT_IMAGE: &str = "out.png";

/// Whether `name` is a file the tool writes: the final `out.png` or an
/// intermediate `out_<iteration>.png`.
pub fn is_output_name(name: &str) -> bool {
    name == OUTPUT_IMAGE || is_numbered_name(name, "out", TILE_EXTENSION)
}

/// Relative weights of the style reference and the content tile when the
/// tile is blended in as a second style image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendWeights {
    pub style: u32,
    pub content: u32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            style: 7,
            content: 2,
        }
    }
}

impl fmt::Display for BlendWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.style, self.content)
    }
}

impl FromStr for BlendWeights {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (style, content) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `<style>,<content>`, got `{}`", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid weight `{}`: {}", v, e))
        };
        Ok(Self {
            style: parse(style)?,
            content: parse(content)?,
        })
    }
}

/// Parameters for stylizing one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRequest {
    /// Staged tile inside the tool's working directory.
    pub content: PathBuf,
    pub style: PathBuf,
    /// Blend the content tile in as a second style image with these weights.
    pub blend: Option<BlendWeights>,
    pub image_size: u32,
    pub iterations: u32,
    pub use_gpu: bool,
    pub original_colors: bool,
}

/// `th neural_style.lua` from a neural-style checkout.
#[derive(Debug, Clone)]
pub struct NeuralStyle {
    runner: ProcessRunner,
    checkout: PathBuf,
}

impl NeuralStyle {
    pub fn new(runner: ProcessRunner, checkout: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            checkout: checkout.into(),
        }
    }

    pub fn command(&self, request: &StyleRequest) -> ExternalCommand {
        let mut style_images = request.style.as_os_str().to_os_string();
        let mut command = ExternalCommand::new("th")
            .arg("neural_style.lua")
            .current_dir(&self.checkout);

        if let Some(weights) = request.blend {
            style_images.push(",");
            style_images.push(request.content.as_os_str());
            command = command
                .arg("-style_image")
                .arg(style_images)
                .arg("-style_blend_weights")
                .arg(weights.to_string());
        } else {
            command = command.arg("-style_image").arg(style_images);
        }

        command = command
            .arg("-content_image")
            .arg(path_arg(&request.content))
            .arg("-original_colors")
            .arg(if request.original_colors { "1" } else { "0" })
            .arg("-image_size")
            .arg(request.image_size.to_string())
            .arg("-num_iterations")
            .arg(request.iterations.to_string())
            .arg("-output_image")
            .arg(OUTPUT_IMAGE);

        if request.use_gpu {
            command.args(["-backend", "cudnn"])
        } else {
            command.args(["-backend", "nn", "-gpu", "-1"])
        }
    }
}

#[async_trait]
impl StyleTransfer for NeuralStyle {
    fn working_dir(&self) -> &Path {
        &self.checkout
    }

    async fn stylize(&self, request: &StyleRequest) -> Result<PathBuf> {
        self.runner.run(&self.command(request)).await?;
        Ok(self.checkout.join(OUTPUT_IMAGE))
    }
}
