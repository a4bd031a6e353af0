use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{GridifyError, Result};
use crate::neural_style::{StyleRequest, OUTPUT_IMAGE};
use crate::tiles::{index_from_name, is_tile_name};
use crate::traits::StyleTransfer;
use crate::workspace::image_files_in;

/// Style transfer stand-in for tests: "stylizes" by inverting the colours of
/// the content tile and records every request it receives.
#[derive(Debug)]
pub struct MockStyleTransfer {
    working_dir: PathBuf,
    fail_on: Option<usize>,
    requests: Mutex<Vec<StyleRequest>>,
    max_staged_tiles: Mutex<usize>,
}

impl MockStyleTransfer {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            fail_on: None,
            requests: Mutex::new(Vec::new()),
            max_staged_tiles: Mutex::new(0),
        }
    }

    /// Fails the request whose content tile has this index.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn requests(&self) -> Vec<StyleRequest> {
        self.requests.lock().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Most tile files seen in the working directory during any request.
    pub fn max_staged_tiles(&self) -> usize {
        *self.max_staged_tiles.lock()
    }
}

#[async_trait]
impl StyleTransfer for MockStyleTransfer {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    async fn stylize(&self, request: &StyleRequest) -> Result<PathBuf> {
        self.requests.lock().push(request.clone());

        let staged = image_files_in(&self.working_dir)
            .await?
            .iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(is_tile_name)
            })
            .count();
        {
            let mut max = self.max_staged_tiles.lock();
            *max = (*max).max(staged);
        }

        let index = request
            .content
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(index_from_name);
        if index.is_some() && index == self.fail_on {
            return Err(GridifyError::Subprocess {
                command: format!("mock-style {}", request.content.display()),
                reason: "exited with status 1".to_string(),
                source: None,
            });
        }

        let mut image = image::open(&request.content)?;
        image.invert();
        let output = self.working_dir.join(OUTPUT_IMAGE);
        image.save(&output)?;
        // intermediate frame, as the real tool writes every few iterations
        image.save(self.working_dir.join("out_1.png"))?;
        Ok(output)
    }
}
