//! ImageMagick command-line engine.
//!
//! Every invocation is an explicit argument vector handed to
//! [`tokio::process::Command`]; nothing is interpolated into a shell string.
//! Output is streamed back on stdout (`jpg:-` / `png:-`) so no temporary files
//! are involved. Child processes are killed when their future is dropped,
//! which is what happens when a caller's timeout expires.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::debug;

use crate::error::TileError;
use crate::tile::{CropRegion, TileFormat};

use super::RasterEngine;

/// Locations of the ImageMagick executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagickPrograms {
    pub convert: PathBuf,
    pub identify: PathBuf,
}

impl Default for MagickPrograms {
    fn default() -> Self {
        Self {
            convert: PathBuf::from("convert"),
            identify: PathBuf::from("identify"),
        }
    }
}

/// Raster engine backed by `convert` and `identify`.
#[derive(Debug, Clone, Default)]
pub struct MagickEngine {
    programs: MagickPrograms,
}

impl MagickEngine {
    pub fn new(programs: MagickPrograms) -> Self {
        Self { programs }
    }

    /// Run a program and return its stdout.
    ///
    /// Non-zero exit and empty stdout are both conversion failures.
    async fn run(&self, program: &Path, args: Vec<OsString>) -> Result<Vec<u8>, TileError> {
        debug!(program = %program.display(), args = ?args, "Running ImageMagick");

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TileError::conversion(format!("failed to run {}: {}", program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TileError::conversion(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(TileError::conversion(format!(
                "{} produced no output",
                program.display()
            )));
        }

        Ok(output.stdout)
    }
}

/// `path[index]`, ImageMagick's frame/page selector.
fn frame(source: &Path, index: u32) -> OsString {
    let mut arg = source.as_os_str().to_os_string();
    arg.push(format!("[{}]", index));
    arg
}

fn crop_args(source: &Path, region: CropRegion, format: TileFormat, quality: u8) -> Vec<OsString> {
    vec![
        frame(source, 0),
        OsString::from("-crop"),
        OsString::from(format!(
            "{}x{}+{}+{}",
            region.width, region.height, region.x, region.y
        )),
        OsString::from("+repage"),
        OsString::from("-resize"),
        OsString::from(format!("{}x{}!", region.output_size, region.output_size)),
        OsString::from("-quality"),
        OsString::from(quality.to_string()),
        OsString::from(format!("{}:-", format.extension())),
    ]
}

fn page_args(source: &Path, page_index: u32, dpi: u32, quality: u8) -> Vec<OsString> {
    vec![
        OsString::from("-density"),
        OsString::from(dpi.to_string()),
        frame(source, page_index),
        OsString::from("-background"),
        OsString::from("white"),
        OsString::from("-alpha"),
        OsString::from("remove"),
        OsString::from("-quality"),
        OsString::from(quality.to_string()),
        OsString::from("jpg:-"),
    ]
}

fn count_args(source: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-format"),
        OsString::from("%n\n"),
        source.as_os_str().to_os_string(),
    ]
}

/// First line of `identify -format "%n\n"` output.
fn parse_page_count(stdout: &[u8]) -> Result<u32, TileError> {
    let text = String::from_utf8_lossy(stdout);
    let first = text.lines().next().unwrap_or_default().trim();
    match first.parse::<u32>() {
        Ok(0) | Err(_) => Err(TileError::conversion(format!(
            "unexpected page count output {:?}",
            first
        ))),
        Ok(count) => Ok(count),
    }
}

#[async_trait]
impl RasterEngine for MagickEngine {
    async fn crop_resize(
        &self,
        source: &Path,
        region: CropRegion,
        format: TileFormat,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        let args = crop_args(source, region, format, quality);
        self.run(&self.programs.convert, args).await.map(Bytes::from)
    }

    async fn rasterize_page(
        &self,
        source: &Path,
        page_index: u32,
        dpi: u32,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        let args = page_args(source, page_index, dpi, quality);
        match self.run(&self.programs.convert, args).await {
            Ok(stdout) => Ok(Bytes::from(stdout)),
            // Only count pages once convert has failed
            Err(err) => match self.page_count(source).await {
                Ok(page_count) if page_index >= page_count => Err(TileError::PageOutOfRange {
                    page: page_index.saturating_add(1),
                    page_count,
                }),
                _ => Err(err),
            },
        }
    }

    async fn page_count(&self, source: &Path) -> Result<u32, TileError> {
        let stdout = self.run(&self.programs.identify, count_args(source)).await?;
        parse_page_count(&stdout)
    }
}
