//! PDF pages to PNG images via `pdftoppm`

use crate::error::{Result, ResumeTailorError};
use crate::typeset::latex::spawn_error;
use log::debug;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const PAGE_PREFIX: &str = "page";

pub async fn rasterize_pdf(program: &str, dpi: u32, pdf: &[u8]) -> Result<Vec<Vec<u8>>> {
    let dir = tempfile::Builder::new().prefix("resume-tailor-raster-").tempdir()?;
    let input = dir.path().join("document.pdf");
    tokio::fs::write(&input, pdf).await?;

    let output = Command::new(program)
        .arg("-png")
        .arg("-r")
        .arg(dpi.to_string())
        .arg(&input)
        .arg(dir.path().join(PAGE_PREFIX))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| spawn_error(program, e))?;

    if !output.status.success() {
        return Err(ResumeTailorError::CompileError(format!(
            "{} failed: {}",
            program,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let pages = page_files(dir.path())?;
    let mut images = Vec::with_capacity(pages.len());
    for (_, path) in pages {
        images.push(tokio::fs::read(&path).await?);
    }
    debug!("Rasterized {} page(s) at {} dpi", images.len(), dpi);
    Ok(images)
}

/// `page-1.png`, `page-01.png`, ... sorted by page number.
fn page_files(dir: &Path) -> Result<Vec<(usize, std::path::PathBuf)>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(page_number);
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

fn page_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
