//! Transient zip handling for the download and submission pipelines.

use std::path::{Component, Path, PathBuf};

use async_zip::base::read::stream::ZipFileReader;
use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

use crate::error::Result;

/// Extracts a zip archive into `dest`, creating it as needed. Entry paths are
/// sanitized; entries that escape `dest` are skipped rather than written.
pub async fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).await?;
    let mut zip = ZipFileReader::new(file.compat());

    loop {
        match zip.next_with_entry().await? {
            Some(mut zip_reading) => {
                let reader = zip_reading.reader_mut();
                let filename = reader.entry().filename().as_str()?.to_owned();

                match sanitized(&filename) {
                    None => warn!(%filename, "skipping unsafe zip entry"),
                    Some(relative) => {
                        let target = dest.join(relative);
                        if filename.ends_with('/') {
                            fs::create_dir_all(&target).await?;
                        } else {
                            if let Some(parent) = target.parent() {
                                fs::create_dir_all(parent).await?;
                            }
                            let mut buf = Vec::new();
                            reader.read_to_end_checked(&mut buf).await?;
                            debug!(%filename, num_bytes = buf.len(), "extracted zip entry");
                            fs::write(&target, buf).await?;
                        }
                    }
                }

                zip = zip_reading.skip().await?;
            }
            None => break,
        }
    }

    Ok(())
}

/// Packages `src_dir` into a zip at `archive_path`, with every entry placed
/// under a `root_name/` prefix, at maximum deflate compression. The writer is
/// fully closed and flushed before returning; the upload that follows reads
/// the finished file from disk.
pub async fn create_zip(src_dir: &Path, root_name: &str, archive_path: &Path) -> Result<()> {
    let file = fs::File::create(archive_path).await?;
    let mut writer = ZipFileWriter::new(file.compat_write());

    for (path, relative) in collect_files(src_dir).await? {
        let data = fs::read(&path).await?;
        debug!(file = %path.display(), num_bytes = data.len(), "adding zip entry");
        let entry = ZipEntryBuilder::new(
            format!("{root_name}/{relative}").into(),
            Compression::Deflate,
        )
        .deflate_option(DeflateOption::Maximum);
        writer.write_entry_whole(entry, &data).await?;
    }

    let mut inner = writer.close().await?.into_inner();
    inner.shutdown().await?;
    Ok(())
}

/// All regular files under `root`, paired with their `/`-separated relative
/// paths, in a stable order.
async fn collect_files(root: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    let mut stack = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push((entry.path(), relative));
            } else if file_type.is_file() {
                files.push((entry.path(), relative));
            }
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

fn sanitized(filename: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(filename).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}
