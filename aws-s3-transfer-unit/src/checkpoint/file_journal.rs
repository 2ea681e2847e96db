/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Journal, WindowSnapshot};
use crate::error;

const HEADER: &str = "# aws-s3-transfer-unit checkpoint v1";

/// A [`Journal`] that keeps the window in a small text file.
///
/// Each write goes to a sibling temporary file that is synced and then renamed over the
/// journal, so a crash leaves either the previous or the new window on disk.
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
}

impl FileJournal {
    /// Create a journal writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last persisted window, or `None` if nothing was persisted yet.
    pub async fn load(&self) -> Result<Option<WindowSnapshot>, error::Error> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        decode(&contents).map(Some)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl Journal for FileJournal {
    async fn persist(&self, snapshot: &WindowSnapshot) -> Result<(), error::Error> {
        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(encode(snapshot).as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

fn encode(snapshot: &WindowSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    let _ = writeln!(out, "transferred {}", snapshot.bytes_transferred);
    let _ = writeln!(out, "committed {}", snapshot.committed_chunks);
    for offset in &snapshot.pending {
        let _ = writeln!(out, "pending {offset}");
    }
    out
}

fn decode(contents: &str) -> Result<WindowSnapshot, error::Error> {
    let mut lines = contents.lines();
    if lines.next() != Some(HEADER) {
        return Err(error::invalid_input("checkpoint journal has an unknown header"));
    }

    let mut snapshot = WindowSnapshot::default();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        let (field, value) = line
            .split_once(' ')
            .ok_or_else(|| error::invalid_input(format!("malformed journal line: {line:?}")))?;
        let value: u64 = value
            .trim()
            .parse()
            .map_err(|_| error::invalid_input(format!("malformed journal value: {line:?}")))?;
        match field {
            "transferred" => snapshot.bytes_transferred = value,
            "committed" => snapshot.committed_chunks = value,
            "pending" => {
                snapshot.pending.insert(value);
            }
            other => {
                return Err(error::invalid_input(format!(
                    "unknown journal field: {other:?}"
                )))
            }
        }
    }
    Ok(snapshot)
}
