use std::path::{Path, PathBuf};

use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use super::error::EngineResult;

/// Line-oriented JSON table file: one entity per line. Inserts append,
/// updates and deletes rewrite the whole file. The tracked corpus is small
/// enough that rewriting beats maintaining an index.
pub(crate) struct TableFile {
    path: PathBuf,
}

impl TableFile {
    pub fn new(dir: &Path, name: &str) -> EngineResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(name),
        })
    }

    /// Reads every row, skipping lines that don't parse. A shutdown can cut
    /// a write short, so a corrupt tail must not poison the table.
    pub async fn load<T: DeserializeOwned>(&self) -> EngineResult<Vec<T>> {
        debug!("Loading table {:?}", self.path);
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let buffer = BufReader::new(file);
        let mut lines = buffer.lines();
        let mut rows = vec![];
        while let Ok(Some(line)) = lines.next_line().await {
            match serde_json::from_str::<T>(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(
                        "During parsing in path {:?} found illegal json string {}: {e}",
                        self.path, &line
                    )
                }
            }
        }
        lines.into_inner().into_inner().unlock_async().await?;
        Ok(rows)
    }

    pub async fn append<T: Serialize>(&self, row: &T) -> EngineResult<()> {
        let mut file = File::options()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = Self::write_rows(&mut file, std::slice::from_ref(row)).await;
        file.unlock_async().await?;
        result
    }

    pub async fn rewrite<T: Serialize>(&self, rows: &[T]) -> EngineResult<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = Self::write_rows(&mut file, rows).await;
        file.unlock_async().await?;
        result
    }

    async fn write_rows<T: Serialize>(file: &mut File, rows: &[T]) -> EngineResult<()> {
        let mut buffer = Vec::<u8>::new();
        for row in rows {
            serde_json::to_writer(&mut buffer, row)?;
            buffer.push(b'\n');
        }
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}
