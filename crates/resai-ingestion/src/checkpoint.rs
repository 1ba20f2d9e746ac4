//! Batch checkpointer: groups enriched records into numbered batches and
//! writes each as one JSON file.
//!
//! A batch is flushed when it reaches `batch_size` or the input ends, so a
//! short final batch is still written. Files are named after the 1-based
//! inclusive record range they hold (`articles_6_to_7.json`).

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode batch {index}: {source}")]
    Encode {
        index: usize,
        source: serde_json::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Position of a batch in the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpan {
    /// 1-based batch number.
    pub index: usize,
    /// 1-based inclusive record range.
    pub first: usize,
    pub last: usize,
}

impl BatchSpan {
    pub fn count(&self) -> usize {
        self.last + 1 - self.first
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub span: BatchSpan,
    pub records: Vec<T>,
}

/// Accumulates items and hands out numbered batches.
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    buffer: Vec<T>,
    batch_size: usize,
    emitted: usize,
    next_index: usize,
}

impl<T> BatchAccumulator<T> {
    pub fn new(batch_size: usize) -> Result<Self, CheckpointError> {
        if batch_size == 0 {
            return Err(CheckpointError::InvalidBatchSize);
        }
        Ok(Self::with_size(batch_size))
    }

    fn with_size(batch_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            emitted: 0,
            next_index: 1,
        }
    }

    /// Add an item. Returns the batch if the buffer is now full.
    pub fn push(&mut self, item: T) -> Option<Batch<T>> {
        self.buffer.push(item);
        if self.buffer.len() >= self.batch_size {
            self.flush()
        } else {
            None
        }
    }

    /// Flush whatever is buffered as a (possibly short) batch.
    pub fn flush(&mut self) -> Option<Batch<T>> {
        if self.buffer.is_empty() {
            return None;
        }
        let records = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let span = self.advance(records.len());
        Some(Batch { span, records })
    }

    /// Span the next batch will cover when `remaining` items are left in the stream.
    /// Only meaningful on a batch boundary.
    pub fn upcoming_span(&self, remaining: usize) -> Option<BatchSpan> {
        if !self.buffer.is_empty() || remaining == 0 {
            return None;
        }
        let count = remaining.min(self.batch_size);
        Some(BatchSpan {
            index: self.next_index,
            first: self.emitted + 1,
            last: self.emitted + count,
        })
    }

    /// Account for `count` items that are already persisted elsewhere.
    /// Must be called on a batch boundary.
    pub fn skip(&mut self, count: usize) -> BatchSpan {
        debug_assert!(self.buffer.is_empty(), "skip inside a partially filled batch");
        self.advance(count)
    }

    fn advance(&mut self, count: usize) -> BatchSpan {
        let span = BatchSpan {
            index: self.next_index,
            first: self.emitted + 1,
            last: self.emitted + count,
        };
        self.emitted += count;
        self.next_index += 1;
        span
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// A batch file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHandle {
    pub span: BatchSpan,
    pub path: PathBuf,
    /// The file already existed and was left untouched.
    pub reused: bool,
}

#[derive(Debug, Clone)]
pub struct BatchCheckpointer {
    dir: PathBuf,
    batch_size: usize,
    resume: bool,
}

impl BatchCheckpointer {
    pub fn new(dir: impl Into<PathBuf>, batch_size: usize) -> Result<Self, CheckpointError> {
        if batch_size == 0 {
            return Err(CheckpointError::InvalidBatchSize);
        }
        Ok(Self { dir: dir.into(), batch_size, resume: false })
    }

    /// Keep existing batch files instead of rewriting them.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn resume(&self) -> bool {
        self.resume
    }

    pub fn accumulator<T>(&self) -> BatchAccumulator<T> {
        BatchAccumulator::with_size(self.batch_size)
    }

    pub fn file_name(span: &BatchSpan) -> String {
        format!("articles_{}_to_{}.json", span.first, span.last)
    }

    pub fn path_for(&self, span: &BatchSpan) -> PathBuf {
        self.dir.join(Self::file_name(span))
    }

    /// Records already on disk for `span`, when resume is on and the file
    /// decodes to exactly `span.count()` records.
    pub fn load_existing<T: DeserializeOwned>(&self, span: &BatchSpan) -> Option<Vec<T>> {
        if !self.resume {
            return None;
        }
        let path = self.path_for(span);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(records) if records.len() == span.count() => Some(records),
            Ok(records) => {
                warn!(
                    path = %path.display(),
                    found = records.len(),
                    expected = span.count(),
                    "Batch file is incomplete, rewriting"
                );
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Batch file is unreadable, rewriting");
                None
            }
        }
    }

    /// Handle for a batch whose existing file was kept.
    pub fn reused(&self, span: BatchSpan) -> BatchHandle {
        BatchHandle { path: self.path_for(&span), span, reused: true }
    }

    /// Writes one batch atomically (temp file in the same directory, then rename).
    /// With resume on, a file already holding exactly these records is kept.
    pub fn write_batch<T: Serialize>(&self, batch: &Batch<T>) -> Result<BatchHandle, CheckpointError> {
        if let Some(existing) = self.load_existing::<Value>(&batch.span) {
            let current = serde_json::to_value(&batch.records).map_err(|source| CheckpointError::Encode {
                index: batch.span.index,
                source,
            })?;
            if Value::Array(existing) == current {
                debug!(index = batch.span.index, "Batch file already holds these records, keeping it");
                return Ok(self.reused(batch.span));
            }
            warn!(index = batch.span.index, "Batch file holds other records, rewriting");
        }

        std::fs::create_dir_all(&self.dir).map_err(io_at(&self.dir))?;

        let path = self.path_for(&batch.span);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_at(&self.dir))?;
        serde_json::to_writer_pretty(&mut tmp, &batch.records).map_err(|source| CheckpointError::Encode {
            index: batch.span.index,
            source,
        })?;
        tmp.flush().map_err(io_at(&path))?;
        tmp.persist(&path).map_err(|e| CheckpointError::Io { path: path.clone(), source: e.error })?;

        info!(
            index = batch.span.index,
            first = batch.span.first,
            last = batch.span.last,
            path = %path.display(),
            "Batch persisted"
        );
        Ok(BatchHandle { span: batch.span, path, reused: false })
    }

    /// Batches and writes a whole record stream.
    pub fn persist<T, I>(&self, records: I) -> Result<Vec<BatchHandle>, CheckpointError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let mut acc = self.accumulator();
        let mut handles = Vec::new();
        for record in records {
            if let Some(batch) = acc.push(record) {
                handles.push(self.write_batch(&batch)?);
            }
        }
        if let Some(batch) = acc.flush() {
            handles.push(self.write_batch(&batch)?);
        }
        Ok(handles)
    }

    /// Reads the records of a persisted batch back.
    pub fn read_batch<T: DeserializeOwned>(&self, handle: &BatchHandle) -> Result<Vec<T>, CheckpointError> {
        let bytes = std::fs::read(&handle.path).map_err(io_at(&handle.path))?;
        serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Decode {
            path: handle.path.clone(),
            source,
        })
    }
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> CheckpointError {
    let path = path.to_path_buf();
    move |source| CheckpointError::Io { path, source }
}
