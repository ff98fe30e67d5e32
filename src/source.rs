//! CSV reading and writing for the flat input and output files.
//!
//! Inputs ending in `.gz` are transparently decompressed. Malformed rows are
//! logged and dropped; an unreadable file is an error, which
//! [`load_or_empty`] turns into an empty dataset.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::error::SourceError;
use crate::records::ScheduleEvent;

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn open_input(path: &Path) -> Result<Box<dyn Read>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn csv_reader(path: &Path) -> Result<csv::Reader<Box<dyn Read>>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(open_input(path)?);
    // Forces the header row to be read so a broken file fails here.
    reader.headers().map_err(|source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(reader)
}

/// Reads every well-formed row of a CSV file.
///
/// Rows that fail to deserialize are logged and skipped. An I/O failure part
/// way through aborts the read.
pub fn read_rows<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, SourceError> {
    let path = path.as_ref();
    let mut reader = csv_reader(path)?;
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => {
                return Err(SourceError::Csv {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                dropped += 1;
                warn!(path = %path.display(), error = %e, "Dropping malformed row");
            }
        }
    }

    debug!(path = %path.display(), rows = rows.len(), dropped, "CSV loaded");
    Ok(rows)
}

/// Like [`read_rows`], but a failure yields an empty dataset.
///
/// Callers must treat an empty result as "no data for this run".
pub fn load_or_empty<T: DeserializeOwned>(path: impl AsRef<Path>, what: &str) -> Vec<T> {
    let path = path.as_ref();
    match read_rows(path) {
        Ok(rows) => {
            info!(source = what, path = %path.display(), rows = rows.len(), "Source loaded");
            rows
        }
        Err(e) => {
            error!(source = what, error = %e, "Source unavailable, continuing with no rows");
            Vec::new()
        }
    }
}

/// Streams schedule events from a stop times file without retaining them.
pub struct ScheduleStream {
    path: PathBuf,
    rows: csv::DeserializeRecordsIntoIter<Box<dyn Read>, ScheduleEvent>,
    dropped: usize,
    error: Option<csv::Error>,
}

impl ScheduleStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = csv_reader(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            rows: reader.into_deserialize(),
            dropped: 0,
            error: None,
        })
    }

    /// Rows skipped so far because they could not be parsed.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether the stream ended early on an I/O failure.
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Fails if the stream ended early, so partial data is never mistaken
    /// for the whole file.
    pub fn check(&mut self) -> Result<(), SourceError> {
        match self.error.take() {
            Some(source) => Err(SourceError::Csv {
                path: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Iterator for ScheduleStream {
    type Item = ScheduleEvent;

    fn next(&mut self) -> Option<ScheduleEvent> {
        if self.error.is_some() {
            return None;
        }
        loop {
            match self.rows.next()? {
                Ok(event) => return Some(event),
                Err(e) if e.is_io_error() => {
                    error!(path = %self.path.display(), error = %e, "Schedule stream aborted");
                    self.error = Some(e);
                    return None;
                }
                Err(e) => {
                    self.dropped += 1;
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Dropping malformed schedule row"
                    );
                }
            }
        }
    }
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

impl Sink {
    fn finish(self) -> std::io::Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(w) => w.finish()?.flush(),
        }
    }
}

/// Writes rows to a new CSV file, optionally gzip-compressed.
pub struct RowWriter {
    path: PathBuf,
    writer: csv::Writer<Sink>,
    written: usize,
}

impl RowWriter {
    pub fn create(path: impl AsRef<Path>, gzip: bool) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| SourceError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| SourceError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        let buffered = BufWriter::new(file);
        let sink = if gzip {
            Sink::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Sink::Plain(buffered)
        };
        Ok(Self {
            path: path.to_path_buf(),
            writer: csv::Writer::from_writer(sink),
            written: 0,
        })
    }

    pub fn write<T: Serialize>(&mut self, row: &T) -> Result<(), SourceError> {
        self.writer
            .serialize(row)
            .map_err(|source| SourceError::Csv {
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }

    /// Deletes the partly written file.
    pub fn discard(self) -> Result<(), SourceError> {
        let path = self.path;
        drop(self.writer);
        std::fs::remove_file(&path).map_err(|source| SourceError::Write { path, source })
    }

    /// Flushes the file and returns the number of rows written.
    pub fn finish(self) -> Result<usize, SourceError> {
        let path = self.path;
        let sink = self
            .writer
            .into_inner()
            .map_err(|e| SourceError::Write {
                path: path.clone(),
                source: std::io::Error::new(e.error().kind(), e.error().to_string()),
            })?;
        sink.finish()
            .map_err(|source| SourceError::Write { path, source })?;
        Ok(self.written)
    }
}

/// Writes all `rows` to `path` in one go.
pub fn write_rows<'a, T, I>(
    path: impl AsRef<Path>,
    rows: I,
    gzip: bool,
) -> Result<usize, SourceError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = RowWriter::create(path, gzip)?;
    for row in rows {
        writer.write(row)?;
    }
    writer.finish()
}
