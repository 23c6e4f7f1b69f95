//! Sinks that receive produced work units.

use crate::config::SinkConfig;
use crate::error::IngestError;
use crate::workunit::MetadataWorkUnit;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for work units.
pub trait Sink: Send {
    fn write_workunit(&mut self, wu: &MetadataWorkUnit) -> Result<(), IngestError>;

    /// Units written so far.
    fn written(&self) -> usize;

    /// Flush and release the destination.
    fn close(&mut self) -> Result<(), IngestError>;
}

/// Writes one JSON object per line to any writer.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    written: usize,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn write_workunit(&mut self, wu: &MetadataWorkUnit) -> Result<(), IngestError> {
        serde_json::to_writer(&mut self.writer, wu)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }

    fn close(&mut self) -> Result<(), IngestError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON-lines file sink.
pub struct FileSink {
    path: PathBuf,
    inner: JsonLinesSink<BufWriter<File>>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            inner: JsonLinesSink::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_workunit(&mut self, wu: &MetadataWorkUnit) -> Result<(), IngestError> {
        self.inner.write_workunit(wu)
    }

    fn written(&self) -> usize {
        self.inner.written()
    }

    fn close(&mut self) -> Result<(), IngestError> {
        self.inner.close()?;
        tracing::info!(path = %self.path.display(), written = self.written(), "Closed file sink");
        Ok(())
    }
}

/// Build the sink a recipe asks for.
pub fn build_sink(config: &SinkConfig) -> Result<Box<dyn Sink>, IngestError> {
    Ok(match config {
        SinkConfig::File { filename } => Box::new(FileSink::create(filename)?),
        SinkConfig::Console => Box::new(JsonLinesSink::new(std::io::stdout())),
    })
}
