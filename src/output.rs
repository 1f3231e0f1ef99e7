//! Output sinks for [`Value`]s.
//!
//! Two renderings are supported:
//!
//! - **plain**: `co2: <ppm> ppm` and `temp: <whole degrees>` lines, one per present field
//! - **json**: one `{"temp":..,"co2":..}` object per line
//!
//! Writers flush after every value so watch mode output appears immediately.

use crate::error::{AppResult, MonitorError};
use crate::measurement::Value;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Destination for completed or streamed readings.
pub trait OutputWriter: Send {
    /// Render and write one value.
    ///
    /// # Errors
    /// `OutputWrite` if the underlying writer fails.
    fn write(&mut self, value: &Value) -> AppResult<()>;
}

impl<O: OutputWriter + ?Sized> OutputWriter for Box<O> {
    fn write(&mut self, value: &Value) -> AppResult<()> {
        (**self).write(value)
    }
}

/// Line oriented, human readable output.
#[derive(Debug)]
pub struct PlainOutputWriter<W> {
    writer: W,
}

impl<W: Write + Send> PlainOutputWriter<W> {
    /// Write to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputWriter for PlainOutputWriter<W> {
    fn write(&mut self, value: &Value) -> AppResult<()> {
        if let Some(co2) = value.co2 {
            writeln!(self.writer, "co2: {} ppm", co2)?;
        }
        if let Some(temp) = value.temp {
            // `as` truncates toward zero.
            writeln!(self.writer, "temp: {}", temp as i64)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Newline delimited JSON output.
#[derive(Debug)]
pub struct JsonOutputWriter<W> {
    writer: W,
}

impl<W: Write + Send> JsonOutputWriter<W> {
    /// Write to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputWriter for JsonOutputWriter<W> {
    fn write(&mut self, value: &Value) -> AppResult<()> {
        serde_json::to_writer(&mut self.writer, value).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Selectable output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `co2: 654 ppm` / `temp: 23`
    #[default]
    Plain,
    /// `{"temp":23.1,"co2":654}`
    Json,
}

impl OutputFormat {
    /// Build the sink for this format on top of `writer`.
    pub fn writer<W: Write + Send + 'static>(self, writer: W) -> Box<dyn OutputWriter> {
        match self {
            OutputFormat::Plain => Box::new(PlainOutputWriter::new(writer)),
            OutputFormat::Json => Box::new(JsonOutputWriter::new(writer)),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = MonitorError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "plain" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(MonitorError::Configuration(format!(
                "invalid format '{}', expected plain or json",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
        })
    }
}
