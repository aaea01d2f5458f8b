use std::io::Write;
use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::chart::ChartData;

use super::traits::ReportRenderer;

/// Writes each chart as one JSON document per line.
///
/// Suitable for piping into an external plotting front end.
pub struct JsonRenderer<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ReportRenderer for JsonRenderer<W> {
    fn render(&self, chart: &ChartData) -> Result<(), CoreError> {
        let line =
            serde_json::to_string(chart).map_err(|e| CoreError::Serialization(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| CoreError::Render("renderer writer lock poisoned".into()))?;
        writeln!(writer, "{line}")
            .and_then(|_| writer.flush())
            .map_err(|e| CoreError::Render(e.to_string()))
    }
}
