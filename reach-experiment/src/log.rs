use crate::error::Result;
use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use reach_core::PixelPoint;
use reach_timing::format_elapsed;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HEADER: [&str; 7] = [
    "target_x",
    "target_y",
    "feedback_x",
    "feedback_y",
    "mouse_x",
    "mouse_y",
    "elapsed_time",
];

/// One pointer-motion sample as written to a trial log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub target_x: i32,
    pub target_y: i32,
    pub feedback_x: i32,
    pub feedback_y: i32,
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub elapsed_time: String,
}

impl LogRecord {
    pub fn new(target: PixelPoint, feedback: PixelPoint, mouse: PixelPoint, elapsed: Duration) -> Self {
        Self {
            target_x: target.x,
            target_y: target.y,
            feedback_x: feedback.x,
            feedback_y: feedback.y,
            mouse_x: mouse.x,
            mouse_y: mouse.y,
            elapsed_time: format_elapsed(elapsed),
        }
    }

    fn fields(&self) -> [String; 7] {
        [
            self.target_x.to_string(),
            self.target_y.to_string(),
            self.feedback_x.to_string(),
            self.feedback_y.to_string(),
            self.mouse_x.to_string(),
            self.mouse_y.to_string(),
            self.elapsed_time.clone(),
        ]
    }
}

/// Append-only CSV log of one trial.
///
/// Every write opens the file, appends one row and closes it again, so a run
/// that dies mid-trial still leaves every completed row on disk.
#[derive(Debug, Clone)]
pub struct TrialLog {
    path: PathBuf,
}

impl TrialLog {
    /// Creates (or truncates) the log and writes the header row.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        write_row(file, HEADER.iter().map(|h| h.to_string()))?;
        Ok(Self { path })
    }

    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        write_row(file, record.fields())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Fields after the first carry a leading space so rows read "a, b, c".
// Only a field holding a comma (an elapsed time past one day) gets quoted.
fn write_row<W: Write>(sink: W, fields: impl IntoIterator<Item = String>) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(sink);
    let row = fields
        .into_iter()
        .enumerate()
        .map(|(i, f)| if i == 0 { f } else { format!(" {f}") });
    wtr.write_record(row)?;
    wtr.flush()?;
    Ok(())
}

/// Reads a trial log back into records.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<LogRecord>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let records = rdr.deserialize().collect::<std::result::Result<Vec<LogRecord>, _>>()?;
    Ok(records)
}
