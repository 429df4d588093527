use log::warn;
use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use crate::domain::RatingRecord;

/// Emits one rating record per call
pub trait Reporter: Send + Sync {
    fn report(&self, record: &RatingRecord);
}

pub fn format_line(record: &RatingRecord) -> String {
    format!(
        "Drug: {} | Ratings: {} | Average: {}",
        record.name(),
        record.rating_count(),
        record.average_rating()
    )
}

/// Writes report lines to stdout, or any other writer
pub struct ConsoleReporter<W: Write + Send = Stdout> {
    out: Mutex<W>,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("report output lock poisoned"))?;
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn report(&self, record: &RatingRecord) {
        if let Err(e) = self.write_line(&format_line(record)) {
            warn!("Failed to write report line for {}: {}", record.name(), e);
        }
    }
}
