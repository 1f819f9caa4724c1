//! Optional file-backed trace sink, for when the supervisor doesn't want
//! per-instruction trace lines interleaved with Type Alpha output on
//! stdout. Mirrors the teacher's own "log for when stdout is taken" idiom.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct TraceLog {
    path: PathBuf,
}

impl TraceLog {
    /// Creates (truncating) the trace file at `path`.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<TraceLog> {
        fs::File::create(path.as_ref())?;
        Ok(TraceLog {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Appends one trace line, followed by a newline.
    pub fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")
    }
}
