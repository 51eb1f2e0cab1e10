//! Line-oriented batch verification.
//!
//! [`run_batch`] wraps any source of lines and lazily yields one
//! [`Verification`] per non-blank line. A verdict other than
//! `RecipientAccepted` is just a result; it never stops the batch. Only a
//! failure of the source itself ends the iteration.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::verify::{Verification, Verify};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reading input failed after line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Lines of a text file, opened eagerly so a missing file is reported
/// before anything is verified.
pub fn open_source(path: impl AsRef<Path>) -> Result<LossyLines<BufReader<File>>, BatchError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| BatchError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LossyLines::new(BufReader::new(file)))
}

/// Line iterator that never fails on encoding: invalid UTF-8 is replaced
/// with U+FFFD, so such a line reaches the syntax check as an ordinary
/// (invalid) address. Only real I/O failures come back as `Err`.
#[derive(Debug)]
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                Some(Ok(String::from_utf8_lossy(line).into_owned()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

pub fn run_batch<'v, V, I, S>(verifier: &'v V, source: I) -> Batch<'v, V, I::IntoIter>
where
    V: Verify + ?Sized,
    I: IntoIterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    Batch {
        verifier,
        lines: source.into_iter(),
        line_no: 0,
        failed: false,
    }
}

/// Lazy iterator returned by [`run_batch`]. Restartable only if the
/// underlying source is.
pub struct Batch<'v, V: ?Sized, L> {
    verifier: &'v V,
    lines: L,
    line_no: usize,
    failed: bool,
}

impl<V, L, S> Iterator for Batch<'_, V, L>
where
    V: Verify + ?Sized,
    L: Iterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    type Item = Result<Verification, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    self.failed = true;
                    warn!(line = self.line_no, error = %source, "batch source failed");
                    return Some(Err(BatchError::Read {
                        line: self.line_no,
                        source,
                    }));
                }
            };
            self.line_no += 1;
            let address = line.as_ref().trim();
            if address.is_empty() {
                continue;
            }
            return Some(Ok(self.verifier.verify(address)));
        }
    }
}
