//! Line-oriented batch classification
//!
//! Input is one strategy encoding per line. Lines are read lazily and
//! classified chunk by chunk, in parallel when the `parallel` feature is on.
//! A malformed line is reported and skipped; it never yields a verdict.

use std::io::BufRead;
use log::{info, warn};
use crate::classify::{classify, Classification};
use crate::error::{Error, Result};
use crate::strategy::Strategy;

/// Lines classified per parallel chunk
pub const CHUNK_SIZE: usize = 4096;

/// Lazy reader of strategy encodings. Blank lines are skipped; line numbers
/// are 1-based.
pub struct StrategyLines<R> {
    reader: R,
    line: usize,
    buf: String,
}

pub fn read_strategies<R: BufRead>(reader: R) -> StrategyLines<R> {
    StrategyLines { reader, line: 0, buf: String::new() }
}

impl<R: BufRead> Iterator for StrategyLines<R> {
    /// `Err(InvalidLine)` for a bad encoding, `Err(Io)` for a read failure
    type Item = Result<Strategy>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(Error::Io(e))),
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                text.parse::<Strategy>()
                    .map_err(|e| Error::InvalidLine { line, source: Box::new(e) }),
            );
        }
    }
}

/// Counts reported by [`classify_all`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub classified: usize,
    pub rejected: usize,
}

/// Classify every line of `reader`, handing results to `emit` in input
/// order. Rejected lines are passed on as `Err(InvalidLine)`; a read
/// failure aborts the batch.
pub fn classify_all<R, F>(reader: R, mut emit: F) -> Result<BatchSummary>
where
    R: BufRead,
    F: FnMut(Result<Classification>),
{
    let mut summary = BatchSummary::default();
    let mut lines = read_strategies(reader).peekable();
    while lines.peek().is_some() {
        let mut chunk = Vec::with_capacity(CHUNK_SIZE);
        for item in lines.by_ref().take(CHUNK_SIZE) {
            match item {
                Err(Error::Io(e)) => return Err(Error::Io(e)),
                item => chunk.push(item),
            }
        }
        for result in classify_chunk(chunk) {
            match &result {
                Ok(_) => summary.classified += 1,
                Err(e) => {
                    warn!("rejected {}", e);
                    summary.rejected += 1;
                }
            }
            emit(result);
        }
        info!("classified {} strategies ({} rejected)", summary.classified, summary.rejected);
    }
    Ok(summary)
}

#[cfg(feature = "parallel")]
fn classify_chunk(chunk: Vec<Result<Strategy>>) -> Vec<Result<Classification>> {
    use rayon::iter::IntoParallelIterator;
    use rayon::iter::ParallelIterator;
    chunk
        .into_par_iter()
        .map(|item| item.map(|s| classify(&s)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn classify_chunk(chunk: Vec<Result<Strategy>>) -> Vec<Result<Classification>> {
    chunk.into_iter().map(|item| item.map(|s| classify(&s))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn input() -> String {
        format!(
            "{}\n\n{}\nnot-a-strategy\n{}",
            "d".repeat(64),
            "cd".repeat(32),
            "c".repeat(64)
        )
    }

    #[test]
    fn test_reader_reports_line_numbers() {
        let items: Vec<_> = read_strategies(Cursor::new(input())).collect();
        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        assert!(matches!(items[2], Err(Error::InvalidLine { line: 4, .. })));
        assert_eq!(items[3].as_ref().unwrap().to_string(), "c".repeat(64));
    }

    #[test]
    fn test_classify_all_keeps_order_and_skips_bad_lines() {
        let mut seen = Vec::new();
        let summary = classify_all(Cursor::new(input()), |r| {
            seen.push(r.map(|c| (c.strategy.to_string(), c.defensible)).map_err(|e| e.to_string()))
        })
        .unwrap();
        assert_eq!(summary, BatchSummary { classified: 3, rejected: 1 });
        assert_eq!(seen[0], Ok(("d".repeat(64), true)));
        assert_eq!(seen[1], Ok(("cd".repeat(32), true)));
        assert!(seen[2].as_ref().unwrap_err().starts_with("line 4:"));
        assert_eq!(seen[3], Ok(("c".repeat(64), false)));
    }

    #[test]
    fn test_empty_input() {
        let summary = classify_all(Cursor::new(""), |_| panic!("nothing to emit")).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }
}
