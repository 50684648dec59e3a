use std::io::{self, Write};

use serde::Serialize;

use crate::domain::ChromSize;
use crate::loader::LoadSummary;
use crate::study::SegmentStudyReport;

/// Machine-readable results on stdout, for callers that pass `--json`.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &LoadSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_segment_report(report: &SegmentStudyReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_chrom_sizes(sizes: &[ChromSize]) -> io::Result<()> {
        Self::print_json(&sizes)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
