use std::io::Write;

use crate::error::Result;
use crate::format::{Field, OutputFormat, Row, RowWriter};

/// Per-message latency rows, one per valid sample
pub struct LatencyTrace<W: Write> {
    writer: RowWriter<W>,
    last_then_ms: Option<u64>,
}

impl<W: Write> LatencyTrace<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self {
            writer: RowWriter::new(format, out),
            last_then_ms: None,
        }
    }

    pub fn record(&mut self, then_ms: u64, now_ms: u64, latency_ms: u64) -> Result<()> {
        // gap between consecutive producer timestamps
        let pause_ms = self
            .last_then_ms
            .map_or(0, |last| then_ms.saturating_sub(last));
        self.last_then_ms = Some(then_ms);

        let row = Row::new()
            .with("THEN DATE", Field::Clock(then_ms))
            .with("NOW DATE", Field::Clock(now_ms))
            .with("COUNT", Field::Int(self.writer.rows_written() + 1))
            .with("THEN", Field::Millis(then_ms))
            .with("NOW", Field::Millis(now_ms))
            .with("PAUSE_TIME", Field::Millis(pause_ms))
            .with("LATENCY", Field::Millis(latency_ms));
        self.writer.write_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_time_tracks_previous_creation() {
        let mut buf = Vec::new();
        {
            let mut trace = LatencyTrace::new(OutputFormat::Csv, &mut buf);
            trace.record(1_000, 1_005, 5).unwrap();
            trace.record(1_250, 1_300, 50).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "THEN DATE,NOW DATE,COUNT,THEN,NOW,PAUSE_TIME,LATENCY");
        assert!(lines[1].ends_with(",1,1000,1005,0,5"));
        assert!(lines[2].ends_with(",2,1250,1300,250,50"));
    }
}
