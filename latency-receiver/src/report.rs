use serde::Serialize;
use std::io::Write;

use crate::error::Result;
use crate::format::OutputFormat;
use crate::histogram::Bucket;

/// Read-only view of the accumulated statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub dropped: u64,
    pub duplicates: u64,
    pub decode_failures: u64,
    pub samples: u64,
    pub min_ms: Option<u64>,
    pub max_ms: Option<u64>,
    pub average_ms: Option<f64>,
    pub buckets: Vec<Bucket>,
    pub overflow: u64,
}

#[derive(Debug, Serialize)]
struct CsvRecord {
    messages: u64,
    latency_ms: u64,
}

/// Renders snapshots periodically and once more at shutdown
#[derive(Debug)]
pub struct Reporter {
    format: OutputFormat,
    interval_ms: u64,
    last_display_ms: u64,
    last_count: u64,
}

impl Reporter {
    pub fn new(format: OutputFormat, interval_secs: u32, now_ms: u64) -> Self {
        Self {
            format,
            interval_ms: u64::from(interval_secs) * 1000,
            last_display_ms: now_ms,
            last_count: 0,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.interval_ms > 0 && now_ms >= self.last_display_ms + self.interval_ms
    }

    /// Render if the report interval has elapsed. `snapshot` is only called
    /// when a report is due.
    pub fn tick<F>(&mut self, now_ms: u64, snapshot: F, out: &mut dyn Write) -> Result<()>
    where
        F: FnOnce() -> StatsSnapshot,
    {
        if self.is_due(now_ms) {
            self.last_display_ms = now_ms;
            self.render(&snapshot(), out)?;
        }
        Ok(())
    }

    pub fn render(&mut self, snapshot: &StatsSnapshot, out: &mut dyn Write) -> Result<()> {
        if snapshot.received == 0 {
            return Ok(());
        }
        match self.format {
            OutputFormat::Table => self.render_table(snapshot, out)?,
            OutputFormat::Csv => render_csv(snapshot, out)?,
        }
        out.flush()?;
        self.last_count = snapshot.received;
        Ok(())
    }

    fn render_table(&self, snapshot: &StatsSnapshot, out: &mut dyn Write) -> Result<()> {
        write!(out, "\n\nLatency:   ({} msgs received", snapshot.received)?;
        if self.interval_ms > 0 && snapshot.received > self.last_count {
            let rate = (snapshot.received - self.last_count) / (self.interval_ms / 1000);
            writeln!(out, ", {} msgs/sec)", rate)?;
        } else {
            writeln!(out, ")")?;
        }

        writeln!(out, "  Average: {:.3} msec", snapshot.average_ms.unwrap_or(0.0))?;
        writeln!(out, "  Minimum: {} msec", snapshot.min_ms.unwrap_or(0))?;
        writeln!(out, "  Maximum: {} msec", snapshot.max_ms.unwrap_or(0))?;
        writeln!(out, "  Distribution:")?;
        if snapshot.dropped > 0 {
            writeln!(out, "  Dropped: {}", snapshot.dropped)?;
        }
        if snapshot.duplicates > 0 {
            writeln!(out, "  Duplicate: {}", snapshot.duplicates)?;
        }
        if snapshot.decode_failures > 0 {
            writeln!(out, "  Undecodable: {}", snapshot.decode_failures)?;
        }

        for bucket in &snapshot.buckets {
            if bucket.order == 0 {
                writeln!(out, "    msecs: {}  messages: {}", bucket.lower_ms(), bucket.count)?;
            } else {
                writeln!(
                    out,
                    "    msecs: {}-{}  messages: {}",
                    bucket.lower_ms(),
                    bucket.upper_ms(),
                    bucket.count
                )?;
            }
        }

        if snapshot.overflow > 0 {
            writeln!(out, "> 100 sec: {}", snapshot.overflow)?;
        }
        Ok(())
    }
}

fn render_csv(snapshot: &StatsSnapshot, out: &mut dyn Write) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(["Messages", "Latency (msec)"])?;
    for bucket in &snapshot.buckets {
        writer.serialize(CsvRecord {
            messages: bucket.count,
            latency_ms: bucket.midpoint_ms(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(received: u64) -> StatsSnapshot {
        StatsSnapshot {
            received,
            dropped: 3,
            duplicates: 1,
            decode_failures: 0,
            samples: 3,
            min_ms: Some(5),
            max_ms: Some(150_000),
            average_ms: Some(50_051.667),
            buckets: vec![
                Bucket { order: 0, index: 5, count: 1 },
                Bucket { order: 1, index: 15, count: 2 },
            ],
            overflow: 1,
        }
    }

    fn render(reporter: &mut Reporter, snapshot: &StatsSnapshot) -> String {
        let mut buf = Vec::new();
        reporter.render(snapshot, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_table_summary() {
        let mut reporter = Reporter::new(OutputFormat::Table, 0, 0);
        let text = render(&mut reporter, &snapshot(10));

        assert!(text.contains("Latency:   (10 msgs received)\n"));
        assert!(text.contains("  Average: 50051.667 msec\n"));
        assert!(text.contains("  Minimum: 5 msec\n"));
        assert!(text.contains("  Dropped: 3\n"));
        assert!(text.contains("  Duplicate: 1\n"));
        assert!(!text.contains("Undecodable"));
        assert!(text.contains("    msecs: 5  messages: 1\n"));
        assert!(text.contains("    msecs: 150-159  messages: 2\n"));
        assert!(text.contains("> 100 sec: 1\n"));
    }

    #[test]
    fn test_csv_uses_bucket_midpoints() {
        let mut reporter = Reporter::new(OutputFormat::Csv, 0, 0);
        let text = render(&mut reporter, &snapshot(10));
        assert_eq!(text, "Messages,Latency (msec)\n1,5\n2,155\n");
    }

    #[test]
    fn test_nothing_rendered_before_first_message() {
        let mut reporter = Reporter::new(OutputFormat::Table, 0, 0);
        assert_eq!(render(&mut reporter, &snapshot(0)), "");
    }

    #[test]
    fn test_periodic_rate_and_due_time() {
        let mut reporter = Reporter::new(OutputFormat::Table, 2, 1_000);
        assert!(!reporter.is_due(2_999));
        assert!(reporter.is_due(3_000));

        let mut buf = Vec::new();
        reporter.tick(3_000, || snapshot(100), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("(100 msgs received, 50 msgs/sec)"));
        assert!(!reporter.is_due(4_999));

        // no new messages since the last report
        let text = render(&mut reporter, &snapshot(100));
        assert!(text.contains("(100 msgs received)\n"));
    }

    #[test]
    fn test_snapshot_taken_only_when_due() {
        let mut reporter = Reporter::new(OutputFormat::Table, 2, 1_000);
        let mut buf = Vec::new();
        let mut taken = 0;

        reporter
            .tick(2_000, || { taken += 1; snapshot(10) }, &mut buf)
            .unwrap();
        assert_eq!(taken, 0);
        assert!(buf.is_empty());

        reporter
            .tick(3_000, || { taken += 1; snapshot(10) }, &mut buf)
            .unwrap();
        assert_eq!(taken, 1);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_disabled_interval_never_due() {
        let reporter = Reporter::new(OutputFormat::Table, 0, 0);
        assert!(!reporter.is_due(u64::MAX));
    }
}
