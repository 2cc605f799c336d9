//! CPU usage range queries from CSV
//!
//! Input is a header line followed by `hostname,start_time,end_time` records:
//!
//! ```text
//! hostname,start_time,end_time
//! host_000008,2017-01-01 08:59:22,2017-01-01 09:59:22
//! host_000001,2017-01-02 13:02:02,2017-01-02 14:02:02
//! ```
//!
//! Each record becomes one per-minute min/max query over `cpu_usage`, routed
//! by hostname so every query for a host runs on the same worker.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{Reader, ReaderBuilder, StringRecord};
use dbperf_core::{Query, QueryArg, QuerySource, SourceError};

/// Layout of `start_time` and `end_time`
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-minute min/max CPU usage of one host over a time range
pub const CPU_USAGE_QUERY: &str = "SELECT date_trunc('minute', ts) AS minute, MIN(usage), MAX(usage) FROM cpu_usage \
WHERE host = $1 AND ts BETWEEN $2 AND $3 \
GROUP BY date_trunc('minute', ts);";

/// Reads CPU usage query specifications from CSV
pub struct CpuUsageCsvSource<R> {
    reader: Reader<R>,
    record: StringRecord,
    produced: u64,
}

impl CpuUsageCsvSource<File> {
    /// Open a CSV file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to open {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Opened query file");
        Ok(Self::new(file))
    }
}

impl<R: Read> CpuUsageCsvSource<R> {
    /// Read queries from any reader; the first line is the header
    pub fn new(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            // field count is validated per record
            .flexible(true)
            .from_reader(reader);

        Self {
            reader,
            record: StringRecord::new(),
            produced: 0,
        }
    }

    /// Number of queries produced so far
    pub fn produced(&self) -> u64 {
        self.produced
    }

    fn parse_record(&self) -> Result<Query, SourceError> {
        let invalid = || {
            let fields: Vec<&str> = self.record.iter().collect();
            SourceError::InvalidRecord(fields.join(","))
        };

        if self.record.len() != 3 {
            return Err(invalid());
        }

        let host = &self.record[0];
        let start = parse_time(&self.record[1]).ok_or_else(invalid)?;
        let end = parse_time(&self.record[2]).ok_or_else(invalid)?;

        Ok(Query::new(
            CPU_USAGE_QUERY,
            vec![
                QueryArg::Text(host.to_string()),
                QueryArg::Timestamp(start),
                QueryArg::Timestamp(end),
            ],
            host,
        ))
    }
}

fn parse_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).ok()
}

impl<R: Read + Send> QuerySource for CpuUsageCsvSource<R> {
    fn name(&self) -> &str {
        "cpu_usage_csv"
    }

    fn next_query(&mut self) -> Result<Query, SourceError> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => return Err(SourceError::Exhausted),
            Err(e) => return Err(csv_error(e)),
        }

        let query = self.parse_record()?;
        self.produced += 1;
        Ok(query)
    }
}

fn csv_error(err: csv::Error) -> SourceError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return SourceError::Io(io);
        }
        return SourceError::InvalidRecord("unreadable input".into());
    }
    SourceError::InvalidRecord(err.to_string())
}

impl<R> std::fmt::Debug for CpuUsageCsvSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuUsageCsvSource")
            .field("produced", &self.produced)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source(input: &str) -> CpuUsageCsvSource<&[u8]> {
        CpuUsageCsvSource::new(input.as_bytes())
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_reads_queries_in_order() {
        let mut source = source(
            "hostname,start_time,end_time\n\
             host_000008,2017-01-01 08:59:22,2017-01-01 09:59:22\n\
             host_000001,2017-01-02 13:02:02,2017-01-02 14:02:02\n",
        );

        let first = source.next_query().unwrap();
        assert_eq!(first.key(), "host_000008");
        assert_eq!(first.statement, CPU_USAGE_QUERY);
        assert_eq!(
            first.args,
            vec![
                QueryArg::Text("host_000008".into()),
                QueryArg::Timestamp(at(2017, 1, 1, 8, 59, 22)),
                QueryArg::Timestamp(at(2017, 1, 1, 9, 59, 22)),
            ]
        );

        let second = source.next_query().unwrap();
        assert_eq!(second.key(), "host_000001");
        assert_eq!(second.args[1], QueryArg::Timestamp(at(2017, 1, 2, 13, 2, 2)));

        assert!(source.next_query().unwrap_err().is_exhausted());
        assert_eq!(source.produced(), 2);
    }

    #[test]
    fn test_missing_trailing_newline() {
        let mut source = source(
            "hostname,start_time,end_time\nhost_000001,2017-01-02 13:02:02,2017-01-02 14:02:02",
        );
        assert!(source.next_query().is_ok());
        assert!(source.next_query().unwrap_err().is_exhausted());
    }

    #[test]
    fn test_invalid_time_is_rejected() {
        let mut source = source(
            "hostname,start_time,end_time\nhost_000008,2017-01-0108:59:22,2017-01-01 09:59:22\n",
        );

        let err = source.next_query().unwrap_err();
        assert!(matches!(err, SourceError::InvalidRecord(_)));
        assert_eq!(
            err.to_string(),
            "invalid query specification: host_000008,2017-01-0108:59:22,2017-01-01 09:59:22"
        );
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        let mut source = source("hostname,start_time,end_time\nhost_000008,2017-01-01 08:59:22\n");

        let err = source.next_query().unwrap_err();
        assert!(err.to_string().contains("invalid query specification"));
        assert!(err.to_string().contains("host_000008"));
    }

    #[test]
    fn test_empty_input_is_exhausted() {
        let mut source = source("");
        assert!(source.next_query().unwrap_err().is_exhausted());
    }

    #[test]
    fn test_header_only_is_exhausted() {
        let mut source = source("hostname,start_time,end_time\n");
        assert!(source.next_query().unwrap_err().is_exhausted());
        assert_eq!(source.produced(), 0);
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hostname,start_time,end_time").unwrap();
        writeln!(file, "host_000003,2017-01-01 00:00:00,2017-01-01 00:01:59").unwrap();

        let mut source = CpuUsageCsvSource::from_path(file.path()).unwrap();
        assert_eq!(source.next_query().unwrap().key(), "host_000003");
        assert!(source.next_query().unwrap_err().is_exhausted());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = CpuUsageCsvSource::from_path("/nonexistent/queries.csv").unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
        assert!(err.to_string().contains("queries.csv"));
    }
}
