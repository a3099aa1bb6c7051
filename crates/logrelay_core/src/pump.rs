// pump.rs: read-classify-pseudonymize-write loop
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::classify::{classify, TrafficClass};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::format::format_tracked_line;
use crate::output::{OutputRouter, SinkKind};
use crate::parser::parse_line;
use crate::pseudonym::{tokenize, SaltProvider};
use crate::referrer::sanitize_referrer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub lines_read: u64,
    /// Malformed lines; never written anywhere.
    pub skipped: u64,
    pub tracked: u64,
    pub untracked: u64,
    pub write_errors: u64,
}

impl PumpStats {
    pub fn accepted(&self) -> u64 {
        self.lines_read - self.skipped
    }

    pub fn written(&self) -> u64 {
        self.tracked + self.untracked
    }
}

/// Open the configured input stream. Opening a FIFO blocks until a writer
/// attaches.
pub fn open_input(cfg: &RelayConfig) -> Result<Box<dyn BufRead>> {
    if cfg.reads_stdin() {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(&cfg.input_path).map_err(|e| RelayError::io("failed to open input", &cfg.input_path, e))?;
    info!(path = %cfg.input_path.display(), "Input opened");
    Ok(Box::new(BufReader::new(file)))
}

pub struct StreamPump {
    salts: SaltProvider,
    router: Arc<OutputRouter>,
}

impl StreamPump {
    pub fn new(salts: SaltProvider, router: Arc<OutputRouter>) -> Self {
        Self { salts, router }
    }

    /// Run until end of input or a read error. Never waits on rotation; each
    /// write picks up whatever handles are current.
    pub fn run<R: BufRead>(&self, mut reader: R) -> PumpStats {
        let mut stats = PumpStats::default();
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Error reading from input, stopping");
                    break;
                }
            }
            self.process_line(trim_line_ending(&buf), &mut stats);
        }
        info!(
            lines = stats.lines_read,
            tracked = stats.tracked,
            untracked = stats.untracked,
            skipped = stats.skipped,
            write_errors = stats.write_errors,
            "Input exhausted"
        );
        stats
    }

    /// Lines are handled as raw bytes; nothing is decoded or replaced.
    pub fn process_line(&self, line: &[u8], stats: &mut PumpStats) {
        stats.lines_read += 1;
        let record = match parse_line(line) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Skipping malformed line");
                stats.skipped += 1;
                return;
            }
        };

        let (kind, result) = match classify(&record) {
            TrafficClass::Internal => (SinkKind::Untracked, self.router.write(SinkKind::Untracked, line)),
            TrafficClass::External => {
                let referrer = sanitize_referrer(record.referrer);
                let token = tokenize(&self.salts.current_salt(), record.source_addr, record.user_agent);
                let out = format_tracked_line(&token, &record, &referrer);
                (SinkKind::Tracked, self.router.write(SinkKind::Tracked, out))
            }
        };

        match (kind, result) {
            (SinkKind::Tracked, Ok(())) => stats.tracked += 1,
            (SinkKind::Untracked, Ok(())) => stats.untracked += 1,
            (_, Err(e)) => {
                warn!(error = %e, sink = ?kind, "Failed to write line");
                stats.write_errors += 1;
            }
        }
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputTarget;
    use chrono::NaiveDate;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;

    fn pump_in(dir: &Path) -> StreamPump {
        let target = OutputTarget::open(&dir.join("goaccess.log"), &dir.join("untracked.log")).unwrap();
        let router = Arc::new(OutputRouter::new(target, false));
        let salts = SaltProvider::new("s").with_date_source(|| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        StreamPump::new(salts, router)
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"abc\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc"), b"abc");
        assert_eq!(trim_line_ending(b"\n"), b"");
    }

    #[test]
    fn test_routes_external_and_internal() {
        let dir = tempfile::tempdir().unwrap();
        let pump = pump_in(dir.path());
        let input = "1.2.3.4|MyAgent/1|2024-01-01T00:00:00Z|GET /x|200|512|https://ref.example/path\n\
                     127.0.0.1|Go-http-client/1.1|2024-01-01T00:00:01Z|GET /healthz|200|2|-\n\
                     ::1|curl|2024-01-01T00:00:02Z|GET /ready|200|2|-\n";
        let stats = pump.run(Cursor::new(input));

        assert_eq!(stats, PumpStats { lines_read: 3, skipped: 0, tracked: 1, untracked: 2, write_errors: 0 });
        assert_eq!(
            read(dir.path(), "goaccess.log"),
            "2a30843f54d4370a - - [2024-01-01T00:00:00Z] GET /x 200 512 \"https://ref.example\" \"MyAgent/1\"\n"
        );
        assert_eq!(
            read(dir.path(), "untracked.log"),
            "127.0.0.1|Go-http-client/1.1|2024-01-01T00:00:01Z|GET /healthz|200|2|-\n\
             ::1|curl|2024-01-01T00:00:02Z|GET /ready|200|2|-\n"
        );
    }

    #[test]
    fn test_malformed_lines_produce_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let pump = pump_in(dir.path());
        let stats = pump.run(Cursor::new("1.2.3.4|ua|ts|GET /|200|1\n\n127.0.0.1|only|three\n"));

        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.written(), 0);
        assert_eq!(read(dir.path(), "goaccess.log"), "");
        assert_eq!(read(dir.path(), "untracked.log"), "");
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let dir = tempfile::tempdir().unwrap();
        let pump = pump_in(dir.path());
        let stats = pump.run(Cursor::new("127.0.0.1|a|t|GET /|200|1|-\r\n127.0.0.1|b|t|GET /|200|1|-"));
        assert_eq!(stats.untracked, 2);
        assert_eq!(read(dir.path(), "untracked.log"), "127.0.0.1|a|t|GET /|200|1|-\n127.0.0.1|b|t|GET /|200|1|-\n");
    }

    #[test]
    fn test_same_client_same_token_within_a_day() {
        let dir = tempfile::tempdir().unwrap();
        let pump = pump_in(dir.path());
        pump.run(Cursor::new(
            "9.9.9.9|UA|t1|GET /a|200|1|-\n9.9.9.9|UA|t2|GET /b|200|1|-\n9.9.9.9|Other|t3|GET /c|200|1|-\n",
        ));
        let out = read(dir.path(), "goaccess.log");
        let tokens: Vec<&str> = out.lines().map(|l| l.split(' ').next().unwrap()).collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], tokens[1]);
        assert_ne!(tokens[0], tokens[2]);
        assert!(!out.contains("9.9.9.9"));
    }

    #[test]
    fn test_invalid_utf8_is_neither_merged_nor_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let pump = pump_in(dir.path());
        let mut input: Vec<u8> = Vec::new();
        input.extend_from_slice(b"5.5.5.5|Agent\xff|t1|GET /|200|1|-\n");
        input.extend_from_slice(b"5.5.5.5|Agent\xfe|t2|GET /|200|1|-\n");
        input.extend_from_slice(b"127.0.0.1|hc\xff\xfe|t3|GET /healthz|200|2|-\n");
        let stats = pump.run(Cursor::new(input));
        assert_eq!(stats.tracked, 2);
        assert_eq!(stats.untracked, 1);

        let tracked = fs::read(dir.path().join("goaccess.log")).unwrap();
        let lines: Vec<&[u8]> = tracked.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert_ne!(&lines[0][..16], &lines[1][..16], "distinct agents share a token");
        assert!(lines[0].ends_with(b"\"Agent\xff\""));
        assert!(lines[1].ends_with(b"\"Agent\xfe\""));

        assert_eq!(
            fs::read(dir.path().join("untracked.log")).unwrap(),
            b"127.0.0.1|hc\xff\xfe|t3|GET /healthz|200|2|-\n"
        );
    }

    struct FailingReader {
        served: bool,
    }

    impl io::Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe went away"));
            }
            self.served = true;
            let line = b"127.0.0.1|a|t|GET /|200|1|-\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_read_error_ends_loop_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let pump = pump_in(dir.path());
        let stats = pump.run(BufReader::new(FailingReader { served: false }));
        assert_eq!(stats.untracked, 1);
        assert_eq!(read(dir.path(), "untracked.log"), "127.0.0.1|a|t|GET /|200|1|-\n");
    }
}
