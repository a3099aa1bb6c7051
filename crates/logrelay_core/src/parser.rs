// parser.rs: split a pipe-delimited access-log line into a LogRecord
use memchr::memchr_iter;

use crate::error::ParseError;

/// `ip|user_agent|timestamp|request|status|bytes|referrer`
pub const FIELD_COUNT: usize = 7;

/// One access-log event, borrowing raw bytes from the input line. Fields are
/// not required to be UTF-8; they are hashed and copied as they arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord<'a> {
    pub source_addr: &'a [u8],
    pub user_agent: &'a [u8],
    pub timestamp: &'a [u8],
    pub request: &'a [u8],
    pub status: &'a [u8],
    pub byte_count: &'a [u8],
    pub referrer: &'a [u8],
}

/// Segments past the seventh are ignored, so trailing delimiters are tolerated.
pub fn parse_line(line: &[u8]) -> Result<LogRecord<'_>, ParseError> {
    let mut fields: [&[u8]; FIELD_COUNT] = [&[]; FIELD_COUNT];
    let mut n = 0usize;
    let mut start = 0usize;
    for pos in memchr_iter(b'|', line) {
        fields[n] = &line[start..pos];
        n += 1;
        start = pos + 1;
        if n == FIELD_COUNT {
            break;
        }
    }
    if n < FIELD_COUNT {
        fields[n] = &line[start..];
        n += 1;
    }
    if n < FIELD_COUNT {
        return Err(ParseError::Malformed { fields: n, expected: FIELD_COUNT });
    }
    let [source_addr, user_agent, timestamp, request, status, byte_count, referrer] = fields;
    Ok(LogRecord { source_addr, user_agent, timestamp, request, status, byte_count, referrer })
}
