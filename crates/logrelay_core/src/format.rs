// format.rs: combined-log-format line for the analytics consumer

use crate::parser::LogRecord;
use crate::pseudonym::Token;

/// `<token> - - [<timestamp>] <request> <status> <bytes> "<referrer>" "<user_agent>"`
///
/// Both referrer and user agent are quoted. This is the only formatter for
/// the tracked sink; changing it changes the consumer's log-format contract.
/// Record fields are copied byte for byte.
pub fn format_tracked_line(token: &Token, record: &LogRecord<'_>, referrer: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        token.as_str().len()
            + record.timestamp.len()
            + record.request.len()
            + record.status.len()
            + record.byte_count.len()
            + referrer.len()
            + record.user_agent.len()
            + 16,
    );
    out.extend_from_slice(token.as_str().as_bytes());
    out.extend_from_slice(b" - - [");
    out.extend_from_slice(record.timestamp);
    out.extend_from_slice(b"] ");
    out.extend_from_slice(record.request);
    out.push(b' ');
    out.extend_from_slice(record.status);
    out.push(b' ');
    out.extend_from_slice(record.byte_count);
    out.extend_from_slice(b" \"");
    out.extend_from_slice(referrer.as_bytes());
    out.extend_from_slice(b"\" \"");
    out.extend_from_slice(record.user_agent);
    out.push(b'"');
    out
}
