//! Request decoding.
//!
//! Turns the staged write payload into the identifier an endpoint resolves.

use crate::error::{Error, Result};
use crate::kstate::Pid;

/// Strip everything from the first NUL on.
fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Parse a single decimal process identifier.
///
/// Surrounding whitespace is ignored, so `echo 1234 >` works. Anything else
/// around the number, a value that does not fit a signed 32-bit integer, or
/// a value that is not positive is rejected.
///
/// This is stricter than a C `sscanf("%d")` on the same payload: trailing
/// text is not ignored, so `"12abc"` is rejected rather than read as 12. A
/// leading sign is still accepted, so `"+12"` decodes to 12.
pub fn decode_pid(bytes: &[u8]) -> Result<Pid> {
    let text = core::str::from_utf8(until_nul(bytes)).map_err(|_| Error::InvalidArgument)?;
    let token = text.trim_ascii();
    let value: i32 = token.parse().map_err(|_| {
        warn!("Error: wrong amount of arguments");
        Error::InvalidArgument
    })?;
    if value <= 0 {
        warn!("Error: bad argument {}", value);
        return Err(Error::InvalidArgument);
    }
    Ok(value as Pid)
}

/// Interpret the payload, up to its terminator, as a path.
///
/// No trimming is done: a trailing newline is part of the path. Whether the
/// path exists is left to the resolver.
pub fn decode_path(bytes: &[u8]) -> Result<&str> {
    core::str::from_utf8(until_nul(bytes)).map_err(|_| {
        warn!("Error: path is not valid UTF-8");
        Error::InvalidArgument
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pid_accepts_trailing_newline() {
        assert_eq!(decode_pid(b"1234\n"), Ok(1234));
        assert_eq!(decode_pid(b"  42\0garbage"), Ok(42));
    }

    #[test]
    fn test_decode_pid_rejects_zero_and_negative() {
        assert_eq!(decode_pid(b"0"), Err(Error::InvalidArgument));
        assert_eq!(decode_pid(b"-7"), Err(Error::InvalidArgument));
    }

    #[test]
    fn test_decode_pid_accepts_leading_plus() {
        assert_eq!(decode_pid(b"+12"), Ok(12));
        assert_eq!(decode_pid(b"+12\n"), Ok(12));
    }

    #[test]
    fn test_decode_pid_rejects_extra_tokens() {
        assert_eq!(decode_pid(b"12 34"), Err(Error::InvalidArgument));
        assert_eq!(decode_pid(b"12abc"), Err(Error::InvalidArgument));
        assert_eq!(decode_pid(b""), Err(Error::InvalidArgument));
    }

    #[test]
    fn test_decode_path_keeps_newline() {
        assert_eq!(decode_path(b"/etc\n"), Ok("/etc\n"));
        assert_eq!(decode_path(b"/etc\0/x"), Ok("/etc"));
    }
}
