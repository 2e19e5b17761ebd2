//! Record serialization.
//!
//! Each resolved resource renders as exactly one newline-terminated line
//! with a fixed field order:
//!
//! ```text
//! {"start": 4194304, "end": 4198400, "flags": 6, "prev": 0, "next": 1, "file_inode": 1311}
//! {"no": 1311, "bytes": 512, "atime": 1700000000, "mtime": 1700000000, "ctime": 1700000000}
//! ```
//!
//! Both resource types also implement [`FromStr`], accepting exactly the
//! line [`Record::write_record`] produces, so a consumer can turn a record
//! back into typed values.

use alloc::string::String;
use core::fmt::{self, Write};
use core::str::FromStr;

use crate::kstate::{ResolvedInodeInfo, ResolvedMemoryRegion};

/// Upper bound on the length of a rendered record, newline included.
///
/// Every numeric field is at most 20 characters (`u64::MAX`, `i64::MIN`),
/// which puts the longest record of either kind at 153 bytes.
pub const MAX_RECORD_LEN: usize = 160;

/// A resource that renders as one record line.
pub trait Record {
    /// Write the record, including its trailing newline.
    fn write_record(&self, out: &mut dyn Write) -> fmt::Result;

    /// Render the record into a new string.
    fn render(&self) -> String {
        let mut line = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_record(&mut line);
        line
    }
}

impl Record for ResolvedMemoryRegion {
    fn write_record(&self, out: &mut dyn Write) -> fmt::Result {
        let file_inode = self.backing_inode.map_or(-1, |ino| ino as i64);
        writeln!(
            out,
            "{{\"start\": {}, \"end\": {}, \"flags\": {}, \"prev\": {}, \"next\": {}, \"file_inode\": {}}}",
            self.start,
            self.end,
            self.flags,
            self.has_prev as u8,
            self.has_next as u8,
            file_inode
        )
    }
}

impl Record for ResolvedInodeInfo {
    fn write_record(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(
            out,
            "{{\"no\": {}, \"bytes\": {}, \"atime\": {}, \"mtime\": {}, \"ctime\": {}}}",
            self.number, self.size_hint, self.access_time, self.modify_time, self.change_time
        )
    }
}

/// A record line that could not be parsed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRecordError {
    /// The line is not a single `{...}` object.
    Malformed,
    /// A field is missing or out of order.
    MissingField(&'static str),
    /// A field value is out of range for its type.
    BadValue(&'static str),
}

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed record"),
            Self::MissingField(key) => write!(f, "missing field \"{}\"", key),
            Self::BadValue(key) => write!(f, "bad value for \"{}\"", key),
        }
    }
}

impl core::error::Error for ParseRecordError {}

/// Split a record line into the values of `keys`, which must appear in
/// exactly this order and be the only fields.
fn fields<'a, const N: usize>(
    line: &'a str,
    keys: [&'static str; N],
) -> Result<[&'a str; N], ParseRecordError> {
    let body = line
        .strip_suffix('\n')
        .unwrap_or(line)
        .strip_prefix('{')
        .and_then(|body| body.strip_suffix('}'))
        .ok_or(ParseRecordError::Malformed)?;

    let mut parts = body.split(", ");
    let mut values = [""; N];
    for (value, key) in values.iter_mut().zip(keys) {
        let (name, raw) = parts
            .next()
            .and_then(|part| part.split_once(": "))
            .ok_or(ParseRecordError::MissingField(key))?;
        if name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) != Some(key) {
            return Err(ParseRecordError::MissingField(key));
        }
        *value = raw;
    }
    if parts.next().is_some() {
        return Err(ParseRecordError::Malformed);
    }
    Ok(values)
}

fn number<T: FromStr>(raw: &str, key: &'static str) -> Result<T, ParseRecordError> {
    raw.parse().map_err(|_| ParseRecordError::BadValue(key))
}

fn flag(raw: &str, key: &'static str) -> Result<bool, ParseRecordError> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ParseRecordError::BadValue(key)),
    }
}

impl FromStr for ResolvedMemoryRegion {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let [start, end, flags, prev, next, file_inode] =
            fields(line, ["start", "end", "flags", "prev", "next", "file_inode"])?;

        let backing_inode = match number::<i64>(file_inode, "file_inode")? {
            -1 => None,
            ino if ino >= 0 => Some(ino as u64),
            _ => return Err(ParseRecordError::BadValue("file_inode")),
        };

        Ok(Self {
            start: number(start, "start")?,
            end: number(end, "end")?,
            flags: number(flags, "flags")?,
            has_prev: flag(prev, "prev")?,
            has_next: flag(next, "next")?,
            backing_inode,
        })
    }
}

impl FromStr for ResolvedInodeInfo {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let [no, bytes, atime, mtime, ctime] =
            fields(line, ["no", "bytes", "atime", "mtime", "ctime"])?;
        Ok(Self {
            number: number(no, "no")?,
            size_hint: number(bytes, "bytes")?,
            access_time: number(atime, "atime")?,
            modify_time: number(mtime, "mtime")?,
            change_time: number(ctime, "ctime")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_region_reports_minus_one() {
        let region = ResolvedMemoryRegion {
            start: 0x1000,
            end: 0x2000,
            flags: 0x73,
            has_prev: false,
            has_next: true,
            backing_inode: None,
        };
        assert_eq!(
            region.render(),
            "{\"start\": 4096, \"end\": 8192, \"flags\": 115, \"prev\": 0, \"next\": 1, \"file_inode\": -1}\n"
        );
    }

    #[test]
    fn test_inode_record_field_order() {
        let info = ResolvedInodeInfo {
            number: 77,
            size_hint: 300,
            access_time: 1,
            modify_time: 2,
            change_time: -3,
        };
        assert_eq!(
            info.render(),
            "{\"no\": 77, \"bytes\": 300, \"atime\": 1, \"mtime\": 2, \"ctime\": -3}\n"
        );
    }

    #[test]
    fn test_parse_inverts_render() {
        let region = ResolvedMemoryRegion {
            start: 0x5555_0000_0000,
            end: 0x5555_0000_4000,
            flags: 0x75,
            has_prev: false,
            has_next: true,
            backing_inode: Some(131_090),
        };
        assert_eq!(region.render().parse::<ResolvedMemoryRegion>(), Ok(region));

        let anonymous = ResolvedMemoryRegion {
            backing_inode: None,
            has_prev: true,
            ..region
        };
        let parsed: ResolvedMemoryRegion = anonymous.render().parse().unwrap();
        assert_eq!(parsed.backing_inode, None);
        assert!(parsed.has_prev);

        let info = ResolvedInodeInfo {
            number: 393_224,
            size_hint: 2_771,
            access_time: 1_700_000_100,
            modify_time: 1_690_000_000,
            change_time: -5,
        };
        assert_eq!(info.render().parse::<ResolvedInodeInfo>(), Ok(info));
    }

    #[test]
    fn test_parse_rejects_foreign_lines() {
        assert_eq!(
            "not a record".parse::<ResolvedInodeInfo>(),
            Err(ParseRecordError::Malformed)
        );
        // An inode record is not a memory region.
        let inode = "{\"no\": 1, \"bytes\": 2, \"atime\": 3, \"mtime\": 4, \"ctime\": 5}\n";
        assert_eq!(
            inode.parse::<ResolvedMemoryRegion>(),
            Err(ParseRecordError::MissingField("start"))
        );
        let extra = "{\"no\": 1, \"bytes\": 2, \"atime\": 3, \"mtime\": 4, \"ctime\": 5, \"x\": 6}";
        assert_eq!(
            extra.parse::<ResolvedInodeInfo>(),
            Err(ParseRecordError::Malformed)
        );
        let bad_flag =
            "{\"start\": 1, \"end\": 2, \"flags\": 3, \"prev\": 2, \"next\": 0, \"file_inode\": -1}";
        assert_eq!(
            bad_flag.parse::<ResolvedMemoryRegion>(),
            Err(ParseRecordError::BadValue("prev"))
        );
        let bad_inode =
            "{\"start\": 1, \"end\": 2, \"flags\": 3, \"prev\": 0, \"next\": 0, \"file_inode\": -2}";
        assert_eq!(
            bad_inode.parse::<ResolvedMemoryRegion>(),
            Err(ParseRecordError::BadValue("file_inode"))
        );
    }

    #[test]
    fn test_widest_records_fit_max_len() {
        let region = ResolvedMemoryRegion {
            start: u64::MAX,
            end: u64::MAX,
            flags: u64::MAX,
            has_prev: true,
            has_next: true,
            backing_inode: Some(i64::MAX as u64),
        };
        let info = ResolvedInodeInfo {
            number: u64::MAX,
            size_hint: u64::MAX,
            access_time: i64::MIN,
            modify_time: i64::MIN,
            change_time: i64::MIN,
        };
        assert!(region.render().len() <= MAX_RECORD_LEN);
        assert!(info.render().len() <= MAX_RECORD_LEN);
    }
}
