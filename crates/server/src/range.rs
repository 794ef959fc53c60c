/// Inclusive byte span of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// Malformed or unsupported; the header should be ignored.
    Invalid,
    /// Well-formed but outside the resource; answer with 416.
    Unsatisfiable,
}

impl ByteRange {
    /// Parses a single `bytes=` range against a resource of `size` bytes.
    /// Multi-range requests count as invalid.
    pub fn parse(header: &str, size: u64) -> Result<Self, RangeError> {
        let spec = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or(RangeError::Invalid)?;
        if spec.contains(',') {
            return Err(RangeError::Invalid);
        }
        let (first, last) = spec.split_once('-').ok_or(RangeError::Invalid)?;
        let first = parse_bound(first)?;
        let last = parse_bound(last)?;
        if size == 0 {
            return Err(RangeError::Unsatisfiable);
        }
        let last_byte = size - 1;

        match (first, last) {
            (None, None) => Err(RangeError::Invalid),
            // Suffix form: the final `n` bytes.
            (None, Some(0)) => Err(RangeError::Unsatisfiable),
            (None, Some(n)) => Ok(Self {
                start: size.saturating_sub(n),
                end: last_byte,
            }),
            (Some(start), _) if start > last_byte => Err(RangeError::Unsatisfiable),
            (Some(start), None) => Ok(Self {
                start,
                end: last_byte,
            }),
            (Some(start), Some(end)) if end < start => Err(RangeError::Invalid),
            (Some(start), Some(end)) => Ok(Self {
                start,
                end: end.min(last_byte),
            }),
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

fn parse_bound(value: &str) -> Result<Option<u64>, RangeError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| RangeError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::{ByteRange, RangeError};

    fn span(start: u64, end: u64) -> ByteRange {
        ByteRange { start, end }
    }

    #[test]
    fn open_and_closed_ranges() {
        assert_eq!(ByteRange::parse("bytes=0-", 100), Ok(span(0, 99)));
        assert_eq!(ByteRange::parse("bytes=10-19", 100), Ok(span(10, 19)));
        assert_eq!(ByteRange::parse("bytes=99-99", 100), Ok(span(99, 99)));
    }

    #[test]
    fn end_past_the_resource_is_clamped() {
        assert_eq!(ByteRange::parse("bytes=90-200", 100), Ok(span(90, 99)));
    }

    #[test]
    fn suffix_ranges() {
        assert_eq!(ByteRange::parse("bytes=-10", 100), Ok(span(90, 99)));
        assert_eq!(ByteRange::parse("bytes=-500", 100), Ok(span(0, 99)));
        assert_eq!(ByteRange::parse("bytes=-0", 100), Err(RangeError::Unsatisfiable));
    }

    #[test]
    fn malformed_headers_are_invalid() {
        for header in ["bytes=0-1,2-3", "bytes=10-5", "items=0-1", "bytes=-", "bytes=5", "bytes=a-b"] {
            assert_eq!(ByteRange::parse(header, 100), Err(RangeError::Invalid), "{}", header);
        }
    }

    #[test]
    fn out_of_bounds_is_unsatisfiable() {
        assert_eq!(ByteRange::parse("bytes=100-", 100), Err(RangeError::Unsatisfiable));
        assert_eq!(ByteRange::parse("bytes=0-", 0), Err(RangeError::Unsatisfiable));
    }

    #[test]
    fn formats_content_range() {
        let range = ByteRange::parse("bytes=2-5", 10).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(range.content_range(10), "bytes 2-5/10");
    }
}
