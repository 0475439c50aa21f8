use crate::error::PortRangeError;

/// Lowest and highest TCP ports accepted for scanning.
pub const MIN_PORT: u16 = 1;
pub const MAX_PORT: u16 = 65535;

/// Parse an inclusive port range into `(start, end)`.
///
/// Supported formats:
/// - single port number: `80` (scans just that port)
/// - inclusive range: `1-1024`
/// - surrounding whitespace is ignored
pub fn parse_range(s: &str) -> Result<(u16, u16), PortRangeError> {
    let line = s.trim();

    if let Some((a, b)) = line.split_once('-') {
        let start = parse_port_str(a.trim())?;
        let end = parse_port_str(b.trim())?;
        validate_range(start, end)?;
        return Ok((start, end));
    }

    let p = parse_port_str(line)?;
    Ok((p, p))
}

/// Combine separately entered start and end ports into a validated range.
pub fn range_from(
    start: Result<u16, PortRangeError>,
    end: Result<u16, PortRangeError>,
) -> Result<(u16, u16), PortRangeError> {
    let (start, end) = (start?, end?);
    validate_range(start, end)?;
    Ok((start, end))
}

/// Check that `start..=end` is a non-empty range inside `1..=65535`.
pub fn validate_range(start: u16, end: u16) -> Result<(), PortRangeError> {
    if start < MIN_PORT {
        return Err(PortRangeError::OutOfRange(u32::from(start)));
    }
    if end < MIN_PORT {
        return Err(PortRangeError::OutOfRange(u32::from(end)));
    }
    if start > end {
        return Err(PortRangeError::Inverted { start, end });
    }
    Ok(())
}

/// Parse one port number, accepting only `1..=65535`.
pub fn parse_port_str(s: &str) -> Result<u16, PortRangeError> {
    let val: u32 = s
        .parse::<u32>()
        .map_err(|_| PortRangeError::NotANumber(s.to_string()))?;
    if val < u32::from(MIN_PORT) || val > u32::from(MAX_PORT) {
        return Err(PortRangeError::OutOfRange(val));
    }
    Ok(val as u16)
}
