use crate::tracker::{ElementSet, TrackerError};

/// Parse a single element set given as two lines, or three with a name first.
/// Unnamed sets are named after their catalogue number.
pub fn parse_tle_lines(tle: &str) -> Result<ElementSet, TrackerError> {
    let lines: Vec<&str> = tle
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    match lines.as_slice() {
        [line1, line2] => ElementSet::new(&catalogue_name(line1), line1, line2),
        [name, line1, line2] => ElementSet::new(name, line1, line2),
        _ => Err(TrackerError::InvalidTleFormat),
    }
}

/// Parse every element set in a file, in order. Lines that belong to no set
/// are skipped.
pub fn parse_tle_file(content: &str) -> Result<Vec<ElementSet>, TrackerError> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with("1 ") && lines.get(i + 1).is_some_and(|l| l.starts_with("2 ")) {
            sets.push(ElementSet::new(
                &catalogue_name(lines[i]),
                lines[i],
                lines[i + 1],
            )?);
            i += 2;
        } else if lines.get(i + 1).is_some_and(|l| l.starts_with("1 "))
            && lines.get(i + 2).is_some_and(|l| l.starts_with("2 "))
        {
            sets.push(ElementSet::new(lines[i], lines[i + 1], lines[i + 2])?);
            i += 3;
        } else {
            log::debug!("Skipping stray TLE line: {}", lines[i]);
            i += 1;
        }
    }

    if sets.is_empty() {
        return Err(TrackerError::InvalidTleFormat);
    }
    Ok(sets)
}

fn catalogue_name(line1: &str) -> String {
    let id = line1.get(2..7).map(str::trim).unwrap_or_default();
    format!("NORAD {}", id)
}
