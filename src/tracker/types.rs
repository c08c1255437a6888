use std::fmt;

use super::TrackerError;

/// Longest satellite name carried through the handoff.
pub const NAME_MAX: usize = 24;
/// Fixed width of both TLE lines.
pub const LINE_LEN: usize = 69;

/// Satellite name plus both TLE lines in fixed-size storage.
///
/// Only constructed through [`ElementSet::new`], so every value is printable
/// ASCII with correctly sized lines. Being `Copy` and allocation-free, it can
/// move between the command surface and the tracking loop without touching the
/// allocator.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ElementSet {
    name: [u8; NAME_MAX],
    name_len: u8,
    line1: [u8; LINE_LEN],
    line2: [u8; LINE_LEN],
}

impl ElementSet {
    pub fn new(name: &str, line1: &str, line2: &str) -> Result<Self, TrackerError> {
        let name = name.trim();
        if name.is_empty() || name.len() > NAME_MAX {
            return Err(TrackerError::InvalidName {
                len: name.len(),
                max: NAME_MAX,
            });
        }
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        for text in [name, line1, line2] {
            if !text.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
                return Err(TrackerError::NotAscii);
            }
        }

        let mut set = Self {
            name: [b' '; NAME_MAX],
            name_len: name.len() as u8,
            line1: [0; LINE_LEN],
            line2: [0; LINE_LEN],
        };
        set.name[..name.len()].copy_from_slice(name.as_bytes());
        set.line1 = fixed_line(1, line1)?;
        set.line2 = fixed_line(2, line2)?;
        Ok(set)
    }

    pub fn name(&self) -> &str {
        ascii(&self.name[..usize::from(self.name_len)])
    }

    pub fn line1(&self) -> &str {
        ascii(&self.line1)
    }

    pub fn line2(&self) -> &str {
        ascii(&self.line2)
    }

    /// Catalogue number from columns 3 to 7 of line 1.
    pub fn norad_id(&self) -> Option<u32> {
        self.line1().get(2..7)?.trim().parse().ok()
    }
}

fn fixed_line(number: u8, line: &str) -> Result<[u8; LINE_LEN], TrackerError> {
    let bytes = line.as_bytes();
    if bytes.len() != LINE_LEN {
        return Err(TrackerError::InvalidLineLength {
            line: number,
            len: bytes.len(),
            expected: LINE_LEN,
        });
    }
    if bytes[0] != b'0' + number {
        return Err(TrackerError::InvalidLinePrefix { line: number });
    }
    let mut fixed = [0; LINE_LEN];
    fixed.copy_from_slice(bytes);
    Ok(fixed)
}

fn ascii(bytes: &[u8]) -> &str {
    // validated as ASCII on construction
    std::str::from_utf8(bytes).unwrap_or_default()
}

impl fmt::Debug for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSet")
            .field("name", &self.name())
            .field("line1", &self.line1())
            .field("line2", &self.line2())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    const LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    #[test]
    fn accepts_well_formed_set() {
        let set = ElementSet::new("  ISS (ZARYA) ", LINE1, LINE2).unwrap();
        assert_eq!(set.name(), "ISS (ZARYA)");
        assert_eq!(set.line1(), LINE1);
        assert_eq!(set.line2(), LINE2);
        assert_eq!(set.norad_id(), Some(25544));
    }

    #[test]
    fn rejects_long_or_empty_names() {
        assert!(matches!(
            ElementSet::new("A NAME THAT IS FAR TOO LONG", LINE1, LINE2),
            Err(TrackerError::InvalidName { len: 27, max: 24 })
        ));
        assert!(ElementSet::new("   ", LINE1, LINE2).is_err());
        assert!(ElementSet::new(&"X".repeat(24), LINE1, LINE2).is_ok());
    }

    #[test]
    fn rejects_wrong_line_length() {
        let short = &LINE1[..68];
        assert!(matches!(
            ElementSet::new("ISS", short, LINE2),
            Err(TrackerError::InvalidLineLength {
                line: 1,
                len: 68,
                expected: 69
            })
        ));
        let long = format!("{} 1", LINE2);
        assert!(matches!(
            ElementSet::new("ISS", LINE1, &long),
            Err(TrackerError::InvalidLineLength { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_swapped_lines() {
        assert!(matches!(
            ElementSet::new("ISS", LINE2, LINE1),
            Err(TrackerError::InvalidLinePrefix { line: 1 })
        ));
    }

    #[test]
    fn rejects_non_ascii() {
        let line = LINE1.replacen("U", "Ü", 1);
        assert!(matches!(
            ElementSet::new("ISS", &line, LINE2),
            Err(TrackerError::NotAscii)
        ));
    }
}
