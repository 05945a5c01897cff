//! Attract sequence parser and display.
//!
//! # Syntax
//!
//! ```text
//! rainbow||6                             rainbow for 6 seconds
//! color_wipe|255,0,0|3;comet|0,0,0,255|  entries separated by `;`
//! pulse|0,0,255                          missing duration uses the default
//! ```
//!
//! Parsing never fails: empty entries and entries without a name are dropped,
//! and a field that doesn't parse is simply left unset.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use booth_strip::PixelColor;

/// One `(pattern, color, duration)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    /// Pattern name as written; resolved against the registry at play time
    pub pattern: String,
    pub color: Option<PixelColor>,
    pub duration: Option<Duration>,
}

impl SequenceEntry {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            color: None,
            duration: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: PixelColor) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Parse a duration field in seconds. Non-positive or unrepresentable values
/// count as absent.
fn parse_seconds(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().parse().ok()?;
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

fn parse_entry(part: &str) -> Option<SequenceEntry> {
    let mut fields = part.split('|').map(str::trim);
    let name = fields.next().unwrap_or("");
    if name.is_empty() {
        return None;
    }
    let color = fields.next().and_then(PixelColor::parse_csv);
    let duration = fields.next().and_then(parse_seconds);
    Some(SequenceEntry {
        pattern: name.to_string(),
        color,
        duration,
    })
}

/// Ordered list of entries, cycled with wraparound by the attract player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttractSequence {
    entries: Vec<SequenceEntry>,
}

impl AttractSequence {
    pub fn new(entries: Vec<SequenceEntry>) -> Self {
        Self { entries }
    }

    pub fn parse(s: &str) -> Self {
        let entries = s
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .filter_map(parse_entry)
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, wrapping around the end of the list.
    pub fn get_wrapping(&self, index: usize) -> Option<&SequenceEntry> {
        if self.entries.is_empty() {
            None
        } else {
            self.entries.get(index % self.entries.len())
        }
    }
}

impl FromStr for AttractSequence {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for SequenceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.pattern)?;
        if let Some(color) = self.color {
            write!(f, "{color}")?;
        }
        write!(f, "|")?;
        if let Some(duration) = self.duration {
            write!(f, "{}", duration.as_secs_f64())?;
        }
        Ok(())
    }
}

impl fmt::Display for AttractSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
