//! Output filename patterns.
//!
//! A pattern is a filename with exactly one printf-style integer
//! placeholder: `%d`, `%Nd` (space padded to width N) or `%0Nd` (zero
//! padded). `%%` is a literal percent sign. Formatted names longer than
//! [`MAX_FILENAME_LEN`] bytes are rejected.
//!
//! ```
//! use framepick::FilenamePattern;
//!
//! let pattern: FilenamePattern = "frame-%04d.jpg".parse()?;
//! assert_eq!(pattern.format(7)?, "frame-0007.jpg");
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::str::FromStr;

use crate::error::FramePickError;

/// Longest filename [`FilenamePattern::format`] will produce, in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// A parsed filename pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    prefix: String,
    suffix: String,
    width: usize,
    zero_pad: bool,
}

impl FilenamePattern {
    /// Parse `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::InvalidPattern`] if the pattern has no
    /// placeholder, more than one, an unsupported conversion, or a path
    /// separator.
    pub fn parse(pattern: &str) -> Result<Self, FramePickError> {
        let invalid =
            |reason: &str| FramePickError::InvalidPattern(format!("'{pattern}': {reason}"));

        if pattern.contains(['/', '\\']) {
            return Err(invalid("must be a bare filename"));
        }

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut placeholder: Option<(usize, bool)> = None;
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            let target = if placeholder.is_some() { &mut suffix } else { &mut prefix };
            if c != '%' {
                target.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                target.push('%');
                continue;
            }

            let zero_pad = chars.peek() == Some(&'0');
            if zero_pad {
                chars.next();
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            if chars.next() != Some('d') {
                return Err(invalid("only %d, %Nd and %0Nd placeholders are supported"));
            }
            if placeholder.is_some() {
                return Err(invalid("more than one %d placeholder"));
            }
            let width = if digits.is_empty() {
                0
            } else {
                digits
                    .parse::<usize>()
                    .ok()
                    .filter(|&w| w <= MAX_FILENAME_LEN)
                    .ok_or_else(|| invalid("placeholder width is too large"))?
            };
            placeholder = Some((width, zero_pad));
        }

        let (width, zero_pad) = placeholder.ok_or_else(|| invalid("missing %d placeholder"))?;
        Ok(Self {
            prefix,
            suffix,
            width,
            zero_pad,
        })
    }

    /// Substitute `index` into the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`FramePickError::FilenameTooLong`] if the result exceeds
    /// [`MAX_FILENAME_LEN`] bytes.
    pub fn format(&self, index: u64) -> Result<String, FramePickError> {
        let number = if self.zero_pad {
            format!("{index:0width$}", width = self.width)
        } else {
            format!("{index:width$}", width = self.width)
        };
        let name = format!("{}{number}{}", self.prefix, self.suffix);

        if name.len() > MAX_FILENAME_LEN {
            return Err(FramePickError::FilenameTooLong {
                length: name.len(),
                limit: MAX_FILENAME_LEN,
            });
        }
        Ok(name)
    }
}

impl FromStr for FilenamePattern {
    type Err = FramePickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
