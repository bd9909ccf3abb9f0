//! Quirks-mode handling.
//!
//! `QuirksMode` determines how the HTML parser handles certain legacy
//! behaviors that were present in older browsers:
//!
//! - [`QuirksMode::Off`] (`"no-quirks"`, default): the parser strictly
//!   follows modern HTML standards.
//! - [`QuirksMode::Limited`] (`"limited-quirks"`): emulates *some* legacy
//!   behaviors while still adhering to modern standards in key areas.
//! - [`QuirksMode::Full`] (`"quirks"`): emulates older browser behavior
//!   for maximum compatibility with legacy content.
//!
//! During parsing the mode is derived from the doctype; the resulting
//! value is observable on [`Parser`](crate::Parser) and
//! [`Html`](crate::Html) after parsing finishes.

use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::str::FromStr;

use derive_more::with_trait::IsVariant;
use derive_more::with_trait::TryFrom;
use markup5ever::interface::QuirksMode as ServoQuirksMode;

/// Numeric alias for [`QuirksMode::Off`].
pub const QUIRKS_MODE_OFF: u8 = 0;
/// Numeric alias for [`QuirksMode::Limited`].
pub const QUIRKS_MODE_LIMITED: u8 = 1;
/// Numeric alias for [`QuirksMode::Full`].
pub const QUIRKS_MODE_FULL: u8 = 2;

/// The quirks mode of a parsed document.
#[repr(u8)]
#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, Hash, IsVariant, TryFrom,
)]
#[try_from(repr)]
pub enum QuirksMode {
  #[default]
  Off = QUIRKS_MODE_OFF,
  Limited = QUIRKS_MODE_LIMITED,
  Full = QUIRKS_MODE_FULL,
}

impl Display for QuirksMode {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      QuirksMode::Full => write!(f, "quirks"),
      QuirksMode::Limited => write!(f, "limited-quirks"),
      QuirksMode::Off => write!(f, "no-quirks"),
    }
  }
}

impl FromStr for QuirksMode {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    use crate::QuirksMode::*;
    match s.to_lowercase().trim() {
      "all" | "yes" | "full" | "quirks" => Ok(Full),
      "some" | "limited" | "partial" | "limited-quirks" => Ok(Limited),
      _ => Ok(Off),
    }
  }
}

impl From<ServoQuirksMode> for QuirksMode {
  fn from(q: ServoQuirksMode) -> Self {
    match q {
      ServoQuirksMode::Quirks => QuirksMode::Full,
      ServoQuirksMode::LimitedQuirks => QuirksMode::Limited,
      ServoQuirksMode::NoQuirks => QuirksMode::Off,
    }
  }
}

impl From<QuirksMode> for ServoQuirksMode {
  fn from(q: QuirksMode) -> Self {
    match q {
      QuirksMode::Full => ServoQuirksMode::Quirks,
      QuirksMode::Limited => ServoQuirksMode::LimitedQuirks,
      QuirksMode::Off => ServoQuirksMode::NoQuirks,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_reprs_match_constants() {
    assert_eq!(QuirksMode::Off as u8, QUIRKS_MODE_OFF);
    assert_eq!(QuirksMode::Limited as u8, QUIRKS_MODE_LIMITED);
    assert_eq!(QuirksMode::Full as u8, QUIRKS_MODE_FULL);

    assert!(matches!(QuirksMode::try_from(2u8), Ok(QuirksMode::Full)));
    assert!(QuirksMode::try_from(7u8).is_err());
  }

  #[test]
  fn round_trips_through_servo() {
    for mode in [QuirksMode::Off, QuirksMode::Limited, QuirksMode::Full] {
      let servo: ServoQuirksMode = mode.into();
      assert_eq!(QuirksMode::from(servo), mode);
    }
  }

  #[test]
  fn parses_loose_names() {
    assert_eq!("quirks".parse(), Ok(QuirksMode::Full));
    assert_eq!("limited-quirks".parse(), Ok(QuirksMode::Limited));
    assert_eq!("anything-else".parse(), Ok(QuirksMode::Off));
  }
}
