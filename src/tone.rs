use std::{fmt::Display, str::FromStr};

use crate::FormatError;

/// Value of a tone.
///
/// The value of a tone is given either as a cents value or ratio.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ToneValue {
    /// Value of a tone given as cents above the unison.
    /// ```
    /// # use tunings::*;
    /// ToneValue::Cents(1200.0); // an octave
    /// ToneValue::Cents(700.0); // a 12-EDO fifth
    /// ```
    Cents(f64),

    /// Value of a tone given as a ratio of positive integers.
    /// ```
    /// # use tunings::*;
    /// ToneValue::Ratio(2, 1); // an octave as well
    /// ToneValue::Ratio(3, 2); // a just fifth
    /// ```
    Ratio(i64, i64),
}

impl ToneValue {
    fn cents(&self) -> f64 {
        match *self {
            Self::Cents(value) => value,
            Self::Ratio(n, d) => 1200.0 * (n as f64 / d as f64).log2(),
        }
    }
}

impl Default for ToneValue {
    fn default() -> Self {
        ToneValue::Ratio(1, 1)
    }
}

/// A single entry of a scale: one step above the implicit `1/1`.
///
/// Tones are immutable once built. The cents value is derived at construction, so it is
/// available for both kinds of tone.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    value: ToneValue,
    cents: f64,
    string_rep: String,
    line_number: Option<usize>,
}

impl Tone {
    /// Tone given in cents.
    pub fn from_cents(cents: f64) -> Self {
        Tone {
            value: ToneValue::Cents(cents),
            cents,
            string_rep: format!("{cents:.6}"),
            line_number: None,
        }
    }

    /// Tone given as the ratio `n/d`. Both parts must be positive.
    pub fn from_ratio(n: i64, d: i64) -> Result<Self, FormatError> {
        if n <= 0 || d <= 0 {
            return Err(FormatError::NonPositiveRatio {
                line: None,
                text: format!("{n}/{d}"),
            });
        }

        let value = ToneValue::Ratio(n, d);
        Ok(Tone {
            value,
            cents: value.cents(),
            string_rep: format!("{n}/{d}"),
            line_number: None,
        })
    }

    /// Parses a tone line.
    ///
    /// Text containing a `.` is a cents value. Anything else is a ratio `n/d`, or a bare
    /// integer `n` meaning `n/1`. `line_number` is only stored for diagnostics.
    ///
    /// ```
    /// # use tunings::*;
    /// let fifth = Tone::from_string("3/2", None).unwrap();
    /// assert_eq!(fifth.value(), ToneValue::Ratio(3, 2));
    ///
    /// let quarter = Tone::from_string("50.0", Some(4)).unwrap();
    /// assert_eq!(quarter.cents(), 50.0);
    /// assert_eq!(quarter.line_number(), Some(4));
    /// ```
    pub fn from_string(text: &str, line_number: Option<usize>) -> Result<Self, FormatError> {
        let text = text.trim();
        let invalid = || FormatError::InvalidTone {
            line: line_number,
            text: text.to_string(),
        };

        let value = if text.contains('.') {
            let cents: f64 = text.parse().map_err(|_| invalid())?;
            if !cents.is_finite() {
                return Err(invalid());
            }
            ToneValue::Cents(cents)
        } else {
            let (n, d) = text.split_once('/').unwrap_or((text, "1"));
            let n: i64 = n.trim().parse().map_err(|_| invalid())?;
            let d: i64 = d.trim().parse().map_err(|_| invalid())?;
            if n <= 0 || d <= 0 {
                return Err(FormatError::NonPositiveRatio {
                    line: line_number,
                    text: text.to_string(),
                });
            }
            ToneValue::Ratio(n, d)
        };

        Ok(Tone {
            value,
            cents: value.cents(),
            string_rep: text.to_string(),
            line_number,
        })
    }

    /// The value as written.
    pub fn value(&self) -> ToneValue {
        self.value
    }

    /// Cents above the unison.
    pub fn cents(&self) -> f64 {
        self.cents
    }

    /// Equal to `cents() / 1200 + 1`.
    pub fn float_value(&self) -> f64 {
        self.cents / 1200.0 + 1.0
    }

    /// Numerator of a ratio tone, 1 for cents tones.
    pub fn ratio_n(&self) -> i64 {
        match self.value {
            ToneValue::Ratio(n, _) => n,
            ToneValue::Cents(_) => 1,
        }
    }

    /// Denominator of a ratio tone, 1 for cents tones.
    pub fn ratio_d(&self) -> i64 {
        match self.value {
            ToneValue::Ratio(_, d) => d,
            ToneValue::Cents(_) => 1,
        }
    }

    /// Original text of the tone, e.g. `8/7` or `150.0`.
    pub fn string_rep(&self) -> &str {
        &self.string_rep
    }

    /// Position of the tone within the tone block of the file it was parsed from.
    pub fn line_number(&self) -> Option<usize> {
        self.line_number
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone {
            value: ToneValue::default(),
            cents: 0.0,
            string_rep: String::from("1/1"),
            line_number: None,
        }
    }
}

impl FromStr for Tone {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::from_string(s, None)
    }
}

impl Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string_rep)
    }
}
