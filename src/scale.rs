use std::{fmt::Display, fs, path::Path};

use tracing::{debug, trace};

use crate::{FormatError, Tone};

const PARSED_SCALE_NAME: &str = "Scale from patch";

/// The Scale is the representation of the SCL file.
///
/// It holds one period of a tuning as a list of [`Tone`]s above the implicit `1/1`, plus the
/// description and raw text of the file. The last tone is conventionally the period, the
/// interval at which the scale repeats.
///
/// Scales are read-only once parsed or generated. In most normal use you will pass them to a
/// [`Tuning`](crate::Tuning), but [`Scale::raw_text`] and [`Scale::count`] are handy when
/// showing a scale to end users.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    name: String,
    description: String,
    raw_text: String,
    count: usize,
    tones: Vec<Tone>,
}

impl Default for Scale {
    fn default() -> Self {
        Scale::new()
    }
}

impl Scale {
    /// Constructs an empty scale named `empty scale`.
    pub fn new() -> Self {
        Scale {
            name: String::from("empty scale"),
            description: String::new(),
            raw_text: String::new(),
            count: 0,
            tones: Vec::new(),
        }
    }

    /// Returns the scale renamed to `name`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Origin of the scale, usually a file name. Informational only.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description line of the SCL file. Informational only.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The text the scale was parsed from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Number of tones in the scale.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The tones, in file order.
    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    /// Cents of the last tone, the interval at which the scale repeats.
    pub fn period_cents(&self) -> Option<f64> {
        self.tones.last().map(Tone::cents)
    }

    /// Reads and parses the SCL file at `path`. The scale is named after the path.
    pub fn read_scl_file<P>(path: P) -> Result<Self, FormatError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading scale file");

        let content = fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Scale::parse_scl_data(&content)?.with_name(path.to_string_lossy()))
    }

    /// Parses SCL file contents held in memory.
    ///
    /// Lines starting with `!` are comments. The first other line is the description, the next
    /// one the note count and the following `count` lines are the tones. Blank lines among the
    /// tones and anything after the last tone are ignored.
    pub fn parse_scl_data(scl_contents: &str) -> Result<Self, FormatError> {
        enum State {
            Description,
            Count,
            Tones,
            Trailing,
        }
        let mut state = State::Description;

        let mut res = Scale::new().with_name(PARSED_SCALE_NAME);

        for (index, line) in scl_contents.split('\n').map(str::trim).enumerate() {
            let line_number = index + 1;
            if line.starts_with('!') {
                continue;
            }

            match state {
                State::Description => {
                    res.description = line.to_string();
                    state = State::Count;
                }
                State::Count => {
                    res.count = line.parse().map_err(|_| FormatError::InvalidInteger {
                        line: line_number,
                        field: "note count",
                        text: line.to_string(),
                    })?;
                    state = if res.count == 0 {
                        State::Trailing
                    } else {
                        State::Tones
                    };
                }
                State::Tones => {
                    if line.is_empty() {
                        continue;
                    }

                    let tone = Tone::from_string(line, Some(res.tones.len() + 1))
                        .map_err(|e| e.at_line(line_number))?;
                    res.tones.push(tone);

                    if res.tones.len() == res.count {
                        state = State::Trailing;
                    }
                }
                State::Trailing => {
                    if !line.is_empty() {
                        trace!(line = line_number, "ignoring trailing scale line");
                    }
                }
            }
        }

        match state {
            State::Description => {
                return Err(FormatError::Incomplete {
                    expected: "scale description",
                })
            }
            State::Count => return Err(FormatError::Incomplete { expected: "note count" }),
            State::Tones => {
                return Err(FormatError::MissingTones {
                    expected: res.count,
                    found: res.tones.len(),
                })
            }
            State::Trailing => {}
        }

        res.raw_text = scl_contents.to_string();
        debug!(count = res.count, description = %res.description, "parsed scale");
        Ok(res)
    }

    /// Provides a utility scale which is the "standard tuning" scale.
    pub fn even_temperament_12_note_scale() -> Self {
        let data = "! 12 Tone Equal Temperament.scl
!
12 Tone Equal Temperament | ED2-12 - Equal division of harmonic 2 into 12 parts
 12
!
 100.00000
 200.00000
 300.00000
 400.00000
 500.00000
 600.00000
 700.00000
 800.00000
 900.00000
 1000.00000
 1100.00000
 2/1
";

        Scale::parse_scl_data(data).expect("the built-in 12 tone scale is well formed")
    }

    /// Provides a scale referred to as "ED2-17" or "ED3-24" by dividing the `span` into `m`
    /// equal steps. The last tone is written as the ratio `span/1`, so the period carries no
    /// rounding. `Scale::even_division_of_span_by_m(2, 12)` has the same tones as
    /// [`Scale::even_temperament_12_note_scale()`].
    ///
    /// ```
    /// # use tunings::Scale;
    /// let s1 = Scale::even_division_of_span_by_m(2, 12).unwrap(); // 12-EDO
    /// let s2 = Scale::even_division_of_span_by_m(2, 17).unwrap(); // ED2-17
    /// let s3 = Scale::even_division_of_span_by_m(3, 24).unwrap(); // ED3-24
    /// assert_eq!(s3.count(), 24);
    /// ```
    pub fn even_division_of_span_by_m(span: u32, m: u32) -> Result<Self, FormatError> {
        if span == 0 {
            return Err(FormatError::ZeroSpan);
        }

        if m == 0 {
            return Err(FormatError::ZeroDivisions);
        }

        let title = format!("Automatically generated ED{span}-{m} scale");
        let step = 1200.0 * f64::from(span).log2() / f64::from(m);

        Scale::parse_scl_data(&generated_scl(&title, step, m, &format!("{span}/1")))
    }

    /// Provides a scale which divides `cents` into `m` equal steps.
    ///
    /// The last tone is written as `cents` unless a non-empty `last_label` is given, in which
    /// case that text is used instead, e.g. `"3"` to express a 1901.955 cent period as the ratio `3/1`.
    /// The label goes through the regular tone parser.
    pub fn even_division_of_cents_by_m(
        cents: f64,
        m: u32,
        last_label: Option<&str>,
    ) -> Result<Self, FormatError> {
        if !(cents > 0.0) {
            return Err(FormatError::NonPositiveCents { cents });
        }

        if m == 0 {
            return Err(FormatError::ZeroDivisions);
        }

        let title = format!("Automatically generated Even Division of {cents} ct into {m} scale");
        let last = match last_label.map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("{cents:.6}"),
        };

        Scale::parse_scl_data(&generated_scl(&title, cents / f64::from(m), m, &last))
    }
}

/// SCL text with `m - 1` equal steps of `step` cents followed by `last`.
fn generated_scl(title: &str, step: f64, m: u32, last: &str) -> String {
    let mut data = format!("! {title}\n{title}\n{m}\n!\n");
    for i in 1..m {
        data += &format!("{:.6}\n", step * f64::from(i));
    }
    data += last;
    data.push('\n');
    data
}

impl Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw_text)
    }
}
