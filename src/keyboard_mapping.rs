use std::{fmt::Display, fs, path::Path};

use tracing::{debug, trace};

use crate::{FormatError, MIDI_0_FREQ};

const PARSED_MAPPING_NAME: &str = "Mapping from patch";

/// One entry of a keyboard mapping.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MappedKey {
    /// The key plays this scale degree, 0 being the `1/1`.
    Degree(u32),
    /// The key plays nothing. Written `x` (or `-1`) in KBM files.
    Unmapped,
}

impl MappedKey {
    /// The degree, if the key is mapped.
    pub fn degree(self) -> Option<u32> {
        match self {
            MappedKey::Degree(degree) => Some(degree),
            MappedKey::Unmapped => None,
        }
    }
}

/// The KeyboardMapping struct represents a KBM file.
///
/// In most cases the salient features are the [`KeyboardMapping::reference_note`] and
/// [`KeyboardMapping::reference_frequency`], which pin one MIDI key to a fixed frequency when
/// retuning. A KBM file can also remap individual keys to individual degrees of a scale through
/// its [keys][`KeyboardMapping::keys`], repeating every [`KeyboardMapping::count`] keys.
///
/// Just as with [`Scale`](crate::Scale) the [`KeyboardMapping::raw_text`] holds the KBM text.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardMapping {
    count: usize,
    first_midi: i32,
    last_midi: i32,
    middle_note: i32,
    reference_note: i32,
    reference_frequency: f64,
    reference_pitch: f64,
    octave_degrees: usize,
    keys: Vec<MappedKey>,
    raw_text: String,
    name: String,
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        KeyboardMapping::new()
    }
}

impl KeyboardMapping {
    /// Constructs the default mapping: one key per scale degree over the whole keyboard, with
    /// MIDI note 60 as degree 0 tuned to 12-TET middle C.
    pub fn new() -> Self {
        let mut k = KeyboardMapping {
            count: 0,
            first_midi: 0,
            last_midi: 127,
            middle_note: 60,
            reference_note: 60,
            reference_frequency: MIDI_0_FREQ * 32.0,
            reference_pitch: 32.0,
            octave_degrees: 0,
            keys: Vec::new(),
            raw_text: String::new(),
            name: String::new(),
        };

        k.raw_text = format!(
            "! Default KBM file\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
            k.count,
            k.first_midi,
            k.last_midi,
            k.middle_note,
            k.reference_note,
            k.reference_frequency,
            k.octave_degrees
        );

        k
    }

    /// Returns the mapping renamed to `name`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of keys in one repetition of the mapping. 0 means one key per scale degree.
    pub fn count(&self) -> usize {
        self.count
    }

    /// First MIDI note to be mapped.
    pub fn first_midi(&self) -> i32 {
        self.first_midi
    }

    /// Last MIDI note to be mapped.
    pub fn last_midi(&self) -> i32 {
        self.last_midi
    }

    /// MIDI note playing scale degree 0.
    pub fn middle_note(&self) -> i32 {
        self.middle_note
    }

    /// MIDI note whose frequency is fixed.
    pub fn reference_note(&self) -> i32 {
        self.reference_note
    }

    /// Frequency of the reference note in Hz.
    pub fn reference_frequency(&self) -> f64 {
        self.reference_frequency
    }

    /// Equal to `reference_frequency / MIDI_0_FREQ`.
    pub fn reference_pitch(&self) -> f64 {
        self.reference_pitch
    }

    /// Scale degrees spanned by one repetition of the mapping. 0 means the scale's own count.
    pub fn octave_degrees(&self) -> usize {
        self.octave_degrees
    }

    /// The key list, one entry per key of a repetition.
    pub fn keys(&self) -> &[MappedKey] {
        &self.keys
    }

    /// The text the mapping was parsed from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Origin of the mapping, usually a file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the mapping lays keys out like [`KeyboardMapping::new`], whatever its name and
    /// text.
    pub(crate) fn is_default_layout(&self) -> bool {
        let default = KeyboardMapping::new();
        self.count == default.count
            && self.first_midi == default.first_midi
            && self.last_midi == default.last_midi
            && self.middle_note == default.middle_note
            && self.reference_note == default.reference_note
            && self.reference_frequency == default.reference_frequency
            && self.octave_degrees == default.octave_degrees
            && self.keys.is_empty()
    }

    /// Reads and parses the KBM file at `path`. The mapping is named after the path.
    pub fn read_kbm_file<P>(path: P) -> Result<Self, FormatError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading keyboard mapping file");

        let content = fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(KeyboardMapping::parse_kbm_data(&content)?.with_name(path.to_string_lossy()))
    }

    /// Parses KBM data held in memory.
    ///
    /// After skipping comments (`!`) and blank lines, the file holds the map size, first and
    /// last MIDI note, middle note, reference note, reference frequency and octave degree,
    /// followed by one line per key: a scale degree, or `x` for an unmapped key. Lines after the
    /// last key are ignored.
    pub fn parse_kbm_data(kbm_contents: &str) -> Result<Self, FormatError> {
        let mut lines = kbm_contents
            .split('\n')
            .map(str::trim)
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('!'));

        let mut next_line = |expected: &'static str| {
            lines.next().ok_or(FormatError::Incomplete { expected })
        };

        let mut res = KeyboardMapping::new().with_name(PARSED_MAPPING_NAME);

        res.count = parse_header(next_line("map size")?, "map size")?;
        res.first_midi = parse_header(next_line("first MIDI note")?, "first MIDI note")?;
        res.last_midi = parse_header(next_line("last MIDI note")?, "last MIDI note")?;
        res.middle_note = parse_header(next_line("middle note")?, "middle note")?;
        res.reference_note = parse_header(next_line("reference note")?, "reference note")?;

        let (line, text) = next_line("reference frequency")?;
        res.reference_frequency = text.parse().map_err(|_| FormatError::InvalidNumber {
            line,
            field: "reference frequency",
            text: text.to_string(),
        })?;
        if !(res.reference_frequency > 0.0 && res.reference_frequency.is_finite()) {
            return Err(FormatError::InvalidFrequency {
                line,
                text: text.to_string(),
            });
        }
        res.reference_pitch = res.reference_frequency / MIDI_0_FREQ;

        res.octave_degrees =
            parse_header::<u32>(next_line("octave degree")?, "octave degree")? as usize;

        while res.keys.len() < res.count {
            let (line, text) = next_line("key list").map_err(|_| FormatError::MissingKeys {
                expected: res.count,
                found: res.keys.len(),
            })?;

            let key = match text {
                "x" | "X" | "-1" => MappedKey::Unmapped,
                degree => MappedKey::Degree(degree.parse().map_err(|_| {
                    FormatError::InvalidKey {
                        line,
                        text: text.to_string(),
                    }
                })?),
            };
            res.keys.push(key);
        }

        for (line, _) in lines {
            trace!(line, "ignoring trailing keyboard mapping line");
        }

        res.raw_text = kbm_contents.to_string();
        debug!(
            count = res.count,
            middle_note = res.middle_note,
            reference_note = res.reference_note,
            reference_frequency = res.reference_frequency,
            octave_degrees = res.octave_degrees,
            "parsed keyboard mapping"
        );
        Ok(res)
    }

    /// Creates a KeyboardMapping which keeps MIDI note 69 (A4) at the given frequency.
    pub fn tune_a69_to(freq: f64) -> Self {
        KeyboardMapping::tune_note_to(69, freq)
    }

    /// Creates a KeyboardMapping which keeps the given MIDI note at the given frequency.
    pub fn tune_note_to(midi_note: i32, freq: f64) -> Self {
        KeyboardMapping::start_scale_on_and_tune_note_to(60, midi_note, freq)
    }

    /// Generates a mapping where `scale_start` plays scale degree 0 and `midi_note` is tuned to
    /// `freq`. Every other setting is the default one-key-per-degree layout.
    pub fn start_scale_on_and_tune_note_to(scale_start: i32, midi_note: i32, freq: f64) -> Self {
        let raw_text = format!(
            "! Automatically generated mapping, tuning note {midi_note} to {freq} Hz
!
! Size of map
0
! First and last MIDI notes to map - map the entire keyboard
0
127
! Middle note where the first entry in the scale is mapped.
{scale_start}
! Reference note where frequency is fixed
{midi_note}
! Frequency for MIDI note {midi_note}
{freq}
! Scale degree for formal octave. This is an empty mapping, so:
0
! Mapping. This is an empty mapping so list no keys
"
        );

        KeyboardMapping {
            middle_note: scale_start,
            reference_note: midi_note,
            reference_frequency: freq,
            reference_pitch: freq / MIDI_0_FREQ,
            raw_text,
            ..KeyboardMapping::new()
        }
        .with_name(PARSED_MAPPING_NAME)
    }
}

fn parse_header<T: std::str::FromStr>(
    (line, text): (usize, &str),
    field: &'static str,
) -> Result<T, FormatError> {
    text.parse().map_err(|_| FormatError::InvalidInteger {
        line,
        field,
        text: text.to_string(),
    })
}

impl Display for KeyboardMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw_text)
    }
}
