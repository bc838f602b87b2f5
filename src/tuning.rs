use tracing::{debug, warn};

use crate::{KeyboardMapping, MappedKey, Scale, TuningError, MIDI_0_FREQ};

/// Whether a [`Tuning`] may pin its reference frequency on a key the mapping leaves unmapped.
///
/// When allowed, the reference key gets the pitch interpolated between its nearest mapped
/// neighbours, and that pitch is pinned to the reference frequency.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowTuningOnUnmapped(pub bool);

/// The Tuning struct is the primary place where you will interact with this library.
///
/// It is constructed from a scale and mapping and then gives you the frequencies across and
/// beyond the MIDI keyboard. Since modulation can push key numbers well outside `[0, 127]`, the
/// table covers MIDI notes -256 to 255. Queries outside that range read the nearest edge.
///
/// A tuning is never modified after construction. To use a different [`Scale`] or
/// [`KeyboardMapping`], construct a new instance.
///
/// ```
/// # use tunings::*;
/// let s = Scale::even_temperament_12_note_scale(); // or any other function constructing a Scale
/// let k = KeyboardMapping::tune_a69_to(432.0); // or any other function constructing a KeyboardMapping
///
/// let t1 = Tuning::from_scale(s.clone()).unwrap();
/// let t2 = Tuning::from_keyboard_mapping(k.clone()).unwrap();
/// let t3 = Tuning::from_scale_and_keyboard_mapping(s, k, AllowTuningOnUnmapped(false)).unwrap();
/// assert!((t3.frequency_for_midi_note(69) - 432.0).abs() < 1e-9);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct Tuning {
    scale: Scale,
    keyboard_mapping: KeyboardMapping,
    allow_tuning_center_on_unmapped: bool,
    ptable: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(with = "log_table"))]
    lptable: Vec<f64>,
    scale_position_table: Vec<Option<usize>>,
}

/// Unmapped slots hold negative infinity, which JSON and friends cannot carry. They travel as
/// `None` instead.
#[cfg(feature = "serde")]
mod log_table {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(table: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        table
            .iter()
            .map(|&lp| lp.is_finite().then_some(lp))
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Ok(Vec::<Option<f64>>::deserialize(deserializer)?
            .into_iter()
            .map(|lp| lp.unwrap_or(f64::NEG_INFINITY))
            .collect())
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::new()
    }
}

/// Degree layout shared by every key of a tuning under construction.
struct Layout<'a> {
    mapping: &'a KeyboardMapping,
    /// Cents of degrees `1..=degrees`, the last one being the period.
    cents: Vec<f64>,
    /// Degrees per period of the scale.
    degrees: i64,
    /// Degrees moved by one repetition of the key list.
    shift: i64,
}

impl<'a> Layout<'a> {
    fn new(scale: &Scale, mapping: &'a KeyboardMapping) -> Result<Self, TuningError> {
        if mapping.keys().len() != mapping.count() {
            return Err(TuningError::KeyCountMismatch {
                declared: mapping.count(),
                actual: mapping.keys().len(),
            });
        }

        let cents: Vec<f64> = if !scale.tones().is_empty() {
            scale.tones().iter().map(|t| t.cents()).collect()
        } else if mapping.is_default_layout() {
            // An empty scale under the default mapping plays 12-TET.
            (1..=12).map(|i| 100.0 * f64::from(i)).collect()
        } else {
            return Err(TuningError::EmptyScale);
        };

        let degrees = cents.len() as i64;
        let shift = match mapping.octave_degrees() {
            0 => degrees,
            d => i64::try_from(d).unwrap_or(i64::MAX),
        };

        Ok(Layout {
            mapping,
            cents,
            degrees,
            shift,
        })
    }

    fn period(&self) -> f64 {
        self.cents[self.cents.len() - 1]
    }

    /// Scale degree played by `key`, counted from degree 0 at the middle note.
    fn degree_for_key(&self, key: i64) -> Option<i64> {
        let offset = key - i64::from(self.mapping.middle_note());
        let count = self.mapping.count() as i64;
        if count == 0 {
            return Some(offset);
        }

        let repetition = offset.div_euclid(count);
        match self.mapping.keys()[offset.rem_euclid(count) as usize] {
            MappedKey::Degree(degree) => Some(
                repetition
                    .saturating_mul(self.shift)
                    .saturating_add(i64::from(degree)),
            ),
            MappedKey::Unmapped => None,
        }
    }

    /// Cents above degree 0 and position within the period of `degree`.
    fn cents_for_degree(&self, degree: i64) -> (f64, usize) {
        let periods = degree.div_euclid(self.degrees);
        let position = degree.rem_euclid(self.degrees) as usize;
        let within = match position {
            0 => 0.0,
            p => self.cents[p - 1],
        };
        (periods as f64 * self.period() + within, position)
    }

    fn cents_for_key(&self, key: i64) -> Option<(f64, usize)> {
        self.degree_for_key(key).map(|d| self.cents_for_degree(d))
    }

    /// Cents of the reference key, interpolated from its nearest mapped neighbours if the key
    /// itself is unmapped.
    fn reference_cents(&self, allow_unmapped: bool) -> Result<f64, TuningError> {
        let reference = i64::from(self.mapping.reference_note());
        if let Some((cents, _)) = self.cents_for_key(reference) {
            return Ok(cents);
        }

        if !allow_unmapped {
            return Err(TuningError::UnmappedReference {
                note: self.mapping.reference_note(),
            });
        }

        // The key list repeats, so a mapped key exists within one repetition on both sides.
        let reach = self.mapping.count().max(1) as i64;
        let below = (1..=reach).find_map(|d| {
            self.cents_for_key(reference - d)
                .map(|(cents, _)| (reference - d, cents))
        });
        let above = (1..=reach).find_map(|d| {
            self.cents_for_key(reference + d)
                .map(|(cents, _)| (reference + d, cents))
        });

        match (below, above) {
            (Some((lo, lo_cents)), Some((hi, hi_cents))) => {
                let frac = (reference - lo) as f64 / (hi - lo) as f64;
                debug!(
                    note = reference,
                    lo, hi, "interpolating reference pitch of unmapped key"
                );
                Ok(lo_cents + frac * (hi_cents - lo_cents))
            }
            _ => Err(TuningError::NoMappedKeys),
        }
    }
}

impl Tuning {
    /// Number of table slots, covering MIDI notes `-256..256`.
    pub const N: usize = 512;

    const OFFSET: i32 = 256;

    /// Constructs a `Tuning` with the 12-EDO scale and the default mapping.
    ///
    /// ```
    /// # use tunings::*;
    /// let t = Tuning::new();
    /// assert!((t.frequency_for_midi_note(69) - 440.0).abs() < 1e-9); // A
    /// assert!((t.frequency_for_midi_note(60) - 261.6256).abs() < 1e-4); // middle C
    /// ```
    pub fn new() -> Self {
        Tuning::from_scale_and_keyboard_mapping(
            Scale::even_temperament_12_note_scale(),
            KeyboardMapping::new(),
            AllowTuningOnUnmapped(false),
        )
        .expect("12-EDO under the default mapping always resolves")
    }

    /// Constructs a `Tuning` with the given `scale` and the default mapping.
    pub fn from_scale(scale: Scale) -> Result<Self, TuningError> {
        Tuning::from_scale_and_keyboard_mapping(
            scale,
            KeyboardMapping::new(),
            AllowTuningOnUnmapped(false),
        )
    }

    /// Constructs a `Tuning` with the 12-EDO scale and the given `keyboard_mapping`.
    pub fn from_keyboard_mapping(keyboard_mapping: KeyboardMapping) -> Result<Self, TuningError> {
        Tuning::from_scale_and_keyboard_mapping(
            Scale::even_temperament_12_note_scale(),
            keyboard_mapping,
            AllowTuningOnUnmapped(false),
        )
    }

    /// Constructs a `Tuning` with the given `scale` and `keyboard_mapping`.
    ///
    /// Every key resolves to a scale degree through the mapping, and from there to cents
    /// through the scale, wrapping at the scale's period. The table is then shifted so that
    /// the reference note sounds at the reference frequency.
    ///
    /// Fails if the reference note is unmapped (unless allowed), if the mapping's key list
    /// disagrees with its size, or if an empty scale meets anything but the default mapping.
    pub fn from_scale_and_keyboard_mapping(
        scale: Scale,
        keyboard_mapping: KeyboardMapping,
        allow_tuning_center_on_unmapped: AllowTuningOnUnmapped,
    ) -> Result<Self, TuningError> {
        let frequency = keyboard_mapping.reference_frequency();
        if !(frequency > 0.0 && frequency.is_finite()) {
            return Err(TuningError::InvalidReferenceFrequency { frequency });
        }

        let layout = Layout::new(&scale, &keyboard_mapping)?;
        if layout.period() <= 0.0 {
            warn!(
                period = layout.period(),
                scale = scale.name(),
                "scale period is not above unison"
            );
        }

        let reference_cents = layout.reference_cents(allow_tuning_center_on_unmapped.0)?;
        let pitch_mod = keyboard_mapping.reference_pitch().log2();

        let mut ptable = vec![0.0; Tuning::N];
        let mut lptable = vec![f64::NEG_INFINITY; Tuning::N];
        let mut scale_position_table = vec![None; Tuning::N];

        for i in 0..Tuning::N {
            let key = i as i64 - i64::from(Tuning::OFFSET);
            if let Some((cents, position)) = layout.cents_for_key(key) {
                lptable[i] = pitch_mod + (cents - reference_cents) / 1200.0;
                ptable[i] = 2f64.powf(lptable[i]);
                scale_position_table[i] = Some(position);
            }
        }

        debug!(
            scale = scale.name(),
            mapping = keyboard_mapping.name(),
            degrees = layout.degrees,
            period = layout.period(),
            "built tuning table"
        );

        Ok(Tuning {
            scale,
            keyboard_mapping,
            allow_tuning_center_on_unmapped: allow_tuning_center_on_unmapped.0,
            ptable,
            lptable,
            scale_position_table,
        })
    }

    /// Returns a new tuning where every unmapped key gets a pitch interpolated linearly in log
    /// frequency between its nearest mapped neighbours. Keys with a mapped neighbour on one
    /// side only continue from it in 12-TET semitones. The keys still report as unmapped.
    pub fn with_skipped_notes_interpolated(&self) -> Self {
        let mut res = self.clone();
        let mapped = |i: usize| self.scale_position_table[i].is_some();

        for i in 0..Tuning::N {
            if mapped(i) {
                continue;
            }

            let prv = (0..i).rev().find(|&j| mapped(j));
            let nxt = (i + 1..Tuning::N).find(|&j| mapped(j));

            res.lptable[i] = match (prv, nxt) {
                (Some(prv), Some(nxt)) => {
                    let frac = (i - prv) as f64 / (nxt - prv) as f64;
                    (1.0 - frac) * self.lptable[prv] + frac * self.lptable[nxt]
                }
                (Some(prv), None) => self.lptable[prv] + (i - prv) as f64 / 12.0,
                (None, Some(nxt)) => self.lptable[nxt] - (nxt - i) as f64 / 12.0,
                (None, None) => continue,
            };
            res.ptable[i] = 2f64.powf(res.lptable[i]);
        }

        res
    }

    /// The scale this tuning was built from.
    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// The keyboard mapping this tuning was built from.
    pub fn keyboard_mapping(&self) -> &KeyboardMapping {
        &self.keyboard_mapping
    }

    /// Whether the tuning was allowed to anchor on an unmapped key.
    pub fn allow_tuning_center_on_unmapped(&self) -> bool {
        self.allow_tuning_center_on_unmapped
    }

    fn slot(midi_note: i32) -> usize {
        midi_note
            .saturating_add(Tuning::OFFSET)
            .clamp(0, Tuning::N as i32 - 1) as usize
    }

    /// Returns the frequency in Hz for a given MIDI note, or 0 for an unmapped note.
    /// ```
    /// # use tunings::*;
    /// let t = Tuning::new();
    /// assert!((t.frequency_for_midi_note(69) - 440.0).abs() < 1e-9);
    /// ```
    pub fn frequency_for_midi_note(&self, midi_note: i32) -> f64 {
        self.ptable[Tuning::slot(midi_note)] * MIDI_0_FREQ
    }

    /// Returns the frequency with the standard frequency of MIDI note 0 divided out.
    /// ```
    /// # use tunings::*;
    /// let t = Tuning::new();
    /// assert_eq!(t.frequency_for_midi_note_scaled_by_midi0(0), 1.0);
    /// assert_eq!(t.frequency_for_midi_note_scaled_by_midi0(60), 32.0);
    /// ```
    pub fn frequency_for_midi_note_scaled_by_midi0(&self, midi_note: i32) -> f64 {
        self.ptable[Tuning::slot(midi_note)]
    }

    /// Returns the log base 2 of the scaled frequency. The value increases by one per doubling
    /// of frequency.
    /// ```
    /// # use tunings::*;
    /// let t = Tuning::new();
    /// assert_eq!(t.log_scaled_frequency_for_midi_note(0), 0.0);
    /// assert_eq!(t.log_scaled_frequency_for_midi_note(60), 5.0);
    /// ```
    pub fn log_scaled_frequency_for_midi_note(&self, midi_note: i32) -> f64 {
        self.lptable[Tuning::slot(midi_note)]
    }

    /// Distance from 12-TET (MIDI note 0 at [`MIDI_0_FREQ`]) in semitones.
    pub fn retuning_from_equal_in_semitones_for_midi_note(&self, midi_note: i32) -> f64 {
        let equal = Tuning::slot(midi_note) as f64 - f64::from(Tuning::OFFSET);
        self.log_scaled_frequency_for_midi_note(midi_note) * 12.0 - equal
    }

    /// Distance from 12-TET in cents.
    pub fn retuning_from_equal_in_cents_for_midi_note(&self, midi_note: i32) -> f64 {
        self.retuning_from_equal_in_semitones_for_midi_note(midi_note) * 100.0
    }

    /// Returns the position in the scale period played by the note, 0 being the root, or
    /// `None` if the note is unmapped. SCL files omit the root, so position `p > 0` is
    /// `scale().tones()[p - 1]`.
    pub fn scale_position_for_midi_note(&self, midi_note: i32) -> Option<usize> {
        self.scale_position_table[Tuning::slot(midi_note)]
    }

    /// Returns whether the note plays a scale degree under the keyboard mapping.
    pub fn is_midi_note_mapped(&self, midi_note: i32) -> bool {
        self.scale_position_table[Tuning::slot(midi_note)].is_some()
    }
}
