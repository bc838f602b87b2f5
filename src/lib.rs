#![warn(missing_docs)]

//! Microtonal tuning: Scala file parsing and MIDI note frequency tables.
//!
//! This library parses SCL (scale) and KBM (keyboard mapping) files into [`Scale`] and
//! [`KeyboardMapping`], and combines the two into a [`Tuning`] that answers the frequency of any
//! MIDI note. Scales and mappings can also be generated for the common cases: equal divisions of
//! a span or of a cents amount, and 12-TET anchored on any note and frequency.
//!
//! ```
//! # use tunings::*;
//! let scale = Scale::parse_scl_data(
//!     "! just.scl
//! A just major scale
//! 7
//! 9/8
//! 5/4
//! 4/3
//! 3/2
//! 5/3
//! 15/8
//! 2/1
//! ",
//! )
//! .unwrap();
//! let mapping = KeyboardMapping::tune_note_to(60, 264.0);
//! let tuning =
//!     Tuning::from_scale_and_keyboard_mapping(scale, mapping, AllowTuningOnUnmapped(false))
//!         .unwrap();
//!
//! assert!((tuning.frequency_for_midi_note(64) - 396.0).abs() < 1e-9);
//! ```
//!
//! Everything is immutable once built, so all types can be shared freely between threads.
//! Logging goes through [`tracing`]; the library never installs a subscriber.

use std::path::Path;

mod error;
mod keyboard_mapping;
mod scale;
mod tone;
mod tuning;

pub use error::{Error, FormatError, TuningError};
pub use keyboard_mapping::{KeyboardMapping, MappedKey};
pub use scale::Scale;
pub use tone::{Tone, ToneValue};
pub use tuning::{AllowTuningOnUnmapped, Tuning};

/// Frequency of MIDI note 0. Equal to `440 * 2^(-69/12)`.
pub const MIDI_0_FREQ: f64 = 8.175_798_915_643_707;

/// Concert pitch A4 in Hz.
pub const A4_FREQ: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI_NOTE: i32 = 69;

/// Number of MIDI note numbers.
pub const MIDI_NOTE_COUNT: usize = 128;

/// Reads an SCL file and an optional KBM file and returns the frequency of every MIDI note.
///
/// Without a KBM file the default mapping is used.
pub fn scala_files_to_frequencies<P, Q>(
    scl_path: P,
    kbm_path: Option<Q>,
) -> Result<[f64; MIDI_NOTE_COUNT], Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let scale = Scale::read_scl_file(scl_path)?;
    let tuning = match kbm_path {
        Some(kbm_path) => Tuning::from_scale_and_keyboard_mapping(
            scale,
            KeyboardMapping::read_kbm_file(kbm_path)?,
            AllowTuningOnUnmapped(false),
        )?,
        None => Tuning::from_scale(scale)?,
    };

    Ok(std::array::from_fn(|note| {
        tuning.frequency_for_midi_note(note as i32)
    }))
}
