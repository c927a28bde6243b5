//! Stretcher mode and quality flags.
//!
//! [`StretchOptions`] is a bitmask split into groups (process mode,
//! transients, window, formant, ...). Every group has a zero-valued default
//! member, so only the non-default members are real bits; the defaults are
//! associated constants equal to the empty set.
//!
//! Bit values follow the layout used by common real-time stretch engines so
//! that a raw mask coming from elsewhere can be checked with
//! [`StretchOptions::from_raw`].

use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

bitflags! {
    /// Engine mode and quality flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct StretchOptions: u32 {
        const PROCESS_REALTIME       = 0x0000_0001;
        const STRETCH_PRECISE        = 0x0000_0010;
        const TRANSIENTS_MIXED       = 0x0000_0100;
        const TRANSIENTS_SMOOTH      = 0x0000_0200;
        const DETECTOR_PERCUSSIVE    = 0x0000_0400;
        const DETECTOR_SOFT          = 0x0000_0800;
        const PHASE_INDEPENDENT      = 0x0000_2000;
        const THREADING_NEVER        = 0x0001_0000;
        const THREADING_ALWAYS       = 0x0002_0000;
        const WINDOW_SHORT           = 0x0010_0000;
        const WINDOW_LONG            = 0x0020_0000;
        const SMOOTHING_ON           = 0x0080_0000;
        const FORMANT_PRESERVED      = 0x0100_0000;
        const PITCH_HIGH_QUALITY     = 0x0200_0000;
        const PITCH_HIGH_CONSISTENCY = 0x0400_0000;
        const CHANNELS_TOGETHER      = 0x1000_0000;
        const ENGINE_FINER           = 0x2000_0000;
    }
}

/// Pairs of bits that select different members of the same group.
const EXCLUSIVE: &[(StretchOptions, StretchOptions)] = &[
    (
        StretchOptions::TRANSIENTS_MIXED,
        StretchOptions::TRANSIENTS_SMOOTH,
    ),
    (
        StretchOptions::DETECTOR_PERCUSSIVE,
        StretchOptions::DETECTOR_SOFT,
    ),
    (
        StretchOptions::THREADING_NEVER,
        StretchOptions::THREADING_ALWAYS,
    ),
    (StretchOptions::WINDOW_SHORT, StretchOptions::WINDOW_LONG),
    (
        StretchOptions::PITCH_HIGH_QUALITY,
        StretchOptions::PITCH_HIGH_CONSISTENCY,
    ),
];

impl StretchOptions {
    pub const PROCESS_OFFLINE: Self = Self::empty();
    pub const STRETCH_ELASTIC: Self = Self::empty();
    pub const TRANSIENTS_CRISP: Self = Self::empty();
    pub const DETECTOR_COMPOUND: Self = Self::empty();
    pub const PHASE_LAMINAR: Self = Self::empty();
    pub const THREADING_AUTO: Self = Self::empty();
    pub const WINDOW_STANDARD: Self = Self::empty();
    pub const SMOOTHING_OFF: Self = Self::empty();
    pub const FORMANT_SHIFTED: Self = Self::empty();
    pub const PITCH_HIGH_SPEED: Self = Self::empty();
    pub const CHANNELS_APART: Self = Self::empty();
    pub const ENGINE_FASTER: Self = Self::empty();

    /// Preset: every group at its default member.
    pub const DEFAULT: Self = Self::empty();
    /// Preset tuned for percussive material.
    pub const PERCUSSIVE: Self =
        Self::WINDOW_SHORT.union(Self::PHASE_INDEPENDENT);

    /// Check a raw mask: unknown bits and conflicting group members are rejected.
    pub fn from_raw(bits: u32) -> Result<Self> {
        let options = Self::from_bits(bits).ok_or_else(|| {
            Error::InvalidOptions(format!(
                "unknown option bits {:#010x}",
                bits & !Self::all().bits()
            ))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Reject masks that select two members of the same group.
    pub fn validate(&self) -> Result<()> {
        for &(a, b) in EXCLUSIVE {
            if self.contains(a | b) {
                return Err(Error::InvalidOptions(format!(
                    "{} and {} are mutually exclusive",
                    flag_name(a),
                    flag_name(b)
                )));
            }
        }
        Ok(())
    }

    /// Option by its CamelCase name, e.g. `"ProcessRealTime"` or `"Percussive"`.
    pub fn from_option_name(name: &str) -> Result<Self> {
        NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flags)| *flags)
            .ok_or_else(|| Error::InvalidOptions(format!("unknown option name '{name}'")))
    }

    pub fn is_realtime(&self) -> bool {
        self.contains(Self::PROCESS_REALTIME)
    }

    /// Selected member of an option group.
    pub fn group<G: OptionGroup>(&self) -> G {
        G::from_options(*self)
    }

    /// Replace the member of an option group.
    pub fn with_group<G: OptionGroup>(self, member: G) -> Self {
        (self - G::MASK) | member.flags()
    }
}

/// Names accepted by [`StretchOptions::from_option_name`].
const NAMES: &[(&str, StretchOptions)] = &[
    ("ProcessOffline", StretchOptions::PROCESS_OFFLINE),
    ("ProcessRealTime", StretchOptions::PROCESS_REALTIME),
    ("StretchElastic", StretchOptions::STRETCH_ELASTIC),
    ("StretchPrecise", StretchOptions::STRETCH_PRECISE),
    ("TransientsCrisp", StretchOptions::TRANSIENTS_CRISP),
    ("TransientsMixed", StretchOptions::TRANSIENTS_MIXED),
    ("TransientsSmooth", StretchOptions::TRANSIENTS_SMOOTH),
    ("DetectorCompound", StretchOptions::DETECTOR_COMPOUND),
    ("DetectorPercussive", StretchOptions::DETECTOR_PERCUSSIVE),
    ("DetectorSoft", StretchOptions::DETECTOR_SOFT),
    ("PhaseLaminar", StretchOptions::PHASE_LAMINAR),
    ("PhaseIndependent", StretchOptions::PHASE_INDEPENDENT),
    ("ThreadingAuto", StretchOptions::THREADING_AUTO),
    ("ThreadingNever", StretchOptions::THREADING_NEVER),
    ("ThreadingAlways", StretchOptions::THREADING_ALWAYS),
    ("WindowStandard", StretchOptions::WINDOW_STANDARD),
    ("WindowShort", StretchOptions::WINDOW_SHORT),
    ("WindowLong", StretchOptions::WINDOW_LONG),
    ("SmoothingOff", StretchOptions::SMOOTHING_OFF),
    ("SmoothingOn", StretchOptions::SMOOTHING_ON),
    ("FormantShifted", StretchOptions::FORMANT_SHIFTED),
    ("FormantPreserved", StretchOptions::FORMANT_PRESERVED),
    ("PitchHighSpeed", StretchOptions::PITCH_HIGH_SPEED),
    ("PitchHighQuality", StretchOptions::PITCH_HIGH_QUALITY),
    ("PitchHighConsistency", StretchOptions::PITCH_HIGH_CONSISTENCY),
    ("ChannelsApart", StretchOptions::CHANNELS_APART),
    ("ChannelsTogether", StretchOptions::CHANNELS_TOGETHER),
    ("EngineFaster", StretchOptions::ENGINE_FASTER),
    ("EngineFiner", StretchOptions::ENGINE_FINER),
    ("Default", StretchOptions::DEFAULT),
    ("Percussive", StretchOptions::PERCUSSIVE),
];

fn flag_name(flag: StretchOptions) -> &'static str {
    NAMES
        .iter()
        .find(|(_, f)| *f == flag && !f.is_empty())
        .map(|(n, _)| *n)
        .unwrap_or("?")
}

/// Parses `"ProcessRealTime | EngineFiner"` style lists.
impl FromStr for StretchOptions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut options = Self::empty();
        for name in s.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            options |= Self::from_option_name(name)?;
        }
        options.validate()?;
        Ok(options)
    }
}

impl fmt::Display for StretchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Default");
        }
        let mut first = true;
        for (_, flag) in self.iter_names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(flag_name(flag))?;
            first = false;
        }
        Ok(())
    }
}

/// A group of mutually exclusive options sharing a mask.
pub trait OptionGroup: Sized + Copy {
    /// All bits used by the group.
    const MASK: StretchOptions;

    fn flags(self) -> StretchOptions;

    fn from_options(options: StretchOptions) -> Self;
}

macro_rules! option_group {
    (
        $(#[$meta:meta])*
        $name:ident { default $default:ident, $($member:ident => $flag:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            $default,
            $($member),+
        }

        impl OptionGroup for $name {
            const MASK: StretchOptions = StretchOptions::empty()
                $(.union(StretchOptions::$flag))+;

            fn flags(self) -> StretchOptions {
                match self {
                    $name::$default => StretchOptions::empty(),
                    $($name::$member => StretchOptions::$flag),+
                }
            }

            fn from_options(options: StretchOptions) -> Self {
                $(
                    if options.contains(StretchOptions::$flag) {
                        return $name::$member;
                    }
                )+
                $name::$default
            }
        }
    };
}

option_group! {
    /// Transient handling. Adjustable at runtime in real-time mode only.
    TransientsOption { default Crisp, Mixed => TRANSIENTS_MIXED, Smooth => TRANSIENTS_SMOOTH }
}

option_group! {
    /// Onset detector. Adjustable at runtime in real-time mode only.
    DetectorOption { default Compound, Percussive => DETECTOR_PERCUSSIVE, Soft => DETECTOR_SOFT }
}

option_group! {
    /// Phase continuity across bins.
    PhaseOption { default Laminar, Independent => PHASE_INDEPENDENT }
}

option_group! {
    /// Analysis window length.
    WindowOption { default Standard, Short => WINDOW_SHORT, Long => WINDOW_LONG }
}

option_group! {
    /// Formant handling when pitch shifting.
    FormantOption { default Shifted, Preserved => FORMANT_PRESERVED }
}

option_group! {
    /// Pitch-shift quality. Adjustable at runtime in real-time mode only.
    PitchOption {
        default HighSpeed,
        HighQuality => PITCH_HIGH_QUALITY,
        HighConsistency => PITCH_HIGH_CONSISTENCY,
    }
}

option_group! {
    /// Engine generation.
    EngineOption { default Faster, Finer => ENGINE_FINER }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert_eq!(StretchOptions::DEFAULT, StretchOptions::empty());
        assert_eq!(StretchOptions::default(), StretchOptions::DEFAULT);
        assert!(!StretchOptions::DEFAULT.is_realtime());
    }

    #[test]
    fn test_from_raw_rejects_unknown_bits() {
        let err = StretchOptions::from_raw(0x8000_0000).unwrap_err();
        assert!(err.is_range_error());

        let ok = StretchOptions::from_raw(0x2000_0001).unwrap();
        assert_eq!(
            ok,
            StretchOptions::PROCESS_REALTIME | StretchOptions::ENGINE_FINER
        );
    }

    #[test]
    fn test_exclusive_members_rejected() {
        let bad = StretchOptions::WINDOW_SHORT | StretchOptions::WINDOW_LONG;
        assert!(matches!(bad.validate(), Err(Error::InvalidOptions(_))));
        assert!(StretchOptions::from_raw(bad.bits()).is_err());
    }

    #[test]
    fn test_groups() {
        let options = StretchOptions::PERCUSSIVE;
        assert_eq!(options.group::<WindowOption>(), WindowOption::Short);
        assert_eq!(options.group::<PhaseOption>(), PhaseOption::Independent);
        assert_eq!(options.group::<FormantOption>(), FormantOption::Shifted);

        let changed = options.with_group(WindowOption::Long);
        assert_eq!(changed.group::<WindowOption>(), WindowOption::Long);
        assert!(!changed.contains(StretchOptions::WINDOW_SHORT));
        assert!(changed.contains(StretchOptions::PHASE_INDEPENDENT));

        let reset = changed.with_group(WindowOption::Standard);
        assert_eq!(reset, StretchOptions::PHASE_INDEPENDENT);
    }

    #[test]
    fn test_parse_names() {
        let parsed: StretchOptions = "ProcessRealTime | EngineFiner".parse().unwrap();
        assert_eq!(
            parsed,
            StretchOptions::PROCESS_REALTIME | StretchOptions::ENGINE_FINER
        );
        assert_eq!(
            StretchOptions::from_option_name("Percussive").unwrap(),
            StretchOptions::PERCUSSIVE
        );
        assert!("WindowShort|WindowLong".parse::<StretchOptions>().is_err());
        assert!(StretchOptions::from_option_name("Option.PRESET_DEFAULT").is_err());

        // bitflags' own lookup uses the constant names
        assert_eq!(
            StretchOptions::from_name("PROCESS_REALTIME"),
            Some(StretchOptions::PROCESS_REALTIME)
        );
        assert_eq!(StretchOptions::from_name("ProcessRealTime"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(StretchOptions::DEFAULT.to_string(), "Default");
        assert_eq!(
            (StretchOptions::PROCESS_REALTIME | StretchOptions::ENGINE_FINER).to_string(),
            "ProcessRealTime | EngineFiner"
        );
    }
}
