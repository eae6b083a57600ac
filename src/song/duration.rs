/// Ticks of a quarter note in the internal song timeline
pub const QUARTER_TIME: u32 = 960;

/// Canonical note values, keyed by their fraction denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DurationValue {
    Whole = 1,
    Half = 2,
    #[default]
    Quarter = 4,
    Eighth = 8,
    Sixteenth = 16,
    ThirtySecond = 32,
    SixtyFourth = 64,
}

impl DurationValue {
    pub const ALL: [Self; 7] = [
        Self::Whole,
        Self::Half,
        Self::Quarter,
        Self::Eighth,
        Self::Sixteenth,
        Self::ThirtySecond,
        Self::SixtyFourth,
    ];

    pub const fn from_denominator(denominator: i64) -> Option<Self> {
        match denominator {
            1 => Some(Self::Whole),
            2 => Some(Self::Half),
            4 => Some(Self::Quarter),
            8 => Some(Self::Eighth),
            16 => Some(Self::Sixteenth),
            32 => Some(Self::ThirtySecond),
            64 => Some(Self::SixtyFourth),
            _ => None,
        }
    }

    pub const fn denominator(self) -> u16 {
        self as u16
    }

    /// Guitar Pro stores a duration as a signed exponent:
    ///
    /// * *-2*: whole note
    /// * *-1*: half note
    /// * *0*: quarter note
    /// * *1*: eighth note
    /// * ... up to *4*: sixty-fourth note
    pub const fn gp_exponent(self) -> i8 {
        match self {
            Self::Whole => -2,
            Self::Half => -1,
            Self::Quarter => 0,
            Self::Eighth => 1,
            Self::Sixteenth => 2,
            Self::ThirtySecond => 3,
            Self::SixtyFourth => 4,
        }
    }

    pub const fn from_gp_exponent(exponent: i8) -> Option<Self> {
        match exponent {
            -2 => Some(Self::Whole),
            -1 => Some(Self::Half),
            0 => Some(Self::Quarter),
            1 => Some(Self::Eighth),
            2 => Some(Self::Sixteenth),
            3 => Some(Self::ThirtySecond),
            4 => Some(Self::SixtyFourth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    pub value: DurationValue,
    pub dotted: bool,
}

impl Duration {
    pub const fn new(value: DurationValue, dotted: bool) -> Self {
        Self { value, dotted }
    }

    /// Map a musical fraction to a duration.
    ///
    /// Total over all integers: unknown denominators become a quarter note and
    /// any numerator other than 1 marks the duration as dotted.
    pub fn from_fraction(numerator: i64, denominator: i64) -> Self {
        let value = DurationValue::from_denominator(denominator).unwrap_or_default();
        Self {
            value,
            dotted: numerator != 1,
        }
    }

    pub fn from_denominator(denominator: i64) -> Self {
        Self::from_fraction(1, denominator)
    }

    /// Length in ticks of `QUARTER_TIME` resolution.
    pub const fn time(&self) -> u32 {
        let mut time = QUARTER_TIME * 4 / self.value.denominator() as u32;
        if self.dotted {
            time += time / 2;
        }
        time
    }
}
