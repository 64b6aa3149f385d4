/// Remaining lifetime of an effect, counted in turns.
///
/// Persisted as a plain integer where `-1` means permanent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "i32", into = "i32"))]
pub enum EffectDuration {
    Permanent,
    Turns(u32),
}

impl EffectDuration {
    pub const PERMANENT_SENTINEL: i32 = -1;

    /// Interprets a raw turn count. Other negative values are already spent.
    pub const fn from_turns(turns: i32) -> Self {
        if turns == Self::PERMANENT_SENTINEL {
            Self::Permanent
        } else if turns <= 0 {
            Self::Turns(0)
        } else {
            Self::Turns(turns as u32)
        }
    }

    pub const fn as_turns(self) -> i32 {
        match self {
            Self::Permanent => Self::PERMANENT_SENTINEL,
            Self::Turns(n) if n > i32::MAX as u32 => i32::MAX,
            Self::Turns(n) => n as i32,
        }
    }

    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }

    /// Consumes one turn. Returns true once the duration has run out.
    pub fn advance(&mut self) -> bool {
        match self {
            Self::Permanent => false,
            Self::Turns(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
        }
    }
}

impl From<i32> for EffectDuration {
    fn from(turns: i32) -> Self {
        Self::from_turns(turns)
    }
}

impl From<EffectDuration> for i32 {
    fn from(duration: EffectDuration) -> Self {
        duration.as_turns()
    }
}
