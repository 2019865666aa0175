//! Hook stages: the five priority bands that order module calls.

use std::fmt;
use std::str::FromStr;

use crate::pipeline::error::PipelineError;

/// Priority band a module is hooked into.
///
/// Declaration order is call order: every `ReallyFirst` module runs before
/// any `First` module, and so on up to `ReallyLast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    /// Called before anything else.
    ReallyFirst,
    /// Called early.
    First,
    /// For modules that do not care when they run.
    #[default]
    Middle,
    /// Called late.
    Last,
    /// Called after everything else.
    ReallyLast,
}

impl Stage {
    /// Number of stages.
    pub const COUNT: usize = 5;

    /// All stages in dispatch order.
    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::ReallyFirst,
        Stage::First,
        Stage::Middle,
        Stage::Last,
        Stage::ReallyLast,
    ];

    /// Position of this stage in dispatch order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stage for a dispatch-order position, if it exists.
    pub fn from_index(index: usize) -> Option<Stage> {
        Stage::ALL.get(index).copied()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::ReallyFirst => "really_first",
            Stage::First => "first",
            Stage::Middle => "middle",
            Stage::Last => "last",
            Stage::ReallyLast => "really_last",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    /// Accepts names (`really_first`, `REALLY-FIRST`, `Middle`) and ordinals (`0`..`4`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(index) = normalized.parse::<usize>() {
            return Stage::from_index(index).ok_or_else(|| PipelineError::InvalidStage(s.to_string()));
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| PipelineError::InvalidStage(s.to_string()))
    }
}

impl TryFrom<&str> for Stage {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<usize> for Stage {
    type Error = PipelineError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Stage::from_index(value).ok_or_else(|| PipelineError::InvalidStage(value.to_string()))
    }
}

impl TryFrom<u8> for Stage {
    type Error = PipelineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Stage::try_from(usize::from(value))
    }
}

impl TryFrom<i32> for Stage {
    type Error = PipelineError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(Stage::from_index)
            .ok_or_else(|| PipelineError::InvalidStage(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_matches_declaration() {
        assert!(Stage::ReallyFirst < Stage::First);
        assert!(Stage::First < Stage::Middle);
        assert!(Stage::Middle < Stage::Last);
        assert!(Stage::Last < Stage::ReallyLast);

        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn default_is_middle() {
        assert_eq!(Stage::default(), Stage::Middle);
    }

    #[test]
    fn parse_names() {
        assert_eq!("really_first".parse::<Stage>().unwrap(), Stage::ReallyFirst);
        assert_eq!("REALLY-LAST".parse::<Stage>().unwrap(), Stage::ReallyLast);
        assert_eq!(" Middle ".parse::<Stage>().unwrap(), Stage::Middle);
        assert_eq!("3".parse::<Stage>().unwrap(), Stage::Last);
        assert!("sometime".parse::<Stage>().is_err());
        assert!("99".parse::<Stage>().is_err());
    }

    #[test]
    fn ordinals_out_of_range_are_rejected() {
        assert_eq!(Stage::try_from(1u8).unwrap(), Stage::First);
        assert_eq!(Stage::try_from(4i32).unwrap(), Stage::ReallyLast);
        assert!(matches!(Stage::try_from(5u8), Err(PipelineError::InvalidStage(_))));
        assert!(matches!(Stage::try_from(99i32), Err(PipelineError::InvalidStage(_))));
        assert!(matches!(Stage::try_from(-1i32), Err(PipelineError::InvalidStage(_))));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
    }
}
