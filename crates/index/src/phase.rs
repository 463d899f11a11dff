use serde::Serialize;

/// Build state machine. Phases only move forward; a failure ends the build
/// wherever it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildPhase {
    Idle,
    Building,
    BuildJoined,
    MasterSynthesis,
    Compressing,
    Sorting,
    SortJoined,
    Linking,
    Done,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Building => "Building",
            Self::BuildJoined => "BuildJoined",
            Self::MasterSynthesis => "MasterSynthesis",
            Self::Compressing => "Compressing",
            Self::Sorting => "Sorting",
            Self::SortJoined => "SortJoined",
            Self::Linking => "Linking",
            Self::Done => "Done",
        }
    }

    fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Building => 1,
            Self::BuildJoined => 2,
            Self::MasterSynthesis => 3,
            Self::Compressing => 4,
            Self::Sorting => 5,
            Self::SortJoined => 6,
            Self::Linking => 7,
            Self::Done => 8,
        }
    }

    /// The phase that follows this one.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Building),
            Self::Building => Some(Self::BuildJoined),
            Self::BuildJoined => Some(Self::MasterSynthesis),
            Self::MasterSynthesis => Some(Self::Compressing),
            Self::Compressing => Some(Self::Sorting),
            Self::Sorting => Some(Self::SortJoined),
            Self::SortJoined => Some(Self::Linking),
            Self::Linking => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Check if the current phase is at least the given one.
    pub fn is_at_least(&self, min: BuildPhase) -> bool {
        self.ordinal() >= min.ordinal()
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_order() {
        let mut phase = BuildPhase::Idle;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            assert!(next.is_at_least(phase));
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen.len(), 9);
        assert!(phase.is_done());
        assert!(BuildPhase::Sorting.is_at_least(BuildPhase::Compressing));
        assert!(!BuildPhase::BuildJoined.is_at_least(BuildPhase::MasterSynthesis));
    }
}
