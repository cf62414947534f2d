use serde::{Deserialize, Serialize};

/// Job priority levels for queue ordering. Lower numeric value sorts first —
/// this matches the `priority: i32` convention used on the domain `Job`
/// record, where the smallest value is scheduled soonest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobPriority {
    /// Critical priority jobs (processed immediately)
    Critical = 1,

    /// High priority jobs (processed first)
    High = 2,

    /// Normal priority jobs (default)
    Normal = 3,

    /// Low priority jobs (processed last)
    Low = 4,
}

// FIFO ordering within the same priority: jobs.sort_by_key(|r| (r.message.priority, r.created_at))
// - Lower priority value first: Critical < High < Normal < Low
// - Within the same priority: older jobs first (created_at ascending)

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl JobPriority {
    /// Get all priority levels in order (most urgent to least urgent)
    pub fn all() -> &'static [JobPriority] {
        &[Self::Critical, Self::High, Self::Normal, Self::Low]
    }

    /// Get the numeric value for ordering (smaller sorts sooner)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create from numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Critical),
            2 => Some(Self::High),
            3 => Some(Self::Normal),
            4 => Some(Self::Low),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for JobPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for JobPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}
