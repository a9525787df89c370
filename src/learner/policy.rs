//! Scheduling and grammar-promotion heuristics, kept swappable.

/// Decides on which learning rounds tasks are built and the oracle is called.
pub trait Schedule {
    fn is_due(&self, round: u64) -> bool;
}

/// Due on every `n`th round (rounds are counted from 1).
#[derive(Clone, Copy, Debug)]
pub struct EveryNth(pub u64);

impl Schedule for EveryNth {
    fn is_due(&self, round: u64) -> bool {
        self.0 != 0 && round % self.0 == 0
    }
}

/// Due on every round.
#[derive(Clone, Copy, Debug)]
pub struct Always;

impl Schedule for Always {
    fn is_due(&self, _round: u64) -> bool {
        true
    }
}

/// Decides whether a solved symbol's program may become a grammar component.
pub trait PromotionGuard {
    fn permits(&self, description: &str) -> bool;
}

/// Rejects descriptions containing any of the markers. With the default markers
/// this keeps out programs built on invented components (`#`) and on raw
/// arithmetic, which slow enumeration down the most.
#[derive(Clone, Debug)]
pub struct ForbiddenMarkers(pub Vec<String>);

impl Default for ForbiddenMarkers {
    fn default() -> Self {
        Self(vec!["#".into(), "+".into(), "-".into()])
    }
}

impl PromotionGuard for ForbiddenMarkers {
    fn permits(&self, description: &str) -> bool {
        !self.0.iter().any(|m| description.contains(m.as_str()))
    }
}

/// Permits everything.
#[derive(Clone, Copy, Debug)]
pub struct PermitAll;

impl PromotionGuard for PermitAll {
    fn permits(&self, _description: &str) -> bool {
        true
    }
}
