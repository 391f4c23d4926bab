use std::path::Path;

use crate::error::MigrationError;

use super::space::free_space_of;

/// Running byte quota for one run. Single writer; consulted before every copy.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    budget: u64,
    used: u64,
}

impl QuotaLedger {
    /// Budget = min(free - safety_margin, hard_cap). A non-positive budget is a
    /// precondition failure.
    pub fn from_free_space(
        free_bytes: u64,
        safety_margin_bytes: u64,
        hard_cap_bytes: u64,
    ) -> Result<Self, MigrationError> {
        let budget = free_bytes
            .checked_sub(safety_margin_bytes)
            .map(|b| b.min(hard_cap_bytes))
            .unwrap_or(0);
        if budget == 0 {
            return Err(MigrationError::InsufficientSpace {
                free: free_bytes,
                safety_margin: safety_margin_bytes,
            });
        }
        Ok(Self { budget, used: 0 })
    }

    /// Query the destination's free space once and derive the budget from it.
    pub fn for_destination(
        destination: &Path,
        safety_margin_bytes: u64,
        hard_cap_bytes: u64,
    ) -> Result<Self, MigrationError> {
        let free = free_space_of(destination).map_err(|source| {
            MigrationError::DestinationUnreachable {
                path: destination.to_path_buf(),
                source,
            }
        })?;
        Self::from_free_space(free, safety_margin_bytes, hard_cap_bytes)
    }

    /// Strict: `used + candidate == budget` is refused.
    pub fn can_admit(&self, candidate_bytes: u64) -> bool {
        match self.used.checked_add(candidate_bytes) {
            Some(total) => total < self.budget,
            None => false,
        }
    }

    /// Charge an admitted copy. Callers check `can_admit` first.
    pub fn admit(&mut self, candidate_bytes: u64) {
        self.used = self.used.saturating_add(candidate_bytes);
        debug_assert!(self.used <= self.budget, "ledger overrun");
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.budget
    }

    pub fn progress_fraction(&self) -> f64 {
        (self.used as f64 / self.budget as f64).clamp(0.0, 1.0)
    }
}
