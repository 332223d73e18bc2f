//! Two-state RED/GREEN controller that delimits violation windows.
//!
//! A window opens on every actual phase change. Re-asserting the current
//! phase is a no-op: it neither opens a window nor clears any violator.

use crate::{error::StateError, types::SignalPhase};
use tracing::debug;

/// Result of a phase request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseTransition {
    /// Requested phase equals the current one
    Unchanged,
    /// Phase switched; the caller must open a new violation window
    Changed { from: SignalPhase, to: SignalPhase },
}

impl PhaseTransition {
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

#[derive(Clone, Debug)]
pub struct SignalPhaseController {
    phase: SignalPhase,
    /// Ordinal of the current violation window (starts at 0)
    window: u64,
}

impl Default for SignalPhaseController {
    fn default() -> Self {
        Self::new(SignalPhase::default())
    }
}

impl SignalPhaseController {
    pub fn new(initial: SignalPhase) -> Self {
        Self {
            phase: initial,
            window: 0,
        }
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn set_phase(&mut self, new_phase: SignalPhase) -> PhaseTransition {
        if new_phase == self.phase {
            return PhaseTransition::Unchanged;
        }
        let from = self.phase;
        self.phase = new_phase;
        self.window += 1;
        debug!(%from, to = %new_phase, window = self.window, "signal phase changed");
        PhaseTransition::Changed {
            from,
            to: new_phase,
        }
    }

    /// Parse and apply a textual phase (`RED`, `GREEN`, `r`, `g`).
    pub fn set_phase_str(&mut self, raw: &str) -> Result<PhaseTransition, StateError> {
        let phase: SignalPhase = raw.parse()?;
        Ok(self.set_phase(phase))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
