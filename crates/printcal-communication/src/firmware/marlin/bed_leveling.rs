//! Bed-leveling completion detection
//!
//! Marlin gives no explicit acknowledgment when a UBL probing run has been
//! saved and loaded; completion is inferred from its log output.
//!
//! | State                | Line contains                             | Next state                          |
//! |----------------------|-------------------------------------------|-------------------------------------|
//! | `Idle`               | anything                                  | `Idle` (no session)                 |
//! | `AwaitingProgress`   | "Probing mesh point" / "Mesh invalidated" | `AwaitingSaveOrLoad`                |
//! | `AwaitingProgress`   | "Mesh saved" / "Mesh loaded from slot"    | `AwaitingProgress` (stale output)   |
//! | `AwaitingSaveOrLoad` | "Mesh saved"                              | sets `saved`                        |
//! | `AwaitingSaveOrLoad` | "Mesh loaded from slot"                   | sets `loaded`                       |
//! | `AwaitingSaveOrLoad` | after the above: `saved` and (`loaded` or "Done.") | `Complete`                 |
//! | non-terminal         | watchdog expiry                           | `TimedOut`                          |
//!
//! Matching is case-insensitive containment on the trimmed line. Lines
//! starting with `T:` or `B:` are temperature chatter and never inspected.

const PROGRESS_MARKERS: [&str; 2] = ["probing mesh point", "mesh invalidated"];
const SAVED_MARKER: &str = "mesh saved";
const LOADED_MARKER: &str = "mesh loaded from slot";
const DONE_MARKER: &str = "done.";
const STATUS_MARKERS: [&str; 5] = [
    "probing mesh point",
    "mesh invalidated",
    "mesh saved",
    "mesh loaded",
    "leveling",
];

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelingState {
    /// No session is open; lines are ignored.
    #[default]
    Idle,
    /// Session open, no probing output seen yet.
    AwaitingProgress,
    /// Probing seen; waiting for the mesh to be saved and loaded.
    AwaitingSaveOrLoad {
        /// "Mesh saved" was seen after probing started.
        saved: bool,
        /// "Mesh loaded from slot" was seen after probing started.
        loaded: bool,
    },
    /// The mesh was saved and activated.
    Complete,
    /// The session's watchdog expired first.
    TimedOut,
}

impl LevelingState {
    /// True while a session is open and unresolved
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::AwaitingProgress | Self::AwaitingSaveOrLoad { .. }
        )
    }

    /// True once the session resolved
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::TimedOut)
    }
}

/// What one line meant to the detector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineObservation {
    /// Progress text worth showing to the user.
    pub status: Option<String>,
    /// This line completed the session.
    pub completed: bool,
}

/// Line-driven bed-leveling state machine
#[derive(Debug, Clone, Default)]
pub struct BedLevelDetector {
    state: LevelingState,
}

impl BedLevelDetector {
    /// Create an idle detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session, discarding any previous one
    pub fn begin(&mut self) {
        self.state = LevelingState::AwaitingProgress;
    }

    /// Current state
    pub fn state(&self) -> LevelingState {
        self.state
    }

    /// Resolve the session as timed out
    ///
    /// Returns false, leaving the state untouched, when no session is open
    /// or it already resolved.
    pub fn time_out(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.state = LevelingState::TimedOut;
        true
    }

    /// Feed one protocol line
    pub fn observe(&mut self, line: &str) -> LineObservation {
        if !self.state.is_active() {
            return LineObservation::default();
        }

        let line = line.trim();
        if line.is_empty() || line.starts_with("T:") || line.starts_with("B:") {
            return LineObservation::default();
        }

        let lower = line.to_lowercase();
        let status = STATUS_MARKERS
            .iter()
            .any(|marker| lower.contains(marker))
            .then(|| line.to_string());

        if self.state == LevelingState::AwaitingProgress
            && PROGRESS_MARKERS.iter().any(|marker| lower.contains(marker))
        {
            self.state = LevelingState::AwaitingSaveOrLoad {
                saved: false,
                loaded: false,
            };
        }

        let mut completed = false;
        if let LevelingState::AwaitingSaveOrLoad { saved, loaded } = self.state {
            let saved = saved || lower.contains(SAVED_MARKER);
            let loaded = loaded || lower.contains(LOADED_MARKER);
            if saved && (loaded || lower.contains(DONE_MARKER)) {
                self.state = LevelingState::Complete;
                completed = true;
            } else {
                self.state = LevelingState::AwaitingSaveOrLoad { saved, loaded };
            }
        }

        LineObservation { status, completed }
    }
}
