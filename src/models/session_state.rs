use std::fmt;

/// Lifecycle of one scan session.
///
/// The state lives only in memory and starts over at `Idle` on every page load. It is owned
/// by [`crate::ui::ScanSession`] through [`crate::state::StateManager`]; nothing else moves it.
///
/// ```text
/// Idle -[initialize]-> Scanning -[decode]-> Paused -> LookupInFlight
///     LookupInFlight -[found]-> (navigate, teardown) -> Idle
///     LookupInFlight -[failure]-> Error -[resume delay]-> Scanning
///     Scanning -[page hidden]-> Paused -[page visible + delay]-> Scanning
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Scanning,
    Paused,
    LookupInFlight,
    Error,
}

impl SessionState {
    /// States a resume is allowed to leave.
    pub const RESUMABLE: [SessionState; 2] = [SessionState::Paused, SessionState::Error];

    pub fn is_resumable(&self) -> bool {
        Self::RESUMABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::Paused => "paused",
            SessionState::LookupInFlight => "lookup-in-flight",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the session tracks between events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,

    /// Page is hidden (tab switched, window minimized)
    pub page_hidden: bool,

    /// Last code accepted from the decoder
    pub last_code: Option<String>,

    pub manual_entry_active: bool,

    /// Lookups that produced an outcome or error, camera path only
    pub lookups_completed: u64,
}

impl SessionSnapshot {
    /// True while the decoder must stay paused for a lookup.
    pub fn lookup_pending(&self) -> bool {
        matches!(
            self.state,
            SessionState::Paused | SessionState::LookupInFlight
        ) && self.last_code.is_some()
    }
}
