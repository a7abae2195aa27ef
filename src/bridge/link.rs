/// Bridge link state machine
///
/// Disconnected -> Connecting -> Connected -> Disconnected -> (fixed delay) -> Connecting ...
///
/// Pure state, no I/O: the client asks it what to do and performs the side
/// effects. A loss reported while a reconnect is already pending schedules
/// nothing, so a close and an error for the same failure never produce two
/// timers.
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkStateMachine {
    state: LinkState,
    reconnect_pending: bool,
    reconnect_delay: Duration,
    attempts: u64,
    sessions: u64,
}

impl LinkStateMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: LinkState::Disconnected,
            reconnect_pending: false,
            reconnect_delay,
            attempts: 0,
            sessions: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Start a connection attempt; refused while one is already running or a
    /// reconnect timer is pending
    pub fn begin_connect(&mut self) -> bool {
        if self.state != LinkState::Disconnected || self.reconnect_pending {
            return false;
        }
        self.state = LinkState::Connecting;
        self.attempts += 1;
        true
    }

    pub fn on_open(&mut self) {
        if self.state == LinkState::Connecting {
            self.state = LinkState::Connected;
            self.sessions += 1;
        }
    }

    /// Close or error; returns the delay to wait only if no reconnect is pending yet
    pub fn on_lost(&mut self) -> Option<Duration> {
        self.state = LinkState::Disconnected;
        if self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = true;
        Some(self.reconnect_delay)
    }

    /// The scheduled delay elapsed; moves to Connecting
    pub fn on_reconnect_timer(&mut self) -> bool {
        if !self.reconnect_pending {
            return false;
        }
        self.reconnect_pending = false;
        self.begin_connect()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Frames are forwarded only while Connected
    pub fn can_forward(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Connection attempts so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Successful connections so far
    pub fn sessions(&self) -> u64 {
        self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut link = LinkStateMachine::new(Duration::from_secs(5));
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(!link.can_forward());

        assert!(link.begin_connect());
        assert_eq!(link.state(), LinkState::Connecting);
        assert!(!link.can_forward());

        link.on_open();
        assert!(link.can_forward());

        assert_eq!(link.on_lost(), Some(Duration::from_secs(5)));
        assert!(!link.can_forward());

        assert!(link.on_reconnect_timer());
        assert_eq!(link.state(), LinkState::Connecting);
        link.on_open();
        assert_eq!(link.sessions(), 2);
        assert_eq!(link.attempts(), 2);
    }

    #[test]
    fn test_repeated_losses_schedule_one_timer() {
        let mut link = LinkStateMachine::new(Duration::from_secs(5));
        link.begin_connect();
        link.on_open();

        let scheduled: Vec<_> = (0..4).filter_map(|_| link.on_lost()).collect();
        assert_eq!(scheduled, vec![Duration::from_secs(5)]);
        assert!(link.reconnect_pending());

        // no parallel attempt while the timer is pending
        assert!(!link.begin_connect());

        assert!(link.on_reconnect_timer());
        assert!(!link.on_reconnect_timer());
    }

    #[test]
    fn test_failed_attempts_retry_forever() {
        let mut link = LinkStateMachine::new(Duration::from_secs(5));
        assert!(link.begin_connect());
        for _ in 0..3 {
            assert_eq!(link.on_lost(), Some(Duration::from_secs(5)));
            assert!(link.on_reconnect_timer());
            assert_eq!(link.state(), LinkState::Connecting);
        }
        assert_eq!(link.attempts(), 4);
        assert_eq!(link.sessions(), 0);
    }
}
