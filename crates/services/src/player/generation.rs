/// Identifies one issued request so its response can be checked for staleness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Generation counter guarding one kind of suspend point.
///
/// Used two ways:
///
/// - as a *view* gate: navigation calls [`RequestGate::issue`], in-flight work
///   snapshots [`RequestGate::current`], and a response only moves the view
///   while [`RequestGate::is_current`] still holds;
/// - as a *replacement* gate: each request takes a fresh ticket and
///   [`RequestGate::accept`] lets a response through only if it is newer than
///   the last one applied.
#[derive(Debug, Default, Clone)]
pub struct RequestGate {
    issued: u64,
    applied: u64,
}

impl RequestGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation. Every ticket issued before becomes stale.
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    #[must_use]
    pub fn current(&self) -> Ticket {
        Ticket(self.issued)
    }

    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }

    /// Accepts `ticket` if nothing newer has been applied yet.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        if ticket.0 > self.applied && ticket.0 <= self.issued {
            self.applied = ticket.0;
            true
        } else {
            false
        }
    }
}
