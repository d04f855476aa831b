use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::session::SessionId;

/// An owner report screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Employees,
    Staff,
    SalaryRules,
    Schedule,
    Salaries,
    CashShifts,
    ShiftSales,
    Statistics,
}

/// Proof that a fetch was started as generation `generation` of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    session: SessionId,
    screen: Screen,
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Per-session, per-screen fetch counters.
///
/// A later fetch of the same screen supersedes every earlier one: only the
/// holder of the newest ticket may publish its result. Counters idle for longer
/// than the session lifetime belong to abandoned sessions and are swept.
#[derive(Clone)]
pub struct ViewGenerations {
    inner: Arc<Mutex<Counters>>,
    idle_ttl: Duration,
}

struct Counters {
    latest: HashMap<(SessionId, Screen), Counter>,
    last_sweep: Instant,
}

struct Counter {
    generation: u64,
    touched: Instant,
}

impl ViewGenerations {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Counters {
                latest: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            idle_ttl,
        }
    }

    /// Starts a fetch, superseding any fetch of the same screen still in flight.
    pub fn begin(&self, session: SessionId, screen: Screen) -> Ticket {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let sweep_every = self.idle_ttl.min(SWEEP_INTERVAL);
        if now.duration_since(inner.last_sweep) >= sweep_every {
            let idle_ttl = self.idle_ttl;
            inner
                .latest
                .retain(|_, counter| now.duration_since(counter.touched) < idle_ttl);
            inner.last_sweep = now;
        }

        let counter = inner.latest.entry((session, screen)).or_insert(Counter {
            generation: 0,
            touched: now,
        });
        counter.generation += 1;
        counter.touched = now;

        Ticket {
            session,
            screen,
            generation: counter.generation,
        }
    }

    /// Whether no newer fetch of the ticket's screen has started.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.inner
            .lock()
            .latest
            .get(&(ticket.session, ticket.screen))
            .is_some_and(|latest| latest.generation == ticket.generation)
    }

    /// Drops the counters of a session that logged out or expired.
    pub fn forget(&self, session: SessionId) {
        self.inner
            .lock()
            .latest
            .retain(|(owner, _), _| *owner != session);
    }

    /// Number of tracked (session, screen) pairs.
    pub fn len(&self) -> usize {
        self.inner.lock().latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
