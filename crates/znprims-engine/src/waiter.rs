use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{oneshot, OwnedSemaphorePermit};
use tokio::time::Instant;
use tracing::debug;
use znprims_registry::{
    status_message, Command, CommandIdentity, CommandType, DecodeError, Subsystem,
};

use crate::matcher::Match;

/// Status code reported for outcomes that never reached the radio's answer.
pub const STATUS_FAILURE: u8 = 0x01;

/// How a waiter finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A matching reply arrived.
    Resolved(Command),
    /// A reply with the expected identity arrived but its payload was malformed.
    Failed(DecodeError),
    /// No reply before the deadline.
    TimedOut,
    /// The engine shut down first.
    Cancelled,
}

impl Outcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    pub fn command(&self) -> Option<&Command> {
        match self {
            Outcome::Resolved(command) => Some(command),
            _ => None,
        }
    }

    pub fn into_command(self) -> Option<Command> {
        match self {
            Outcome::Resolved(command) => Some(command),
            _ => None,
        }
    }

    /// Status code and message; 0 means success.
    pub fn status(&self) -> (u8, String) {
        match self {
            Outcome::Resolved(command) => match command.status() {
                None | Some(0) => (0, "success".to_string()),
                Some(code) => (code, status_message(code)),
            },
            Outcome::Failed(err) => (STATUS_FAILURE, format!("malformed reply: {err}")),
            Outcome::TimedOut => (STATUS_FAILURE, "no reply before timeout".to_string()),
            Outcome::Cancelled => (STATUS_FAILURE, "cancelled by engine shutdown".to_string()),
        }
    }
}

/// A registered expectation and the slot its outcome goes to.
///
/// Holding the gate permit here ties a request's in-flight slot to the
/// lifetime of its waiter: resolving, expiring or cancelling the waiter drops
/// it and lets the next request through.
#[derive(Debug)]
pub(crate) struct Waiter {
    pub(crate) id: u64,
    pub(crate) predicate: Match,
    origin: Option<CommandIdentity>,
    expires: Instant,
    slot: oneshot::Sender<Outcome>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Waiter {
    pub(crate) fn resolve(self, outcome: Outcome) {
        if self.slot.send(outcome).is_err() {
            debug!(waiter = self.id, predicate = %self.predicate, "waiter abandoned before resolution");
        }
    }

    fn is_abandoned(&self) -> bool {
        self.slot.is_closed()
    }
}

#[derive(Debug)]
struct Tombstone {
    predicate: Match,
    until: Instant,
}

/// What an inbound command means to the table.
#[derive(Debug)]
pub(crate) enum Claim {
    Waiter(Waiter),
    Duplicate,
    Unclaimed,
}

pub(crate) struct Registration {
    pub(crate) predicate: Match,
    pub(crate) origin: Option<CommandIdentity>,
    pub(crate) timeout: Duration,
    pub(crate) permit: Option<OwnedSemaphorePermit>,
}

/// Pending waiters in registration order, plus recently finished ones.
#[derive(Debug)]
pub(crate) struct WaiterTable {
    waiters: VecDeque<Waiter>,
    tombstones: VecDeque<Tombstone>,
    next_id: u64,
    closed: bool,
    duplicate_window: Duration,
    max_tombstones: usize,
}

impl WaiterTable {
    pub(crate) fn new(duplicate_window: Duration, max_tombstones: usize) -> Self {
        Self {
            waiters: VecDeque::new(),
            tombstones: VecDeque::new(),
            next_id: 0,
            closed: false,
            duplicate_window,
            max_tombstones,
        }
    }

    /// Add a waiter; `None` once the table has been drained for shutdown.
    pub(crate) fn insert(
        &mut self,
        registration: Registration,
        now: Instant,
    ) -> Option<(u64, oneshot::Receiver<Outcome>)> {
        if self.closed {
            return None;
        }
        let (slot, receiver) = oneshot::channel();
        self.next_id += 1;
        let id = self.next_id;
        self.waiters.push_back(Waiter {
            id,
            predicate: registration.predicate,
            origin: registration.origin,
            expires: now + registration.timeout,
            slot,
            _permit: registration.permit,
        });
        Some((id, receiver))
    }

    /// Find the waiter `command` answers: the earliest live one whose
    /// predicate matches, else the earliest whose request the radio rejected
    /// outright with a failing synchronous status.
    pub(crate) fn claim(&mut self, command: &Command, now: Instant) -> Claim {
        let matched = self
            .waiters
            .iter()
            .position(|waiter| !waiter.is_abandoned() && waiter.predicate.matches(command))
            .or_else(|| self.rejected_by(command));

        if let Some(index) = matched {
            if let Some(waiter) = self.waiters.remove(index) {
                self.bury(&waiter.predicate, now);
                return Claim::Waiter(waiter);
            }
        }

        if self.is_duplicate(command, now) {
            Claim::Duplicate
        } else {
            Claim::Unclaimed
        }
    }

    fn rejected_by(&self, command: &Command) -> Option<usize> {
        if command.kind() != CommandType::Srsp || matches!(command.status(), None | Some(0)) {
            return None;
        }
        let request = CommandIdentity::new(CommandType::Sreq, command.subsystem(), command.id());
        self.waiters
            .iter()
            .position(|waiter| !waiter.is_abandoned() && waiter.origin == Some(request))
    }

    /// The earliest identity-only waiter for a reply that failed to decode.
    pub(crate) fn claim_failed(
        &mut self,
        kind: CommandType,
        subsystem: Subsystem,
        name: &str,
        now: Instant,
    ) -> Option<Waiter> {
        let index = self.waiters.iter().position(|waiter| {
            !waiter.is_abandoned()
                && waiter.predicate.is_identity_only()
                && waiter.predicate.matches_identity(kind, subsystem, name)
        })?;
        let waiter = self.waiters.remove(index)?;
        self.bury(&waiter.predicate, now);
        Some(waiter)
    }

    fn is_duplicate(&self, command: &Command, now: Instant) -> bool {
        self.tombstones
            .iter()
            .any(|stone| stone.until > now && stone.predicate.matches(command))
    }

    /// Withdraw a waiter; `remember` keeps a tombstone so a late reply is
    /// recognised as a duplicate.
    pub(crate) fn remove(&mut self, id: u64, remember: bool, now: Instant) -> Option<Waiter> {
        let index = self.waiters.iter().position(|waiter| waiter.id == id)?;
        let waiter = self.waiters.remove(index)?;
        if remember {
            self.bury(&waiter.predicate, now);
        }
        Some(waiter)
    }

    /// Remove waiters past their deadline or whose caller stopped listening,
    /// and forget stale tombstones.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Waiter> {
        self.tombstones.retain(|stone| stone.until > now);

        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.waiters.len() {
            let waiter = &self.waiters[index];
            let timed_out = waiter.expires <= now;
            if timed_out || waiter.is_abandoned() {
                if let Some(waiter) = self.waiters.remove(index) {
                    if timed_out {
                        self.bury(&waiter.predicate, now);
                    }
                    expired.push(waiter);
                }
            } else {
                index += 1;
            }
        }
        expired
    }

    /// Remove everything and refuse new waiters.
    pub(crate) fn drain(&mut self) -> Vec<Waiter> {
        self.closed = true;
        self.tombstones.clear();
        self.waiters.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Only predicates that pin one particular reply are remembered; an
    /// identity-only predicate would swallow the next unrelated indication.
    fn bury(&mut self, predicate: &Match, now: Instant) {
        if self.max_tombstones == 0 || predicate.is_identity_only() {
            return;
        }
        while self.tombstones.len() >= self.max_tombstones {
            self.tombstones.pop_front();
        }
        self.tombstones.push_back(Tombstone {
            predicate: predicate.clone(),
            until: now + self.duplicate_window,
        });
    }
}

#[cfg(test)]
mod tests {
    use znprims_registry::{CommandRegistry, FieldMap};

    use super::*;

    fn registry() -> CommandRegistry {
        CommandRegistry::builtin().unwrap()
    }

    fn confirm(transid: u8, status: u8) -> Command {
        let fields = FieldMap::new()
            .with("status", status)
            .with("endpoint", 1u8)
            .with("transid", transid);
        registry()
            .build(CommandType::Areq, Subsystem::Af, "dataConfirm", fields)
            .unwrap()
    }

    fn expect(predicate: Match) -> Registration {
        Registration {
            predicate,
            origin: None,
            timeout: Duration::from_secs(10),
            permit: None,
        }
    }

    fn table() -> WaiterTable {
        WaiterTable::new(Duration::from_secs(2), 4)
    }

    fn confirm_for(tsn: u8) -> Match {
        Match::areq(Subsystem::Af, "dataConfirm").with_field("transid", tsn)
    }

    #[test]
    fn first_registered_match_wins() {
        let now = Instant::now();
        let mut table = table();
        let (first, _rx1) = table
            .insert(expect(Match::areq(Subsystem::Af, "dataConfirm")), now)
            .unwrap();
        let (_second, _rx2) = table.insert(expect(confirm_for(5)), now).unwrap();

        let Claim::Waiter(waiter) = table.claim(&confirm(5, 0), now) else {
            panic!("expected a waiter to claim the confirm");
        };
        assert_eq!(waiter.id, first);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn repeat_within_window_is_duplicate() {
        let now = Instant::now();
        let mut table = table();
        let (_id, _rx) = table.insert(expect(confirm_for(9)), now).unwrap();

        assert!(matches!(table.claim(&confirm(9, 0), now), Claim::Waiter(_)));
        assert!(matches!(table.claim(&confirm(9, 0), now), Claim::Duplicate));
        assert!(matches!(
            table.claim(&confirm(9, 0), now + Duration::from_secs(3)),
            Claim::Unclaimed
        ));
        assert!(matches!(table.claim(&confirm(10, 0), now), Claim::Unclaimed));
    }

    #[test]
    fn expiry_collects_past_deadline_and_abandoned() {
        let now = Instant::now();
        let mut table = table();
        let (_short, _rx_short) = table
            .insert(
                Registration {
                    timeout: Duration::from_millis(100),
                    ..expect(confirm_for(1))
                },
                now,
            )
            .unwrap();
        let (_dropped, rx_dropped) = table.insert(expect(confirm_for(2)), now).unwrap();
        let (_live, _rx_live) = table.insert(expect(confirm_for(3)), now).unwrap();
        drop(rx_dropped);

        let expired = table.expire(now + Duration::from_millis(200));
        assert_eq!(expired.len(), 2);
        assert_eq!(table.len(), 1);

        // The expired reply is now recognised as late; the abandoned one is not.
        let later = now + Duration::from_millis(300);
        assert!(matches!(table.claim(&confirm(1, 0), later), Claim::Duplicate));
        assert!(matches!(table.claim(&confirm(2, 0), later), Claim::Unclaimed));
    }

    #[test]
    fn identity_only_waiter_leaves_no_tombstone() {
        let now = Instant::now();
        let mut table = table();
        let (_id, _rx) = table
            .insert(expect(Match::areq(Subsystem::Af, "dataConfirm")), now)
            .unwrap();

        assert!(matches!(table.claim(&confirm(1, 0), now), Claim::Waiter(_)));
        assert!(matches!(table.claim(&confirm(2, 0), now), Claim::Unclaimed));

        let (_expiring, _rx) = table
            .insert(
                Registration {
                    timeout: Duration::from_millis(100),
                    ..expect(Match::areq(Subsystem::Af, "dataConfirm"))
                },
                now,
            )
            .unwrap();
        let later = now + Duration::from_millis(200);
        assert_eq!(table.expire(later).len(), 1);
        assert!(matches!(table.claim(&confirm(3, 0), later), Claim::Unclaimed));
    }

    #[test]
    fn drain_closes_table() {
        let now = Instant::now();
        let mut table = table();
        let (_id, mut rx) = table.insert(expect(confirm_for(1)), now).unwrap();

        for waiter in table.drain() {
            waiter.resolve(Outcome::Cancelled);
        }
        assert_eq!(rx.try_recv().unwrap(), Outcome::Cancelled);
        assert!(table.is_closed());
        assert!(table.insert(expect(confirm_for(2)), now).is_none());
    }

    #[test]
    fn failing_srsp_rejects_its_request() {
        let now = Instant::now();
        let registry = registry();
        let mut table = table();
        let (id, _rx) = table
            .insert(
                Registration {
                    origin: Some(CommandIdentity::new(CommandType::Sreq, Subsystem::Af, 0x01)),
                    ..expect(confirm_for(1))
                },
                now,
            )
            .unwrap();

        let accepted = registry
            .build(
                CommandType::Srsp,
                Subsystem::Af,
                "dataRequest",
                FieldMap::new().with("status", 0u8),
            )
            .unwrap();
        assert!(matches!(table.claim(&accepted, now), Claim::Unclaimed));

        let rejected = registry
            .build(
                CommandType::Srsp,
                Subsystem::Af,
                "dataRequest",
                FieldMap::new().with("status", 0x02u8),
            )
            .unwrap();
        let Claim::Waiter(waiter) = table.claim(&rejected, now) else {
            panic!("rejection should claim the pending request");
        };
        assert_eq!(waiter.id, id);
    }

    #[test]
    fn tombstones_are_bounded() {
        let now = Instant::now();
        let mut table = WaiterTable::new(Duration::from_secs(2), 2);
        for tsn in 1..=3u8 {
            let (_id, _rx) = table.insert(expect(confirm_for(tsn)), now).unwrap();
            assert!(matches!(table.claim(&confirm(tsn, 0), now), Claim::Waiter(_)));
        }
        assert!(matches!(table.claim(&confirm(1, 0), now), Claim::Unclaimed));
        assert!(matches!(table.claim(&confirm(3, 0), now), Claim::Duplicate));
    }

    #[test]
    fn outcome_status() {
        assert_eq!(
            Outcome::Resolved(confirm(1, 0)).status(),
            (0, "success".to_string())
        );
        assert_eq!(
            Outcome::Resolved(confirm(1, 0xE9)).status(),
            (0xE9, "MAC_NO_ACK (0xe9)".to_string())
        );
        assert_eq!(Outcome::TimedOut.status().0, STATUS_FAILURE);
        assert_eq!(Outcome::Cancelled.status().0, STATUS_FAILURE);
    }
}
