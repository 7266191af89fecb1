use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::soil::SoilReading;

pub const DEFAULT_TTL: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Copy)]
struct Slot {
    reading: SoilReading,
    received_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slot: Option<Slot>,
    next_seq: u64,
}

/// Single-slot store for the most recent sensor reading.
///
/// Last writer wins. A reading older than the TTL is never handed out.
#[derive(Debug)]
pub struct SensorMailbox {
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl Default for SensorMailbox {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SensorMailbox {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `reading`, replacing whatever was there. Returns its sequence number.
    pub fn post(&self, reading: SoilReading) -> u64 {
        self.post_at(reading, Instant::now())
    }

    pub fn post_at(&self, reading: SoilReading, now: Instant) -> u64 {
        let mut inner = self.lock();
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.slot = Some(Slot {
            reading,
            received_at: now,
            seq,
        });
        seq
    }

    /// The current reading if it has not expired, without consuming it.
    pub fn peek_fresh(&self) -> Option<(u64, SoilReading)> {
        self.peek_fresh_at(Instant::now())
    }

    pub fn peek_fresh_at(&self, now: Instant) -> Option<(u64, SoilReading)> {
        let mut inner = self.lock();
        let slot = inner.slot?;
        if now.saturating_duration_since(slot.received_at) >= self.ttl {
            inner.slot = None;
            return None;
        }
        Some((slot.seq, slot.reading))
    }

    /// Consume the current reading if it has not expired.
    pub fn take(&self) -> Option<SoilReading> {
        self.take_at(Instant::now())
    }

    pub fn take_at(&self, now: Instant) -> Option<SoilReading> {
        let (seq, reading) = self.peek_fresh_at(now)?;
        self.clear_if(seq);
        Some(reading)
    }

    /// Clear the slot only if it still holds reading `seq`. A newer post survives.
    pub fn clear_if(&self, seq: u64) -> bool {
        let mut inner = self.lock();
        match inner.slot {
            Some(slot) if slot.seq == seq => {
                inner.slot = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ph: f64) -> SoilReading {
        SoilReading::new(ph, 40.0, 2.0)
    }

    #[test]
    fn test_take_consumes() {
        let mailbox = SensorMailbox::default();
        mailbox.post(reading(6.5));
        assert_eq!(mailbox.take(), Some(reading(6.5)));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let mailbox = SensorMailbox::default();
        mailbox.post(reading(5.0));
        mailbox.post(reading(7.0));
        assert_eq!(mailbox.take(), Some(reading(7.0)));
    }

    #[test]
    fn test_reading_expires_at_ttl() {
        let mailbox = SensorMailbox::new(Duration::from_secs(90));
        let t0 = Instant::now();
        mailbox.post_at(reading(6.5), t0);
        assert!(mailbox.peek_fresh_at(t0 + Duration::from_secs(89)).is_some());
        assert!(mailbox.peek_fresh_at(t0 + Duration::from_secs(90)).is_none());
        // Expired readings are dropped, not resurrected.
        assert!(mailbox.peek_fresh_at(t0).is_none());
    }

    #[test]
    fn test_clear_if_spares_newer_reading() {
        let mailbox = SensorMailbox::default();
        let first = mailbox.post(reading(5.0));
        let (seq, _) = mailbox.peek_fresh().unwrap();
        assert_eq!(seq, first);
        mailbox.post(reading(6.0));
        assert!(!mailbox.clear_if(first));
        assert_eq!(mailbox.take(), Some(reading(6.0)));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mailbox = SensorMailbox::default();
        mailbox.post(reading(6.5));
        assert!(mailbox.peek_fresh().is_some());
        assert!(mailbox.peek_fresh().is_some());
    }
}
