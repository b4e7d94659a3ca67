//! Report de la sauvegarde (debounce) et horloge injectable

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source de temps
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Horloge système
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Horloge manuelle, partagée entre le store et l'appelant
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Minuterie redémarrée à chaque déclenchement: N déclenchements dans la
/// fenêtre produisent un seul tir après le dernier.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)démarre la minuterie
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Retourne true (une seule fois) si l'échéance est atteinte
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_restarts_window() {
        let clock = ManualClock::new();
        let mut d = Debouncer::new(Duration::from_millis(100));

        d.trigger(clock.now());
        clock.advance(Duration::from_millis(60));
        d.trigger(clock.now());
        clock.advance(Duration::from_millis(60));
        assert!(!d.poll(clock.now()));

        clock.advance(Duration::from_millis(40));
        assert!(d.poll(clock.now()));
        assert!(!d.poll(clock.now()));
    }

    #[test]
    fn test_cancel() {
        let clock = ManualClock::new();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.trigger(clock.now());
        d.cancel();
        clock.advance(Duration::from_millis(20));
        assert!(!d.poll(clock.now()));
    }
}
