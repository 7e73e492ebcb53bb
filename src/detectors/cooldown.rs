// Cooldown Tracker - Per (event type, symbol) suppression window
// Shared by every detector registered on an engine

use crate::core::event_types::EventType;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

/// Last firing time per symbol and event type.
///
/// An event may fire when it has never fired for the symbol, or when at least
/// `cooldown_secs` have elapsed since the last recorded firing. A cooldown of
/// zero never suppresses.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_fired: HashMap<String, HashMap<EventType, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_fire(&self, event_type: EventType, symbol: &str, cooldown_secs: u64, now: DateTime<Utc>) -> bool {
        if cooldown_secs == 0 {
            return true;
        }

        match self.last_fired.get(symbol).and_then(|events| events.get(&event_type)) {
            Some(&last) => now - last >= Duration::seconds(cooldown_secs as i64),
            None => true,
        }
    }

    pub fn record_fire(&mut self, event_type: EventType, symbol: &str, now: DateTime<Utc>) {
        self.last_fired
            .entry(symbol.to_string())
            .or_default()
            .insert(event_type, now);
    }

    /// Check and record in one step; returns whether the event may fire
    pub fn try_fire(&mut self, event_type: EventType, symbol: &str, cooldown_secs: u64, now: DateTime<Utc>) -> bool {
        if !self.can_fire(event_type, symbol, cooldown_secs, now) {
            return false;
        }
        self.record_fire(event_type, symbol, now);
        true
    }

    /// Drop entries for symbols not in `active_symbols`; returns entries removed
    pub fn cleanup(&mut self, active_symbols: &HashSet<String>) -> usize {
        let mut removed = 0;
        self.last_fired.retain(|symbol, events| {
            if active_symbols.contains(symbol) {
                true
            } else {
                removed += events.len();
                false
            }
        });
        removed
    }

    /// Full clear at trading-day rollover
    pub fn reset(&mut self) {
        self.last_fired.clear();
    }

    pub fn tracked_symbols(&self) -> usize {
        self.last_fired.len()
    }
}
