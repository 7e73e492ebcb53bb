// Event Records and the Event Sink boundary
// Detectors build EventRecords; an EventSink takes ownership of them

use crate::core::event_types::EventType;
use crate::core::types::MarketSession;
use crate::state::MarketSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

// ============================================================================
// Event Context
// ============================================================================

/// Denormalised copy of the triggering snapshot's context fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    pub change_percent: Option<f64>,
    pub rvol: Option<f64>,
    pub volume: f64,
    pub market_cap: Option<f64>,
    pub gap_percent: Option<f64>,
    pub vwap: Option<f64>,
    pub atr_percent: Option<f64>,
    pub chg_1min: Option<f64>,
    pub chg_5min: Option<f64>,
    pub chg_10min: Option<f64>,
    pub chg_15min: Option<f64>,
    pub chg_30min: Option<f64>,
    pub vol_1min: Option<f64>,
    pub vol_5min: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub adx: Option<f64>,
    pub intraday_high: Option<f64>,
    pub intraday_low: Option<f64>,
    pub prev_close: Option<f64>,
    pub open_price: Option<f64>,
    pub float_shares: Option<f64>,
    pub security_type: Option<String>,
    pub sector: Option<String>,
    pub market_session: MarketSession,
}

impl EventContext {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        Self {
            change_percent: snapshot.daily_change_percent(),
            rvol: snapshot.rvol,
            volume: snapshot.volume,
            market_cap: snapshot.market_cap,
            gap_percent: snapshot.gap_percent(),
            vwap: snapshot.vwap,
            atr_percent: snapshot.atr_percent,
            chg_1min: snapshot.chg_1min,
            chg_5min: snapshot.chg_5min,
            chg_10min: snapshot.chg_10min,
            chg_15min: snapshot.chg_15min,
            chg_30min: snapshot.chg_30min,
            vol_1min: snapshot.vol_1min,
            vol_5min: snapshot.vol_5min,
            rsi: snapshot.rsi,
            macd_line: snapshot.macd_line,
            macd_signal: snapshot.macd_signal,
            stoch_k: snapshot.stoch_k,
            stoch_d: snapshot.stoch_d,
            adx: snapshot.adx,
            intraday_high: snapshot.intraday_high,
            intraday_low: snapshot.intraday_low,
            prev_close: snapshot.prev_close,
            open_price: snapshot.open_price,
            float_shares: snapshot.float_shares,
            security_type: snapshot.security_type.clone(),
            sector: snapshot.sector.clone(),
            market_session: snapshot.market_session,
        }
    }
}

// ============================================================================
// Event Record
// ============================================================================

/// One firing of one event type for one symbol. Immutable once handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub event_type: EventType,
    /// Source detector, `event:<detector>`
    pub rule_id: String,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub prev_value: Option<f64>,
    pub new_value: Option<f64>,
    pub delta: Option<f64>,
    pub delta_percent: Option<f64>,
    pub context: EventContext,
    pub details: HashMap<String, serde_json::Value>,
}

impl EventRecord {
    pub fn new(event_type: EventType, detector: &str, snapshot: &MarketSnapshot) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            rule_id: format!("event:{}", detector),
            symbol: snapshot.symbol.clone(),
            timestamp: snapshot.timestamp,
            price: snapshot.price,
            prev_value: None,
            new_value: None,
            delta: None,
            delta_percent: None,
            context: EventContext::from_snapshot(snapshot),
            details: HashMap::new(),
        }
    }

    /// Previous and new value of the crossed quantity; derives delta and delta %
    pub fn with_values(mut self, prev_value: f64, new_value: f64) -> Self {
        let delta = new_value - prev_value;
        self.prev_value = Some(prev_value);
        self.new_value = Some(new_value);
        self.delta = Some(delta);
        self.delta_percent = if prev_value != 0.0 {
            Some(delta / prev_value.abs() * 100.0)
        } else {
            None
        };
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(|v| v.as_f64())
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event(type={}, symbol={}, price={:.4}, rule={}, id={})",
            self.event_type,
            self.symbol,
            self.price,
            self.rule_id,
            self.event_id.get(..8).unwrap_or(self.event_id.as_str())
        )
    }
}

// ============================================================================
// Event Sink
// ============================================================================

/// Destination for emitted events (durable log, recent index, notification fan-out)
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EventRecord);
}

impl<F> EventSink for F
where
    F: Fn(EventRecord) + Send + Sync,
{
    fn publish(&self, event: EventRecord) {
        self(event)
    }
}

// ============================================================================
// Event Bus (in-memory sink with bounded recent-event index)
// ============================================================================

type EventCallback = Arc<dyn Fn(&EventRecord) + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct EventBusStats {
    total_published: u64,
    total_delivered: u64,
}

#[derive(Default)]
struct RecentIndex {
    all: VecDeque<Arc<EventRecord>>,
    by_symbol: HashMap<String, VecDeque<Arc<EventRecord>>>,
    by_type: HashMap<EventType, VecDeque<Arc<EventRecord>>>,
}

fn push_bounded(queue: &mut VecDeque<Arc<EventRecord>>, event: Arc<EventRecord>, max: usize) {
    queue.push_back(event);
    while queue.len() > max {
        queue.pop_front();
    }
}

fn newest_first(queue: Option<&VecDeque<Arc<EventRecord>>>, limit: usize) -> Vec<EventRecord> {
    queue
        .map(|q| q.iter().rev().take(limit).map(|e| (**e).clone()).collect())
        .unwrap_or_default()
}

/// In-memory event sink: broadcast channel, typed callbacks, bounded recent index
pub struct EventBus {
    tx: broadcast::Sender<EventRecord>,
    subscribers: RwLock<HashMap<EventType, Vec<EventCallback>>>,
    wildcard_subscribers: RwLock<Vec<EventCallback>>,
    recent: RwLock<RecentIndex>,
    max_recent: usize,
    max_recent_per_key: usize,
    stats: RwLock<EventBusStats>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(10_000, 200)
    }

    pub fn with_capacity(max_recent: usize, max_recent_per_key: usize) -> Self {
        let (tx, _rx) = broadcast::channel(10_000);

        Self {
            tx,
            subscribers: RwLock::new(HashMap::new()),
            wildcard_subscribers: RwLock::new(Vec::new()),
            recent: RwLock::new(RecentIndex::default()),
            max_recent,
            max_recent_per_key,
            stats: RwLock::new(EventBusStats::default()),
        }
    }

    /// Subscribe to one event type, or to every event with `None`
    pub fn subscribe<F>(&self, event_type: Option<EventType>, callback: F)
    where
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);

        match event_type {
            Some(event_type) => {
                self.subscribers.write().entry(event_type).or_default().push(callback);
                tracing::info!(event_type = %event_type, "Subscribed to events");
            }
            None => {
                self.wildcard_subscribers.write().push(callback);
                tracing::info!("Subscribed to all events");
            }
        }
    }

    /// Receiver for every published event
    pub fn subscribe_channel(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    pub fn recent(&self, limit: usize) -> Vec<EventRecord> {
        newest_first(Some(&self.recent.read().all), limit)
    }

    pub fn recent_for_symbol(&self, symbol: &str, limit: usize) -> Vec<EventRecord> {
        newest_first(self.recent.read().by_symbol.get(symbol), limit)
    }

    pub fn recent_for_type(&self, event_type: EventType, limit: usize) -> Vec<EventRecord> {
        newest_first(self.recent.read().by_type.get(&event_type), limit)
    }

    pub fn get_stats(&self) -> EventBusStatsSnapshot {
        let stats = self.stats.read();
        let subscribers = self.subscribers.read();
        let wildcard = self.wildcard_subscribers.read();
        let recent = self.recent.read();

        EventBusStatsSnapshot {
            total_published: stats.total_published,
            total_delivered: stats.total_delivered,
            subscriber_count: subscribers.values().map(Vec::len).sum::<usize>() + wildcard.len(),
            indexed_symbols: recent.by_symbol.len(),
            history_size: recent.all.len(),
        }
    }

    pub fn clear_history(&self) {
        let mut recent = self.recent.write();
        recent.all.clear();
        recent.by_symbol.clear();
        recent.by_type.clear();
    }

    fn index(&self, event: &EventRecord) {
        let shared = Arc::new(event.clone());
        let mut recent = self.recent.write();
        push_bounded(&mut recent.all, shared.clone(), self.max_recent);
        push_bounded(
            recent.by_symbol.entry(event.symbol.clone()).or_default(),
            shared.clone(),
            self.max_recent_per_key,
        );
        push_bounded(
            recent.by_type.entry(event.event_type).or_default(),
            shared,
            self.max_recent_per_key,
        );
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: EventRecord) {
        self.stats.write().total_published += 1;
        self.index(&event);

        let mut delivered = 0;
        if let Some(callbacks) = self.subscribers.read().get(&event.event_type) {
            for callback in callbacks {
                callback(&event);
                delivered += 1;
            }
        }
        for callback in self.wildcard_subscribers.read().iter() {
            callback(&event);
            delivered += 1;
        }
        self.stats.write().total_delivered += delivered;

        // No receivers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of event bus statistics
#[derive(Debug, Clone)]
pub struct EventBusStatsSnapshot {
    pub total_published: u64,
    pub total_delivered: u64,
    pub subscriber_count: usize,
    pub indexed_symbols: usize,
    pub history_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(symbol: &str) -> MarketSnapshot {
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        MarketSnapshot {
            rvol: Some(2.5),
            prev_close: Some(10.0),
            open_price: Some(10.4),
            ..MarketSnapshot::new(symbol, ts, 11.0, 75_000.0)
        }
    }

    #[test]
    fn test_event_record_values() {
        let event = EventRecord::new(EventType::VwapCrossAbove, "price", &snapshot("AAPL"))
            .with_values(10.0, 11.0)
            .with_detail("vwap", 10.5);

        assert_eq!(event.rule_id, "event:price");
        assert_eq!(event.delta, Some(1.0));
        assert!((event.delta_percent.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(event.detail_f64("vwap"), Some(10.5));
        assert_eq!(event.context.rvol, Some(2.5));
        assert!((event.context.gap_percent.unwrap() - 4.0).abs() < 1e-9);
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_zero_prev_value_has_no_percent() {
        let event = EventRecord::new(EventType::MacdZeroCrossUp, "macd", &snapshot("AAPL"))
            .with_values(0.0, 0.2);
        assert_eq!(event.delta_percent, None);
        assert_eq!(event.delta, Some(0.2));
    }

    #[test]
    fn test_event_record_json() {
        let event = EventRecord::new(EventType::NewHigh, "price", &snapshot("AAPL"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "NEW_HIGH");
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["context"]["market_session"], "CLOSED");
    }

    #[test]
    fn test_display_with_foreign_event_id() {
        let mut event = EventRecord::new(EventType::NewHigh, "price", &snapshot("AAPL"));
        let full = event.event_id.clone();
        assert!(event.to_string().contains(&format!("id={})", &full[..8])));

        // Records read back from a sink may carry ids this crate did not mint
        event.event_id = "ab1".to_string();
        assert!(event.to_string().ends_with("id=ab1)"));
        event.event_id = "aéééé-1".to_string();
        assert!(event.to_string().ends_with("id=aéééé-1)"));
    }

    #[test]
    fn test_event_bus_subscribe_and_publish() {
        let bus = EventBus::new();
        let received = Arc::new(RwLock::new(0));
        let received_clone = Arc::clone(&received);

        bus.subscribe(Some(EventType::NewHigh), move |_event| {
            *received_clone.write() += 1;
        });

        bus.publish(EventRecord::new(EventType::NewHigh, "price", &snapshot("AAPL")));
        bus.publish(EventRecord::new(EventType::NewLow, "price", &snapshot("AAPL")));

        assert_eq!(*received.read(), 1);
        assert_eq!(bus.get_stats().total_published, 2);
    }

    #[test]
    fn test_recent_index_bounded() {
        let bus = EventBus::with_capacity(3, 2);
        for symbol in ["A", "A", "A", "B"] {
            bus.publish(EventRecord::new(EventType::NewHigh, "price", &snapshot(symbol)));
        }

        assert_eq!(bus.recent(10).len(), 3);
        assert_eq!(bus.recent_for_symbol("A", 10).len(), 2);
        assert_eq!(bus.recent_for_symbol("B", 10).len(), 1);
        assert_eq!(bus.recent_for_type(EventType::NewHigh, 10).len(), 2);
        assert_eq!(bus.recent(1)[0].symbol, "B");
        assert!(bus.recent_for_symbol("C", 10).is_empty());
    }

    #[test]
    fn test_broadcast_channel() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_channel();
        bus.publish(EventRecord::new(EventType::BlockTrade, "volume", &snapshot("AAPL")));
        let got = rx.try_recv().unwrap();
        assert_eq!(got.event_type, EventType::BlockTrade);
    }

    #[test]
    fn test_closure_sink() {
        let collected = Arc::new(RwLock::new(Vec::new()));
        let sink_store = Arc::clone(&collected);
        let sink = move |event: EventRecord| sink_store.write().push(event);
        sink.publish(EventRecord::new(EventType::RvolSpike, "volume", &snapshot("AAPL")));
        assert_eq!(collected.read().len(), 1);
    }
}
