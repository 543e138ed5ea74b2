//! Prometheus metrics for the ticket relay.
//!
//! Counters cover the correlation engine, webhook intake and chat delivery.
//! Everything registers into one process-wide registry exposed at `/metrics`.
//!
//! # Example
//! ```no_run
//! use helpdesk_relay::metrics::WEBHOOK_EVENTS_TOTAL;
//!
//! WEBHOOK_EVENTS_TOTAL
//!     .with_label_values(&["ticket.created"])
//!     .inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};

const NAMESPACE: &str = "helpdesk_relay";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Correlation Metrics
    // ============================================================================

    /// Tickets examined by the correlation engine
    ///
    /// Labels: outcome
    pub static ref TICKETS_PROCESSED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("tickets_processed_total", "Tickets examined by the correlation engine")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create TICKETS_PROCESSED_TOTAL metric");

    /// DOWN records written to the store
    pub static ref DOWN_ALERTS_STORED_TOTAL: Counter = Counter::with_opts(
        Opts::new("down_alerts_stored_total", "DOWN records written to the store")
            .namespace(NAMESPACE)
    ).expect("Failed to create DOWN_ALERTS_STORED_TOTAL metric");

    /// DOWN records removed after a matching UP ticket
    pub static ref DOWN_ALERTS_RESOLVED_TOTAL: Counter = Counter::with_opts(
        Opts::new("down_alerts_resolved_total", "DOWN records resolved by an UP ticket")
            .namespace(NAMESPACE)
    ).expect("Failed to create DOWN_ALERTS_RESOLVED_TOTAL metric");

    /// Remote close calls that failed
    pub static ref TICKET_CLOSE_FAILURES_TOTAL: Counter = Counter::with_opts(
        Opts::new("ticket_close_failures_total", "Failed helpdesk close calls")
            .namespace(NAMESPACE)
    ).expect("Failed to create TICKET_CLOSE_FAILURES_TOTAL metric");

    /// Open DOWN records after the last store change
    pub static ref DOWN_ALERTS_OPEN: Gauge = Gauge::with_opts(
        Opts::new("down_alerts_open", "Open DOWN records")
            .namespace(NAMESPACE)
    ).expect("Failed to create DOWN_ALERTS_OPEN metric");

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Chat messages sent
    ///
    /// Labels: status (sent, failed)
    pub static ref NOTIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("notifications_total", "Chat messages sent")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create NOTIFICATIONS_TOTAL metric");

    // ============================================================================
    // Webhook Metrics
    // ============================================================================

    /// Webhook events received
    ///
    /// Labels: event_type
    pub static ref WEBHOOK_EVENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("webhook_events_total", "Helpdesk webhook events received")
            .namespace(NAMESPACE),
        &["event_type"]
    ).expect("Failed to create WEBHOOK_EVENTS_TOTAL metric");

    /// Bot commands handled
    ///
    /// Labels: command
    pub static ref BOT_COMMANDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("bot_commands_total", "Chat bot commands handled")
            .namespace(NAMESPACE),
        &["command"]
    ).expect("Failed to create BOT_COMMANDS_TOTAL metric");
}

/// Register every metric with the global registry
///
/// Safe to call more than once; repeated registrations are ignored.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TICKETS_PROCESSED_TOTAL.clone()),
        Box::new(DOWN_ALERTS_STORED_TOTAL.clone()),
        Box::new(DOWN_ALERTS_RESOLVED_TOTAL.clone()),
        Box::new(TICKET_CLOSE_FAILURES_TOTAL.clone()),
        Box::new(DOWN_ALERTS_OPEN.clone()),
        Box::new(NOTIFICATIONS_TOTAL.clone()),
        Box::new(WEBHOOK_EVENTS_TOTAL.clone()),
        Box::new(BOT_COMMANDS_TOTAL.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
