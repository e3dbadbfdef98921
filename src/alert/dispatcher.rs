use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::FlipEvent;
use crate::indicator::Direction;
use crate::utils::epoch_ms_to_utc;

pub fn format_flip(event: &FlipEvent) -> String {
    let side = match event.direction {
        Direction::Up => "🟢 LONG",
        Direction::Down => "🔴 SHORT",
        Direction::Unknown => "⚪ FLAT",
    };
    format!(
        "Chandelier Exit {} on {} ({}, {}) - close {:.4} at {}",
        side,
        event.pair.name,
        crate::utils::TimeUtils::interval_to_string(event.pair.interval_ms),
        event.representation,
        event.close,
        epoch_ms_to_utc(event.close_time_ms),
    )
}

/// Drain flip events and push them out through the notifier. Delivery
/// failures are logged and dropped; the indicator chain must never stall
/// on a flaky Telegram endpoint.
pub async fn run_dispatcher(
    mut rx: mpsc::Receiver<FlipEvent>,
    notifier: Arc<dyn super::Notifier>,
) {
    while let Some(event) = rx.recv().await {
        let text = format_flip(&event);
        log::info!("Dispatching alert: {}", text);
        if let Err(e) = notifier.notify(&text).await {
            log::error!("Alert delivery failed: {:#}", e);
        }
    }
    log::warn!("Flip channel closed; dispatcher stopping");
}
