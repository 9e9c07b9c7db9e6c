use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use storefront_events::{EventBus, EventEnvelope, InMemoryEventBus};
use storefront_infra::{AppConfig, InMemoryKitStore, KitStore, PostgresKitStore, ReservationCoordinator, StoreError};

pub type SharedBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type Coordinator = ReservationCoordinator<Arc<dyn KitStore>, SharedBus>;

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::InMemory => "in_memory",
            StoreBackend::Postgres => "postgres",
        }
    }
}

pub struct AppServices {
    coordinator: Coordinator,
    backend: StoreBackend,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    match &config.database {
        Some(database) => {
            let store = PostgresKitStore::connect(database).await?;
            tracing::info!(max_connections = database.max_connections, "using postgres kit store");
            Ok(AppServices::new(Arc::new(store), StoreBackend::Postgres))
        }
        None => {
            tracing::info!("using in-memory kit store");
            Ok(AppServices::in_memory())
        }
    }
}

impl AppServices {
    pub fn new(store: Arc<dyn KitStore>, backend: StoreBackend) -> Self {
        let bus: SharedBus = Arc::new(InMemoryEventBus::new());

        // Realtime channel (SSE): lossy broadcast; nobody listening is fine.
        let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);
        spawn_forwarder(&bus, realtime_tx.clone());

        Self {
            coordinator: ReservationCoordinator::new(store, bus),
            backend,
            realtime_tx,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKitStore::new()), StoreBackend::InMemory)
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

/// Background subscriber: bus -> realtime broadcast. Ends when the bus is
/// dropped.
fn spawn_forwarder(bus: &SharedBus, realtime_tx: broadcast::Sender<RealtimeMessage>) {
    let sub = bus.subscribe();
    let spawned = std::thread::Builder::new()
        .name("event-forwarder".to_string())
        .spawn(move || {
            for env in sub.iter() {
                // Lossy; no backpressure on the write path.
                let _ = realtime_tx.send(RealtimeMessage {
                    topic: env.event_type().to_string(),
                    payload: serde_json::json!({
                        "event_id": env.event_id().to_string(),
                        "aggregate_type": env.aggregate_type(),
                        "aggregate_id": env.aggregate_id().to_string(),
                        "event_type": env.event_type(),
                        "occurred_at": env.occurred_at().to_rfc3339(),
                        "payload": env.payload(),
                    }),
                });
            }
            tracing::debug!("event bus closed; forwarder stopped");
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to start event forwarder; /stream will stay silent");
    }
}

/// Build an SSE stream of committed events (used by `/stream`).
///
/// `prefix` narrows the stream to event types starting with it, e.g. `kits.`.
pub fn sse_stream(
    services: Arc<AppServices>,
    prefix: Option<String>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if prefix.as_deref().is_none_or(|p| m.topic.starts_with(p)) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
