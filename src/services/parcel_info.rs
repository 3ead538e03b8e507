//! Remote parcel information for landmark panels.
//!
//! Looking up a parcel is two single-shot requests: the grid first maps a
//! region position to a parcel id, then returns the details for that id.
//! Panels register as observers of a parcel id and only hear about details
//! of that parcel. Requests are never retried.

use super::background::spawn_background;
use super::http::{HttpSettings, build_http_client, request_error, status_error};
use super::region_lookup::RegionHandle;
use super::subscriptions::{SubscriptionId, Subscribers};
use crate::models::RegionPosition;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Parcel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(Uuid);

impl ParcelId {
    /// Wraps a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Request for the parcel at a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelIdRequest {
    /// Region the position is in.
    pub region_id: Uuid,
    /// Grid handle of that region.
    pub region_handle: u64,
    /// Region-local position.
    pub location: [f32; 3],
}

impl ParcelIdRequest {
    /// Builds a request for `position` in the given region.
    #[must_use]
    pub const fn new(region_id: Uuid, region_handle: RegionHandle, position: RegionPosition) -> Self {
        Self {
            region_id,
            region_handle: region_handle.as_u64(),
            location: [position.x, position.y, position.z],
        }
    }
}

/// Details of one parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelData {
    /// Parcel id.
    pub parcel_id: ParcelId,
    /// Parcel name.
    #[serde(default)]
    pub name: String,
    /// Owner-supplied description.
    #[serde(default)]
    pub description: String,
    /// Owner, if public.
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    /// Region the parcel is in.
    #[serde(default)]
    pub sim_name: String,
    /// Landing point in global metres.
    #[serde(default)]
    pub global_position: [f64; 3],
    /// Area in square metres.
    #[serde(default)]
    pub actual_area: i32,
    /// Snapshot texture.
    #[serde(default)]
    pub snapshot_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ParcelIdResponse {
    parcel_id: ParcelId,
}

/// Grid parcel information service.
pub trait ParcelInfoClient: Send + Sync {
    /// Maps a region position to its parcel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the grid returns no parcel.
    fn request_parcel_id(&self, request: &ParcelIdRequest) -> Result<ParcelId>;

    /// Fetches the details of a parcel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn request_parcel_details(&self, parcel_id: ParcelId) -> Result<ParcelData>;
}

/// Parcel info over HTTP.
///
/// `POST {endpoint}/remote-parcel` with a [`ParcelIdRequest`] body answers
/// `{"parcel_id": "..."}`; `GET {endpoint}/parcels/{id}` answers
/// [`ParcelData`].
pub struct HttpParcelInfoClient {
    endpoint: String,
    settings: HttpSettings,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpParcelInfoClient {
    /// Creates a client for `endpoint`. The HTTP client is built on first use.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            settings: HttpSettings::default(),
            client: OnceLock::new(),
        }
    }

    /// Sets timeouts.
    #[must_use]
    pub fn with_settings(mut self, settings: HttpSettings) -> Self {
        self.settings = settings;
        self
    }

    fn client(&self) -> &reqwest::blocking::Client {
        self.client.get_or_init(|| build_http_client(self.settings))
    }
}

impl ParcelInfoClient for HttpParcelInfoClient {
    #[instrument(name = "waypoint.parcel.request_id", skip(self, request), fields(region_id = %request.region_id))]
    fn request_parcel_id(&self, request: &ParcelIdRequest) -> Result<ParcelId> {
        let response = self
            .client()
            .post(format!("{}/remote-parcel", self.endpoint))
            .json(request)
            .send()
            .map_err(|e| request_error("remote_parcel_request", &e))?;

        if !response.status().is_success() {
            return Err(status_error("remote_parcel_request", response));
        }

        let body: ParcelIdResponse = response.json().map_err(|e| Error::OperationFailed {
            operation: "remote_parcel_response".to_string(),
            cause: e.to_string(),
        })?;
        if body.parcel_id.as_uuid().is_nil() {
            return Err(Error::NotFound("parcel at requested position".to_string()));
        }
        Ok(body.parcel_id)
    }

    #[instrument(name = "waypoint.parcel.request_details", skip(self))]
    fn request_parcel_details(&self, parcel_id: ParcelId) -> Result<ParcelData> {
        let response = self
            .client()
            .get(format!("{}/parcels/{parcel_id}", self.endpoint))
            .send()
            .map_err(|e| request_error("parcel_details_request", &e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("parcel {parcel_id}")));
        }
        if !response.status().is_success() {
            return Err(status_error("parcel_details_request", response));
        }

        response.json().map_err(|e| Error::OperationFailed {
            operation: "parcel_details_response".to_string(),
            cause: e.to_string(),
        })
    }
}

/// Identifies one [`ParcelInfoProcessor::request_parcel_id`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParcelRequestToken(u64);

/// Completed parcel request.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelEvent {
    /// A position mapped to a parcel.
    IdResolved {
        /// Originating request.
        token: ParcelRequestToken,
        /// Parcel at the position.
        parcel_id: ParcelId,
    },
    /// Details arrived; observers of the parcel have been notified.
    Details(ParcelData),
    /// A request failed.
    Failed {
        /// Originating id request, if this was one.
        token: Option<ParcelRequestToken>,
        /// Parcel whose details failed, if known.
        parcel_id: Option<ParcelId>,
        /// Failure description.
        reason: String,
    },
}

enum Completion {
    ParcelId {
        token: ParcelRequestToken,
        result: Result<ParcelId>,
    },
    Details {
        parcel_id: ParcelId,
        result: Result<ParcelData>,
    },
}

/// Issues parcel requests and routes replies to per-parcel observers.
pub struct ParcelInfoProcessor {
    client: Arc<dyn ParcelInfoClient>,
    observers: HashMap<ParcelId, Subscribers<ParcelData>>,
    next_token: u64,
    sender: UnboundedSender<Completion>,
    receiver: UnboundedReceiver<Completion>,
}

impl ParcelInfoProcessor {
    /// Creates a processor over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ParcelInfoClient>) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            client,
            observers: HashMap::new(),
            next_token: 0,
            sender,
            receiver,
        }
    }

    /// Registers a callback for details of `parcel_id`.
    pub fn add_observer<F>(&mut self, parcel_id: ParcelId, callback: F) -> SubscriptionId
    where
        F: Fn(&ParcelData) + Send + Sync + 'static,
    {
        self.observers
            .entry(parcel_id)
            .or_default()
            .subscribe(callback)
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn remove_observer(&mut self, parcel_id: ParcelId, id: SubscriptionId) -> bool {
        let Some(subscribers) = self.observers.get(&parcel_id) else {
            return false;
        };
        let removed = subscribers.unsubscribe(id);
        if subscribers.is_empty() {
            self.observers.remove(&parcel_id);
        }
        removed
    }

    /// Number of parcels with observers.
    #[must_use]
    pub fn observed_parcels(&self) -> usize {
        self.observers.len()
    }

    /// Asks which parcel contains a position.
    pub fn request_parcel_id(&mut self, request: ParcelIdRequest) -> ParcelRequestToken {
        self.next_token += 1;
        let token = ParcelRequestToken(self.next_token);
        let client = Arc::clone(&self.client);
        let sender = self.sender.clone();

        let started = spawn_background("waypoint-parcel-id", move || {
            let result = client.request_parcel_id(&request);
            let _ = sender.send(Completion::ParcelId { token, result });
        });
        if !started {
            let _ = self.sender.send(Completion::ParcelId {
                token,
                result: Err(Error::operation("remote_parcel_request", "could not start request")),
            });
        }

        metrics::counter!("parcel_requests_total", "kind" => "id").increment(1);
        debug!(token = token.0, "Requested parcel id");
        token
    }

    /// Fetches details of `parcel_id` for its observers.
    pub fn request_details(&self, parcel_id: ParcelId) {
        let client = Arc::clone(&self.client);
        let sender = self.sender.clone();

        let started = spawn_background("waypoint-parcel-details", move || {
            let result = client.request_parcel_details(parcel_id);
            let _ = sender.send(Completion::Details { parcel_id, result });
        });
        if !started {
            let _ = self.sender.send(Completion::Details {
                parcel_id,
                result: Err(Error::operation("parcel_details_request", "could not start request")),
            });
        }

        metrics::counter!("parcel_requests_total", "kind" => "details").increment(1);
    }

    /// Drains completed requests without blocking.
    ///
    /// Details are dispatched to observers of their parcel before being
    /// returned. A resolved id with observers triggers a details request.
    pub fn poll(&mut self) -> Vec<ParcelEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            events.push(self.handle(completion));
        }
        events
    }

    /// Waits for the next completed request.
    pub async fn next_event(&mut self) -> Option<ParcelEvent> {
        let completion = self.receiver.recv().await?;
        Some(self.handle(completion))
    }

    fn handle(&mut self, completion: Completion) -> ParcelEvent {
        match completion {
            Completion::ParcelId {
                token,
                result: Ok(parcel_id),
            } => {
                if self.observers.contains_key(&parcel_id) {
                    self.request_details(parcel_id);
                }
                ParcelEvent::IdResolved { token, parcel_id }
            },
            Completion::ParcelId {
                token,
                result: Err(e),
            } => {
                warn!(error = %e, "Parcel id request failed");
                metrics::counter!("parcel_requests_failed_total", "kind" => "id").increment(1);
                ParcelEvent::Failed {
                    token: Some(token),
                    parcel_id: None,
                    reason: e.to_string(),
                }
            },
            Completion::Details {
                result: Ok(data), ..
            } => {
                if let Some(subscribers) = self.observers.get(&data.parcel_id) {
                    subscribers.notify(&data);
                }
                ParcelEvent::Details(data)
            },
            Completion::Details {
                parcel_id,
                result: Err(e),
            } => {
                warn!(error = %e, parcel_id = %parcel_id, "Parcel details request failed");
                metrics::counter!("parcel_requests_failed_total", "kind" => "details")
                    .increment(1);
                ParcelEvent::Failed {
                    token: None,
                    parcel_id: Some(parcel_id),
                    reason: e.to_string(),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeParcels {
        parcel: ParcelId,
        details_calls: AtomicUsize,
    }

    impl ParcelInfoClient for FakeParcels {
        fn request_parcel_id(&self, request: &ParcelIdRequest) -> Result<ParcelId> {
            if request.location[0] < 0.0 {
                return Err(Error::NotFound("parcel at requested position".to_string()));
            }
            Ok(self.parcel)
        }

        fn request_parcel_details(&self, parcel_id: ParcelId) -> Result<ParcelData> {
            self.details_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ParcelData {
                parcel_id,
                name: "Beach".to_string(),
                description: String::new(),
                owner_id: None,
                sim_name: "Ahern".to_string(),
                global_position: [0.0; 3],
                actual_area: 512,
                snapshot_id: None,
            })
        }
    }

    async fn next(processor: &mut ParcelInfoProcessor) -> ParcelEvent {
        tokio::time::timeout(std::time::Duration::from_secs(5), processor.next_event())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    fn request(x: f32) -> ParcelIdRequest {
        ParcelIdRequest::new(
            Uuid::nil(),
            RegionHandle::from_grid(997, 1002),
            RegionPosition::new(x, 128.0, 20.0),
        )
    }

    #[tokio::test]
    async fn test_id_then_details_reach_observer() {
        let parcel = ParcelId::new(Uuid::new_v4());
        let client = Arc::new(FakeParcels {
            parcel,
            details_calls: AtomicUsize::new(0),
        });
        let mut processor = ParcelInfoProcessor::new(client.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        processor.add_observer(parcel, move |data| {
            sink.lock().unwrap().push(data.name.clone());
        });

        let token = processor.request_parcel_id(request(10.0));
        assert_eq!(
            next(&mut processor).await,
            ParcelEvent::IdResolved {
                token,
                parcel_id: parcel
            }
        );
        assert!(matches!(next(&mut processor).await, ParcelEvent::Details(_)));
        assert_eq!(*seen.lock().unwrap(), vec!["Beach".to_string()]);
        assert_eq!(client.details_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unobserved_parcel_fetches_no_details() {
        let client = Arc::new(FakeParcels {
            parcel: ParcelId::new(Uuid::new_v4()),
            details_calls: AtomicUsize::new(0),
        });
        let mut processor = ParcelInfoProcessor::new(client.clone());

        processor.request_parcel_id(request(10.0));
        assert!(matches!(next(&mut processor).await, ParcelEvent::IdResolved { .. }));
        assert_eq!(client.details_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_details_only_reach_their_parcel() {
        let parcel = ParcelId::new(Uuid::new_v4());
        let other = ParcelId::new(Uuid::new_v4());
        let client = Arc::new(FakeParcels {
            parcel,
            details_calls: AtomicUsize::new(0),
        });
        let mut processor = ParcelInfoProcessor::new(client);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        processor.add_observer(other, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        processor.request_details(parcel);
        assert!(matches!(next(&mut processor).await, ParcelEvent::Details(d) if d.parcel_id == parcel));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_id_request() {
        let client = Arc::new(FakeParcels {
            parcel: ParcelId::new(Uuid::new_v4()),
            details_calls: AtomicUsize::new(0),
        });
        let mut processor = ParcelInfoProcessor::new(client);

        let token = processor.request_parcel_id(request(-1.0));
        assert!(matches!(
            next(&mut processor).await,
            ParcelEvent::Failed { token: Some(t), parcel_id: None, .. } if t == token
        ));
    }

    #[test]
    fn test_remove_observer_drops_empty_list() {
        let client = Arc::new(FakeParcels {
            parcel: ParcelId::new(Uuid::new_v4()),
            details_calls: AtomicUsize::new(0),
        });
        let mut processor = ParcelInfoProcessor::new(client);
        let parcel = ParcelId::new(Uuid::new_v4());

        let id = processor.add_observer(parcel, |_| {});
        assert_eq!(processor.observed_parcels(), 1);
        assert!(processor.remove_observer(parcel, id));
        assert_eq!(processor.observed_parcels(), 0);
        assert!(!processor.remove_observer(parcel, id));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(request(10.0)).unwrap();
        assert_eq!(body["location"], serde_json::json!([10.0, 128.0, 20.0]));
        assert_eq!(
            body["region_handle"],
            serde_json::json!(RegionHandle::from_grid(997, 1002).as_u64())
        );
    }
}
