//! # Mock Store & Testing Guide
//!
//! `MockStore<T>` hands out a real [`StoreClient<T>`] whose requests are answered from a queue
//! of expectations instead of a live [`StoreActor`](crate::StoreActor). Code that sits on top of
//! the client (retry logic, timeouts, error mapping) can then be tested deterministically.
//!
//! ## When to use Mocks vs a Real Store
//!
//! | Feature | MockStore | Real StoreActor |
//! |---------|-----------|-----------------|
//! | **State** | None, scripted replies | Real records and versions |
//! | **Error Injection** | Easy (`return_err`) | Hard (needs a real race) |
//! | **Timeouts** | `never_respond()` | Not reproducible |
//! | **Use Case** | Failure paths of callers | Happy paths and concurrency |
//!
//! ## Example
//!
//! ```rust
//! use store_actor::mock::MockStore;
//! use store_actor::{StoreError, StoredRecord};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Note { id: u32, version: u64 }
//!
//! impl StoredRecord for Note {
//!     type Id = u32;
//!     type Filter = ();
//!     fn id(&self) -> &u32 { &self.id }
//!     fn assign_id(&mut self, id: u32) { self.id = id; }
//!     fn version(&self) -> u64 { self.version }
//!     fn set_version(&mut self, version: u64) { self.version = version; }
//!     fn matches(&self, _: &()) -> bool { true }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockStore::<Note>::new();
//!     mock.expect_get().return_ok(Some(Note { id: 1, version: 3 }));
//!     mock.expect_write().return_err(StoreError::ActorClosed);
//!
//!     let client = mock.client();
//!     assert_eq!(client.get(1).await.unwrap().unwrap().version, 3);
//!     assert!(client.write(Note { id: 1, version: 3 }, 3).await.is_err());
//!
//!     mock.verify();
//! }
//! ```

use crate::client::StoreClient;
use crate::error::StoreError;
use crate::message::{ChangeNotice, StoreRequest};
use crate::record::StoredRecord;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};

type Feed<T> = broadcast::Receiver<ChangeNotice<<T as StoredRecord>::Id>>;

/// How the mock answers one request.
enum Reply<R> {
    Respond(Result<R, StoreError>),
    /// Keep the responder alive and never answer.
    Hang,
}

/// One scripted request, in the order it is expected to arrive.
enum Expectation<T: StoredRecord> {
    Get(Reply<Option<T>>),
    Query(Reply<Vec<T>>),
    Insert(Reply<T>),
    Write(Reply<T>),
    Subscribe(Reply<Feed<T>>),
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock store with expectation tracking for fluent testing.
pub struct MockStore<T: StoredRecord> {
    client: StoreClient<T>,
    expectations: Queue<T>,
    failures: Arc<Mutex<Vec<String>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: StoredRecord> Default for MockStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn answer<R: Send + 'static>(
    respond_to: oneshot::Sender<Result<R, StoreError>>,
    reply: Reply<R>,
    held: &mut Vec<Box<dyn Any + Send>>,
) {
    match reply {
        Reply::Respond(result) => {
            let _ = respond_to.send(result);
        }
        Reply::Hang => held.push(Box::new(respond_to)),
    }
}

impl<T: StoredRecord> MockStore<T> {
    /// Creates a new mock with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<StoreRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let queue = expectations.clone();
        let failed = failures.clone();

        let handle = tokio::spawn(async move {
            let mut held: Vec<Box<dyn Any + Send>> = Vec::new();
            while let Some(request) = receiver.recv().await {
                let expectation = queue.lock().unwrap().pop_front();

                match (request, expectation) {
                    (StoreRequest::Get { respond_to, .. }, Some(Expectation::Get(reply))) => {
                        answer(respond_to, reply, &mut held)
                    }
                    (StoreRequest::Query { respond_to, .. }, Some(Expectation::Query(reply))) => {
                        answer(respond_to, reply, &mut held)
                    }
                    (StoreRequest::Insert { respond_to, .. }, Some(Expectation::Insert(reply))) => {
                        answer(respond_to, reply, &mut held)
                    }
                    (StoreRequest::Write { respond_to, .. }, Some(Expectation::Write(reply))) => {
                        answer(respond_to, reply, &mut held)
                    }
                    (StoreRequest::Subscribe { respond_to }, Some(Expectation::Subscribe(reply))) => {
                        answer(respond_to, reply, &mut held)
                    }
                    (request, _) => {
                        // Dropping the request drops its responder: the caller sees ActorDropped
                        failed
                            .lock()
                            .unwrap()
                            .push(format!("unexpected request: {}", describe(&request)));
                    }
                }
            }
        });

        Self {
            client: StoreClient::new(sender),
            expectations,
            failures,
            _handle: handle,
        }
    }

    /// Returns a client wired to this mock.
    pub fn client(&self) -> StoreClient<T> {
        self.client.clone()
    }

    pub fn expect_get(&mut self) -> ExpectationBuilder<T, Option<T>> {
        self.builder(Expectation::Get)
    }

    pub fn expect_query(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        self.builder(Expectation::Query)
    }

    pub fn expect_insert(&mut self) -> ExpectationBuilder<T, T> {
        self.builder(Expectation::Insert)
    }

    pub fn expect_write(&mut self) -> ExpectationBuilder<T, T> {
        self.builder(Expectation::Write)
    }

    pub fn expect_subscribe(&mut self) -> ExpectationBuilder<T, Feed<T>> {
        self.builder(Expectation::Subscribe)
    }

    fn builder<R>(&self, wrap: fn(Reply<R>) -> Expectation<T>) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            expectations: self.expectations.clone(),
            wrap,
        }
    }

    /// Panics if any expectation is left over or any request arrived unexpectedly.
    pub fn verify(&self) {
        let failures = self.failures.lock().unwrap();
        if !failures.is_empty() {
            panic!("Mock store received unexpected requests: {:?}", *failures);
        }
        let remaining = self.expectations.lock().unwrap().len();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

fn describe<T: StoredRecord>(request: &StoreRequest<T>) -> String {
    match request {
        StoreRequest::Insert { .. } => "insert".to_string(),
        StoreRequest::Get { id, .. } => format!("get {id}"),
        StoreRequest::Query { filter, .. } => format!("query {filter:?}"),
        StoreRequest::Write { record, .. } => format!("write {}", record.id()),
        StoreRequest::Subscribe { .. } => "subscribe".to_string(),
    }
}

/// Builder for a single expectation. Pick exactly one terminal method.
pub struct ExpectationBuilder<T: StoredRecord, R> {
    expectations: Queue<T>,
    wrap: fn(Reply<R>) -> Expectation<T>,
}

impl<T: StoredRecord, R> ExpectationBuilder<T, R> {
    /// Answer the request successfully.
    pub fn return_ok(self, value: R) {
        self.push(Reply::Respond(Ok(value)));
    }

    /// Answer the request with an error.
    pub fn return_err(self, error: StoreError) {
        self.push(Reply::Respond(Err(error)));
    }

    /// Accept the request but never answer it.
    pub fn never_respond(self) {
        self.push(Reply::Hang);
    }

    fn push(self, reply: Reply<R>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back((self.wrap)(reply));
    }
}

// =============================================================================
// RAW HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// Use this when a test needs to inspect the request payload or answer it at a chosen moment.
/// For scripted replies prefer [`MockStore`].
pub fn create_mock_client<T: StoredRecord>(
    buffer_size: usize,
) -> (StoreClient<T>, mpsc::Receiver<StoreRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Waits for the next request and returns it if it is a `Write`.
pub async fn expect_write<T: StoredRecord>(
    receiver: &mut mpsc::Receiver<StoreRequest<T>>,
) -> Option<(T, u64, oneshot::Sender<Result<T, StoreError>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Write {
            record,
            expected_version,
            respond_to,
        }) => Some((record, expected_version, respond_to)),
        _ => None,
    }
}

/// Waits for the next request and returns it if it is a `Get`.
pub async fn expect_get<T: StoredRecord>(
    receiver: &mut mpsc::Receiver<StoreRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<Option<T>, StoreError>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}
