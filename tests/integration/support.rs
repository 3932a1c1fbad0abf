//! Shared test doubles: scripted fetcher, validator, and recording sink

use async_trait::async_trait;
use channel_batch_fetcher::cache::{MemoryCacheStore, ResultCache};
use channel_batch_fetcher::dispatcher::{BatchDispatcher, ProgressSink};
use channel_batch_fetcher::fetcher::{ChannelFetcher, FetchError, FetchResult, KeyValidator};
use channel_batch_fetcher::keypool::KeyPool;
use channel_batch_fetcher::{ChannelInfo, ChannelRef, ItemOutcome};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted collaborator response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Successful fetch
    Ok,
    /// Quota signal: the dispatcher must rotate keys
    Quota,
    /// Transient failure: the dispatcher must back off and retry
    Transient,
    /// Invalid request: terminal, no retry
    Invalid,
    /// Unrecoverable failure: terminal, no retry
    Fatal,
}

/// Deterministic payload for a reference value
pub fn info_for(value: &str) -> ChannelInfo {
    ChannelInfo {
        channel_id: format!("id-{value}"),
        title: format!("Channel {value}"),
        description: String::new(),
        custom_url: None,
        published_at: None,
        country: None,
        subscriber_count: Some(100),
        video_count: 10,
        view_count: 1000,
    }
}

/// Scripted [`ChannelFetcher`]
///
/// Responses are consumed per reference value in order; once a script is
/// drained (or was never set) every further call succeeds. Records every
/// (value, key) call for assertions.
#[derive(Default)]
pub struct MockFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, String)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the responses for one reference value
    pub fn script(self, value: &str, steps: &[Step]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(value.to_string(), steps.iter().copied().collect());
        self
    }

    /// Total fetch calls made
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every (reference value, api key) pair, in call order
    pub fn call_log(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelFetcher for MockFetcher {
    async fn fetch(&self, reference: &ChannelRef, api_key: &str) -> FetchResult<ChannelInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap()
            .push((reference.value().to_string(), api_key.to_string()));

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(reference.value())
            .and_then(|q| q.pop_front())
            .unwrap_or(Step::Ok);

        match step {
            Step::Ok => Ok(info_for(reference.value())),
            Step::Quota => Err(FetchError::quota("quota exceeded")),
            Step::Transient => Err(FetchError::transient("connection reset")),
            Step::Invalid => Err(FetchError::invalid("channel not found")),
            Step::Fatal => Err(FetchError::fatal("malformed response")),
        }
    }
}

/// Validator that accepts every key
pub struct AcceptAll;

#[async_trait]
impl KeyValidator for AcceptAll {
    async fn validate(&self, _key: &str) -> Result<bool, String> {
        Ok(true)
    }
}

/// Build a pool whose keys have all passed validation
pub async fn validated_pool(keys: &[&str]) -> Arc<KeyPool> {
    let pool = Arc::new(KeyPool::new(keys.iter().map(|k| k.to_string()).collect()));
    pool.validate_all(&AcceptAll, |_, _| {}).await;
    pool
}

/// Fresh in-memory result cache
pub fn memory_cache() -> Arc<ResultCache> {
    Arc::new(ResultCache::new(Arc::new(MemoryCacheStore::new())))
}

/// Dispatcher wired for tests: no courtesy delay between items
pub fn dispatcher(
    fetcher: Arc<MockFetcher>,
    pool: Arc<KeyPool>,
    cache: Arc<ResultCache>,
) -> BatchDispatcher {
    BatchDispatcher::new(fetcher, pool, cache).with_inter_request_delay(Duration::ZERO)
}

/// Progress events captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ItemStart(usize),
    ItemComplete(usize, bool),
    Progress(usize, usize, usize),
    KeyExhausted(usize, usize),
    AllKeysExhausted,
}

/// Sink that records every event for later assertions
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }
}

impl ProgressSink for RecordingSink {
    fn on_item_start(&self, index: usize) {
        self.events.lock().unwrap().push(Event::ItemStart(index));
    }

    fn on_item_complete(&self, index: usize, outcome: &ItemOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(Event::ItemComplete(index, outcome.is_success()));
    }

    fn on_progress(&self, success: usize, error: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Progress(success, error, total));
    }

    fn on_key_exhausted(&self, exhausted: usize, remaining: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Event::KeyExhausted(exhausted, remaining));
    }

    fn on_all_keys_exhausted(&self) {
        self.events.lock().unwrap().push(Event::AllKeysExhausted);
    }
}
