//! Editor-facing providers: precise results first, search-based results
//! annotated as imprecise, memoized per operation.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::search::precise::merge_file_disjoint;
use crate::search::{PreciseProvider, SearchEngine};
use crate::stream::{self, ResultStream, StreamSender};
use crate::telemetry;
use crate::types::{Annotated, Document, HoverPayload, Location, Position};

pub type Locations = Vec<Annotated<Location>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MemoKey {
    uri: String,
    fingerprint: u64,
    position: Position,
    include_declaration: Option<bool>,
}

impl MemoKey {
    fn new(document: &Document, position: Position, include_declaration: Option<bool>) -> Self {
        let mut hasher = DefaultHasher::new();
        document.text.hash(&mut hasher);
        Self {
            uri: document.uri.clone(),
            fingerprint: hasher.finish(),
            position,
            include_declaration,
        }
    }
}

struct Memo<T> {
    key: MemoKey,
    stream: ResultStream<T>,
    cancel: CancellationToken,
}

/// The single in-flight (or finished) lookup of one operation.
struct MemoSlot<T> {
    operation: &'static str,
    current: Mutex<Option<Memo<T>>>,
}

impl<T> MemoSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            current: Mutex::new(None),
        }
    }

    fn get_or_start<F, Fut>(&self, key: MemoKey, produce: F) -> ResultStream<T>
    where
        F: FnOnce(StreamSender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut current = self.current.lock();
        if let Some(memo) = current.as_ref() {
            if memo.key == key {
                return memo.stream.subscribe();
            }
        }
        if let Some(previous) = current.take() {
            debug!(operation = self.operation, "cancelling superseded lookup");
            previous.cancel.cancel();
        }

        let (sender, stream) = stream::channel();
        let cancel = CancellationToken::new();
        let producer = produce(sender);
        let token = cancel.clone();
        let operation = self.operation;
        let started = Instant::now();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => debug!(operation, "lookup cancelled"),
                _ = producer => {
                    telemetry::record_lookup_latency(operation, started.elapsed().as_millis() as u64);
                }
            }
        });

        *current = Some(Memo {
            key,
            stream: stream.subscribe(),
            cancel,
        });
        stream
    }
}

/// Definition, references and hover for a hosting runtime.
///
/// Each call returns a stream. Calling again with the same document content
/// and position joins the running lookup; anything else replaces it.
/// Streams must be requested from within a tokio runtime.
pub struct NavigationProvider {
    engine: Arc<SearchEngine>,
    precise: Option<Arc<dyn PreciseProvider>>,
    definitions: MemoSlot<Locations>,
    references: MemoSlot<Locations>,
    hovers: MemoSlot<Annotated<HoverPayload>>,
}

impl NavigationProvider {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self {
            engine,
            precise: None,
            definitions: MemoSlot::new("definition"),
            references: MemoSlot::new("references"),
            hovers: MemoSlot::new("hover"),
        }
    }

    pub fn with_precise(mut self, precise: Arc<dyn PreciseProvider>) -> Self {
        self.precise = Some(precise);
        self
    }

    pub fn definition(&self, document: &Document, position: Position) -> ResultStream<Locations> {
        let key = MemoKey::new(document, position, None);
        let engine = self.engine.clone();
        let precise = self.precise.clone();
        let document = document.clone();
        self.definitions.get_or_start(key, move |sender| async move {
            if let Some(precise) = precise {
                match precise.definition(&document, position).await {
                    Ok(locations) if !locations.is_empty() => {
                        sender.emit(locations.into_iter().map(Annotated::precise).collect());
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "precise definition failed"),
                }
            }
            match engine.definition(&document, position).await {
                Ok(results) => sender.emit(
                    results
                        .iter()
                        .map(|result| Annotated::imprecise(result.to_location()))
                        .collect(),
                ),
                Err(err) => warn!(path = %document.path, error = %err, "definition search failed"),
            }
        })
    }

    pub fn references(
        &self,
        document: &Document,
        position: Position,
        include_declaration: bool,
    ) -> ResultStream<Locations> {
        let key = MemoKey::new(document, position, Some(include_declaration));
        let engine = self.engine.clone();
        let precise = self.precise.clone();
        let document = document.clone();
        self.references.get_or_start(key, move |sender| async move {
            let mut precise_locations = Vec::new();
            if let Some(precise) = precise {
                match precise.references(&document, position, include_declaration).await {
                    Ok(locations) => precise_locations = locations,
                    Err(err) => warn!(error = %err, "precise references failed"),
                }
            }
            if !precise_locations.is_empty() {
                sender.emit(
                    precise_locations
                        .iter()
                        .cloned()
                        .map(Annotated::precise)
                        .collect(),
                );
            }

            match engine.references(&document, position).await {
                Ok(results) => {
                    let imprecise: Vec<Location> =
                        results.iter().map(|result| result.to_location()).collect();
                    if imprecise.is_empty() && !precise_locations.is_empty() {
                        return;
                    }
                    sender.emit(merge_file_disjoint(precise_locations, imprecise));
                }
                Err(err) => warn!(path = %document.path, error = %err, "reference search failed"),
            }
        })
    }

    pub fn hover(
        &self,
        document: &Document,
        position: Position,
    ) -> ResultStream<Annotated<HoverPayload>> {
        let key = MemoKey::new(document, position, None);
        let engine = self.engine.clone();
        let precise = self.precise.clone();
        let document = document.clone();
        self.hovers.get_or_start(key, move |sender| async move {
            if let Some(precise) = precise {
                match precise.hover(&document, position).await {
                    Ok(Some(hover)) if !hover.contents.is_empty() => {
                        sender.emit(Annotated::precise(hover));
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "precise hover failed"),
                }
            }
            match engine.hover(&document, position).await {
                Ok(Some(hover)) => sender.emit(Annotated::imprecise(hover)),
                Ok(None) => {}
                Err(err) => warn!(path = %document.path, error = %err, "hover search failed"),
            }
        })
    }
}
