use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;

use crate::parsing::{BlockRef, BlockTree};
use crate::text::{
    BufferId, ChangeSubscription, MapError, SnapshotSpan, Span, SpanTrackingMode, TextBuffer,
    TextChange, TextSnapshot, TrackingMode, any_text_changes,
};

use super::scan::{BackgroundScan, ScanCompleted};

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("query snapshot belongs to buffer {query:?}, tagger tracks {tracked:?}")]
    UnrelatedSnapshot { query: BufferId, tracked: BufferId },

    #[error(transparent)]
    Map(#[from] MapError),
}

/// A block tag together with its span in the tree's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSpan {
    pub span: SnapshotSpan,
    pub tag: BlockRef,
}

/// Published whenever a new tree replaces the old one. Covers the whole
/// snapshot the new tree was built from.
#[derive(Debug, Clone)]
pub struct TagsChanged {
    pub span: SnapshotSpan,
}

#[derive(Default)]
struct TaggerState {
    ref_count: usize,
    subscription: Option<ChangeSubscription>,
    scan: Option<BackgroundScan>,
    root: Option<Arc<BlockTree>>,
    listeners: Vec<Sender<TagsChanged>>,
    next_generation: u64,
}

/// Keeps the block tree of one buffer up to date.
///
/// Dormant until the first [`attach`](Self::attach); while attached it
/// follows the buffer's change feed and rescans in the background. The owner
/// drives it by calling [`process_events`](Self::process_events) (or
/// [`wait_for_scan`](Self::wait_for_scan)), which is where finished scans are
/// published.
pub struct BlockTagger {
    buffer: TextBuffer,
    state: Mutex<TaggerState>,
    completed_tx: Sender<ScanCompleted>,
    completed_rx: Receiver<ScanCompleted>,
}

impl std::fmt::Debug for BlockTagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockTagger")
            .field("buffer", &self.buffer.id())
            .field("ref_count", &state.ref_count)
            .field("scanning", &state.scan.is_some())
            .field("has_tree", &state.root.is_some())
            .finish()
    }
}

impl BlockTagger {
    pub fn new(buffer: TextBuffer) -> Self {
        let (completed_tx, completed_rx) = crossbeam_channel::unbounded();
        Self {
            buffer,
            state: Mutex::new(TaggerState::default()),
            completed_tx,
            completed_rx,
        }
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock().ref_count
    }

    pub fn is_active(&self) -> bool {
        self.ref_count() > 0
    }

    /// True while a scan is running whose result has not been published.
    pub fn is_scanning(&self) -> bool {
        self.state.lock().scan.is_some()
    }

    /// The most recently published tree.
    pub fn current_tree(&self) -> Option<Arc<BlockTree>> {
        self.state.lock().root.clone()
    }

    /// Adds a subscriber. The first one subscribes to the buffer and starts
    /// an initial scan of its current snapshot.
    pub fn attach(&self) {
        let mut state = self.state.lock();
        state.ref_count += 1;
        if state.ref_count == 1 {
            tracing::debug!(buffer = ?self.buffer.id(), "tagger activated");
            state.subscription = Some(self.buffer.subscribe());
            let snapshot = self.buffer.current_snapshot();
            self.start_scan(&mut state, snapshot);
        }
    }

    /// Removes a subscriber. The last one unsubscribes, cancels any running
    /// scan and drops the tree.
    pub fn detach(&self) {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            tracing::warn!(buffer = ?self.buffer.id(), "detach on a dormant tagger");
            return;
        }
        state.ref_count -= 1;
        if state.ref_count == 0 {
            tracing::debug!(buffer = ?self.buffer.id(), "tagger dormant");
            self.deactivate(&mut state);
        }
    }

    fn deactivate(&self, state: &mut TaggerState) {
        if let Some(subscription) = state.subscription.take() {
            self.buffer.unsubscribe(subscription.id());
        }
        if let Some(scan) = state.scan.take() {
            scan.cancel();
        }
        state.root = None;
    }

    /// Subscribe to tree replacements.
    pub fn tags_changed(&self) -> Receiver<TagsChanged> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.state.lock().listeners.push(tx);
        rx
    }

    /// Handle a change delivered by the host instead of the subscription.
    pub fn on_text_changed(&self, change: &TextChange) {
        let mut state = self.state.lock();
        self.handle_change(&mut state, change);
    }

    fn handle_change(&self, state: &mut TaggerState, change: &TextChange) {
        if state.ref_count == 0 {
            return;
        }
        if !any_text_changes(change.before.version(), change.after.version()) {
            tracing::trace!(
                from = change.before.version().number(),
                to = change.after.version().number(),
                "ignoring change without edits"
            );
            return;
        }
        self.start_scan(state, change.after.clone());
    }

    fn start_scan(&self, state: &mut TaggerState, snapshot: TextSnapshot) {
        if let Some(previous) = state.scan.take() {
            tracing::debug!(generation = previous.generation(), "cancelling superseded scan");
            previous.cancel();
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let version = snapshot.version().number();
        match BackgroundScan::spawn(generation, snapshot, self.completed_tx.clone()) {
            Ok(scan) => {
                tracing::debug!(generation, version, "scan started");
                state.scan = Some(scan);
            }
            // Keep showing the last good tree.
            Err(err) => tracing::error!(generation, error = %err, "failed to start scan thread"),
        }
    }

    /// Drains pending change notifications and publishes any finished scan.
    /// Returns true if a new tree was published.
    pub fn process_events(&self) -> bool {
        let mut state = self.state.lock();
        let changes = state
            .subscription
            .as_ref()
            .map(ChangeSubscription::pending)
            .unwrap_or_default();
        for change in &changes {
            self.handle_change(&mut state, change);
        }

        let mut published = false;
        while let Ok(done) = self.completed_rx.try_recv() {
            published |= self.publish(&mut state, done);
        }
        published
    }

    /// Processes events until no scan is running or `timeout` elapses.
    /// Returns true if the tagger ends up idle with a published tree.
    pub fn wait_for_scan(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_events();
            {
                let state = self.state.lock();
                if state.scan.is_none() {
                    return state.root.is_some();
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.completed_rx.recv_timeout(remaining) {
                Ok(done) => {
                    let mut state = self.state.lock();
                    self.publish(&mut state, done);
                }
                Err(_) => return false,
            }
        }
    }

    fn publish(&self, state: &mut TaggerState, done: ScanCompleted) -> bool {
        let current = state
            .scan
            .as_ref()
            .is_some_and(|scan| scan.generation() == done.generation && !scan.is_cancelled());
        if !current {
            tracing::trace!(generation = done.generation, "discarding stale scan result");
            return false;
        }

        state.scan = None;
        let tree = Arc::new(done.tree);
        let span = SnapshotSpan::full(tree.snapshot());
        tracing::debug!(
            generation = done.generation,
            version = tree.snapshot().version().number(),
            blocks = tree.block_count(),
            "published block tree"
        );
        state.root = Some(tree);
        state
            .listeners
            .retain(|listener| listener.send(TagsChanged { span: span.clone() }).is_ok());
        true
    }

    /// Every block whose span intersects one of `spans`, in document order.
    ///
    /// Spans from another version of the buffer are mapped into the tree's
    /// snapshot first (edge-exclusive).
    pub fn get_tags(&self, spans: &[SnapshotSpan]) -> Result<Vec<TagSpan>, TaggerError> {
        let Some(root) = self.current_tree() else {
            return Ok(Vec::new());
        };
        if spans.is_empty() {
            return Ok(Vec::new());
        }

        let target = root.snapshot();
        let query = spans
            .iter()
            .map(|span| {
                if span.snapshot.buffer_id() != target.buffer_id() {
                    return Err(TaggerError::UnrelatedSnapshot {
                        query: span.snapshot.buffer_id(),
                        tracked: target.buffer_id(),
                    });
                }
                Ok(span.translate_to(target, SpanTrackingMode::EdgeExclusive)?.span)
            })
            .collect::<Result<Vec<Span>, TaggerError>>()?;

        let mut tags = Vec::new();
        for child in root.root().children() {
            collect_intersecting(&child, &query, &mut tags);
        }
        Ok(tags)
    }

    /// The innermost block containing `position` of `snapshot`, after mapping
    /// the position into the tree's snapshot. `None` when there is no tree or
    /// the position is outside every block.
    pub fn block_at(
        &self,
        snapshot: &TextSnapshot,
        position: usize,
    ) -> Result<Option<BlockRef>, TaggerError> {
        let Some(root) = self.current_tree() else {
            return Ok(None);
        };
        let target = root.snapshot();
        if snapshot.buffer_id() != target.buffer_id() {
            return Err(TaggerError::UnrelatedSnapshot {
                query: snapshot.buffer_id(),
                tracked: target.buffer_id(),
            });
        }
        let mapped =
            snapshot
                .version()
                .map_position(position, target.version(), TrackingMode::Negative)?;
        let block = root.innermost_at(mapped);
        Ok((!block.is_root()).then_some(block))
    }
}

fn collect_intersecting(block: &BlockRef, query: &[Span], out: &mut Vec<TagSpan>) {
    let span = block.span();
    if !query.iter().any(|q| q.intersects_with(span)) {
        return;
    }
    out.push(TagSpan {
        span: block.snapshot_span(),
        tag: block.clone(),
    });
    for child in block.children() {
        collect_intersecting(&child, query, out);
    }
}

impl Drop for BlockTagger {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.ref_count > 0 {
            tracing::debug!(buffer = ?self.buffer.id(), refs = state.ref_count, "dropping attached tagger");
        }
        if let Some(subscription) = state.subscription.take() {
            self.buffer.unsubscribe(subscription.id());
        }
        if let Some(scan) = state.scan.take() {
            scan.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WAIT: Duration = Duration::from_secs(5);

    fn active(text: &str) -> (TextBuffer, BlockTagger) {
        let buffer = TextBuffer::new(text);
        let tagger = BlockTagger::new(buffer.clone());
        tagger.attach();
        assert!(tagger.wait_for_scan(WAIT));
        (buffer, tagger)
    }

    fn statements(tags: &[TagSpan]) -> Vec<String> {
        tags.iter().map(|t| t.tag.statement_text()).collect()
    }

    #[test]
    fn dormant_tagger_has_no_tags() {
        let buffer = TextBuffer::new("a { }");
        let tagger = BlockTagger::new(buffer.clone());
        assert!(!tagger.is_active());
        assert!(!tagger.wait_for_scan(Duration::from_millis(10)));
        let tags = tagger
            .get_tags(&[SnapshotSpan::full(&buffer.current_snapshot())])
            .unwrap();
        assert!(tags.is_empty());
        assert_eq!(buffer.subscriber_count(), 0);
    }

    #[test]
    fn attach_scans_and_subscribes_once() {
        let (buffer, tagger) = active("a { b { } }");
        tagger.attach();
        assert_eq!(tagger.ref_count(), 2);
        assert_eq!(buffer.subscriber_count(), 1);
        assert_eq!(tagger.current_tree().unwrap().block_count(), 2);
    }

    #[test]
    fn last_detach_drops_tree_and_subscription() {
        let (buffer, tagger) = active("a { }");
        tagger.attach();
        tagger.detach();
        assert!(tagger.current_tree().is_some());
        tagger.detach();
        assert!(tagger.current_tree().is_none());
        assert_eq!(buffer.subscriber_count(), 0);
        // Extra detach is tolerated.
        tagger.detach();
        assert_eq!(tagger.ref_count(), 0);
    }

    #[test]
    fn query_walks_only_intersecting_blocks() {
        let text = "a { b { } } c { d { } }";
        let (buffer, tagger) = active(text);
        let snapshot = buffer.current_snapshot();
        let at_d = text.find('d').unwrap();
        let tags = tagger
            .get_tags(&[SnapshotSpan::new(snapshot, Span::new(at_d, 1))])
            .unwrap();
        assert_eq!(statements(&tags), vec!["c"]);

        let all = tagger
            .get_tags(&[SnapshotSpan::full(&buffer.current_snapshot())])
            .unwrap();
        assert_eq!(statements(&all), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn empty_query_yields_nothing() {
        let (_buffer, tagger) = active("a { }");
        assert!(tagger.get_tags(&[]).unwrap().is_empty());
    }

    #[test]
    fn unrelated_snapshot_is_rejected() {
        let (_buffer, tagger) = active("a { }");
        let other = TextBuffer::new("x { }").current_snapshot();
        let err = tagger.get_tags(&[SnapshotSpan::full(&other)]).unwrap_err();
        assert!(matches!(err, TaggerError::UnrelatedSnapshot { .. }));
    }

    #[test]
    fn edits_trigger_rescan_and_event() {
        let (buffer, tagger) = active("a { }");
        let events = tagger.tags_changed();
        let after = buffer.insert(0, "z { } ").unwrap();
        assert!(tagger.wait_for_scan(WAIT));

        let event = events.try_recv().unwrap();
        assert_eq!(event.span, SnapshotSpan::full(&after));
        assert_eq!(tagger.current_tree().unwrap().block_count(), 2);
    }

    #[test]
    fn block_at_maps_old_positions() {
        let text = "a { x }";
        let (buffer, tagger) = active(text);
        let old = buffer.current_snapshot();
        buffer.insert(0, "// moved\n").unwrap();
        assert!(tagger.wait_for_scan(WAIT));

        let block = tagger.block_at(&old, text.find('x').unwrap()).unwrap().unwrap();
        assert_eq!(block.statement_text(), "a");
        assert!(tagger.block_at(&old, 0).unwrap().is_none());
    }
}
