use std::path::PathBuf;

use anyhow::Result;
use brace_blocks_engine::text::{Span, SpanTrackingMode, TextLine};
use brace_blocks_engine::{
    BlockContextSource, CancellationToken, ContextTask, SnapshotSpan, TaggerHandle,
    TaggerRegistry, TextBuffer, TextSnapshot,
};

/// Viewer state: one buffer, its tagger and the caret line.
pub struct App {
    pub path: PathBuf,
    buffer: TextBuffer,
    tagger: TaggerHandle,
    contexts: BlockContextSource,
    pub caret_line: usize,
    pub breadcrumb: String,
    pending_context: Option<(CancellationToken, ContextTask)>,
    /// Caret offset and buffer version the breadcrumb was requested for.
    context_key: Option<(usize, u64)>,
    pub status: String,
}

impl App {
    pub fn new(path: PathBuf, buffer: TextBuffer, registry: &TaggerRegistry) -> Self {
        let tagger = registry.attach(&buffer);
        let contexts = BlockContextSource::new(buffer.clone());
        Self {
            path,
            buffer,
            tagger,
            contexts,
            caret_line: 0,
            breadcrumb: String::new(),
            pending_context: None,
            context_key: None,
            status: "scanning...".to_string(),
        }
    }

    pub fn snapshot(&self) -> TextSnapshot {
        self.buffer.current_snapshot()
    }

    fn caret(&self) -> TextLine {
        let snapshot = self.snapshot();
        let last = snapshot.line_count() - 1;
        let number = self.caret_line.min(last);
        snapshot
            .line_from_line_number(number)
            .unwrap_or_else(|| snapshot.line_from_position(snapshot.len()))
    }

    pub fn caret_offset(&self) -> usize {
        let line = self.caret();
        // First non-blank character, so a caret on an indented line sits
        // inside the block rather than on its margin.
        let indent = line.text.len() - line.text.trim_start().len();
        line.start() + indent
    }

    pub fn move_down(&mut self) {
        if self.caret_line + 1 < self.snapshot().line_count() {
            self.caret_line += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.caret_line = self.caret_line.saturating_sub(1);
    }

    /// Opens an empty line below the caret and moves onto it.
    pub fn insert_line(&mut self) -> Result<()> {
        let line = self.caret();
        self.buffer.insert(line.end(), "\n")?;
        self.caret_line = line.number + 1;
        Ok(())
    }

    /// Deletes the caret line including its line break.
    pub fn delete_line(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        let line = self.caret();
        let mut span = line.extent_including_line_break;
        if span.end == line.end() && line.number > 0 {
            // Last line: take the preceding break instead.
            if let Some(previous) = snapshot.line_from_line_number(line.number - 1) {
                span = Span::from_bounds(previous.end(), line.end());
            }
        }
        if span.is_empty() {
            return Ok(());
        }
        self.buffer.delete(span)?;
        let last = self.snapshot().line_count() - 1;
        self.caret_line = self.caret_line.min(last);
        Ok(())
    }

    /// Publishes finished scans and keeps the breadcrumb in step with the
    /// caret. Called once per frame.
    pub fn tick(&mut self) {
        if self.tagger.process_events() {
            let blocks = self
                .tagger
                .current_tree()
                .map(|tree| tree.block_count())
                .unwrap_or_default();
            self.status = format!("{blocks} blocks");
            self.context_key = None;
        }

        let finished = self
            .pending_context
            .as_ref()
            .is_some_and(|(_, task)| task.is_finished());
        if finished
            && let Some((_, task)) = self.pending_context.take()
            && let Some(context) = task.join()
        {
            self.breadcrumb = context.content;
        }

        let snapshot = self.snapshot();
        let key = (self.caret_offset(), snapshot.version().number());
        if self.context_key != Some(key) {
            self.context_key = Some(key);
            self.request_context(&snapshot, key.0);
        }
    }

    fn request_context(&mut self, snapshot: &TextSnapshot, offset: usize) {
        if let Some((token, _)) = self.pending_context.take() {
            token.cancel();
        }

        match self.tagger.block_at(snapshot, offset) {
            Ok(Some(block)) => {
                let token = CancellationToken::new();
                let task = self
                    .contexts
                    .get_block_context(block, &self.buffer, token.clone());
                self.pending_context = Some((token, task));
            }
            Ok(None) => self.breadcrumb.clear(),
            Err(err) => {
                tracing::warn!(error = %err, "block lookup failed");
                self.breadcrumb.clear();
            }
        }
    }

    /// Nesting depth at the start of each of `count` lines from `first`,
    /// taken from the tagger's blocks mapped into the current snapshot.
    pub fn gutter_depths(&self, first: usize, count: usize) -> Vec<usize> {
        let snapshot = self.snapshot();
        let lines: Vec<TextLine> = (first..first + count)
            .map_while(|number| snapshot.line_from_line_number(number))
            .collect();
        let (Some(top), Some(bottom)) = (lines.first(), lines.last()) else {
            return Vec::new();
        };

        let view = SnapshotSpan::new(
            snapshot.clone(),
            Span::from_bounds(top.start(), bottom.extent_including_line_break.end),
        );
        let spans: Vec<Span> = match self.tagger.get_tags(&[view]) {
            Ok(tags) => tags
                .iter()
                .filter_map(|tag| {
                    tag.span
                        .translate_to(&snapshot, SpanTrackingMode::EdgeExclusive)
                        .ok()
                })
                .map(|span| span.span)
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "tag query failed");
                Vec::new()
            }
        };

        lines
            .iter()
            .map(|line| {
                let at = line.start() + (line.text.len() - line.text.trim_start().len());
                spans.iter().filter(|span| span.contains(at)).count()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "class C\n{\n    void M() {\n        x();\n    }\n}\n";

    fn settled(text: &str) -> (TaggerRegistry, App) {
        let registry = TaggerRegistry::new();
        let app = App::new(PathBuf::from("C.cs"), TextBuffer::new(text), &registry);
        assert!(app.tagger.wait_for_scan(std::time::Duration::from_secs(5)));
        (registry, app)
    }

    fn settle_breadcrumb(app: &mut App) {
        app.tick();
        if let Some((_, task)) = app.pending_context.take()
            && let Some(context) = task.join()
        {
            app.breadcrumb = context.content;
        }
    }

    #[test]
    fn breadcrumb_follows_the_caret() {
        let (_registry, mut app) = settled(SOURCE);
        app.caret_line = 3;
        settle_breadcrumb(&mut app);
        assert_eq!(app.breadcrumb, "class C\n     void M() {");

        app.caret_line = 0;
        settle_breadcrumb(&mut app);
        assert_eq!(app.breadcrumb, "");
    }

    #[test]
    fn gutter_counts_enclosing_blocks() {
        let (_registry, app) = settled(SOURCE);
        assert_eq!(app.gutter_depths(0, 10), vec![0, 1, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn insert_and_delete_lines_edit_the_buffer() {
        let (_registry, mut app) = settled("a {\n}");
        app.insert_line().unwrap();
        assert_eq!(app.caret_line, 1);
        assert_eq!(app.snapshot().text(), "a {\n\n}");

        app.move_down();
        app.delete_line().unwrap();
        assert_eq!(app.snapshot().text(), "a {\n");
        assert_eq!(app.caret_line, 1);

        app.delete_line().unwrap();
        assert_eq!(app.snapshot().text(), "a {");
        assert_eq!(app.caret_line, 0);
    }

    #[test]
    fn caret_stays_inside_the_document() {
        let (_registry, mut app) = settled("one\ntwo");
        app.move_up();
        assert_eq!(app.caret_line, 0);
        app.move_down();
        app.move_down();
        assert_eq!(app.caret_line, 1);
    }
}
