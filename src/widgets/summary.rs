//! Summary overlay shown on a collapsed folding region

use bevy::prelude::*;

use super::{FixedWidget, HandleState, ViewZoneHost, WidgetId, WidgetKind, ZonePlacement};
use crate::document::{AnchorIdentity, DocumentOutline, NotebookDocument};
use crate::folding::FoldingModelPort;
use crate::types::FoldingRegion;

/// What a collapsed region's summary displays
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryContent {
    pub title: String,
    pub subtitle: Option<String>,
    /// Configuration surface opened by the primary action
    pub form_id: Option<String>,
    /// Start line of the backing region (the line the summary sits on)
    pub region_start: usize,
    pub hidden_lines: usize,
}

impl SummaryContent {
    /// Resolve title and subtitle for a collapsed region
    ///
    /// Preamble: document name. Block: display name (or id) with the engine
    /// tag. Anything else: the region's first line and its hidden line count.
    pub fn resolve(
        region: &FoldingRegion,
        outline: &DocumentOutline,
        document: &NotebookDocument,
        first_line: &str,
    ) -> (WidgetId, Self) {
        let hidden_lines = region.end_line.saturating_sub(region.start_line);
        let identity = outline.identify(region.start_line);

        match identity {
            Some(AnchorIdentity::Preamble) => (
                WidgetId::new("fold:preamble"),
                Self {
                    title: document.name.clone(),
                    subtitle: (!document.params.is_empty())
                        .then(|| format!("{} parameters", document.params.len())),
                    form_id: Some(preamble_form_id()),
                    region_start: region.start_line,
                    hidden_lines,
                },
            ),
            Some(AnchorIdentity::Block(block_id)) => {
                let (title, engine) = match document.block(&block_id) {
                    Some(block) => (block.display_name().to_string(), block.engine.clone()),
                    None => {
                        // Outline knows the block but the model has not caught up yet
                        let engine = outline
                            .identified_fences()
                            .find(|(id, _)| *id == block_id)
                            .map(|(_, fence)| fence.engine.clone())
                            .unwrap_or_default();
                        (block_id.clone(), engine)
                    }
                };
                (
                    WidgetId::new(format!("fold:block:{block_id}")),
                    Self {
                        title,
                        subtitle: (!engine.is_empty()).then_some(engine),
                        form_id: Some(block_form_id(&block_id)),
                        region_start: region.start_line,
                        hidden_lines,
                    },
                )
            }
            None => (
                WidgetId::new(format!("fold:line:{}", region.start_line)),
                Self {
                    title: first_line.trim().to_string(),
                    subtitle: Some(format!("{hidden_lines} lines")),
                    form_id: None,
                    region_start: region.start_line,
                    hidden_lines,
                },
            ),
        }
    }
}

/// Form id of the preamble's parameter surface
pub fn preamble_form_id() -> String {
    "params-form".to_string()
}

/// Form id of a block's configuration surface
pub fn block_form_id(block_id: &str) -> String {
    format!("{block_id}-form")
}

/// The UI layer's configuration panels
pub trait FormSurface {
    fn is_open(&self, form_id: &str) -> bool;
    fn open(&mut self, form_id: &str);
    fn close(&mut self, form_id: &str);
}

/// Actions a summary exposes to the UI layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SummaryAction {
    /// Open the associated configuration surface
    Primary,
    /// Expand the region, closing the associated surface first
    Raw,
}

/// Fixed-size overlay sitting on a collapsed region's start line
///
/// Only the part taller than one line is reserved, so the summary covers the
/// collapsed line instead of pushing the rest of the document down by its
/// full height.
#[derive(Debug)]
pub struct FoldingSummaryWidget {
    inner: FixedWidget,
    content: SummaryContent,
}

impl FoldingSummaryWidget {
    pub fn new(id: WidgetId, content: SummaryContent, height: f32, width: f32) -> Self {
        let placement = ZonePlacement::overlay(content.region_start, height, width);
        Self {
            inner: FixedWidget::new(id, WidgetKind::FoldingSummary(content.clone()), placement),
            content,
        }
    }

    pub fn id(&self) -> &WidgetId {
        self.inner.id()
    }

    pub fn content(&self) -> &SummaryContent {
        &self.content
    }

    pub fn state(&self) -> HandleState {
        self.inner.state()
    }

    pub fn render_target(&self) -> Option<Entity> {
        self.inner.render_target()
    }

    pub fn placement(&self) -> &ZonePlacement {
        self.inner.placement()
    }

    pub fn current_height(&self) -> f32 {
        self.inner.current_height()
    }

    pub fn attach(&mut self, host: &mut dyn ViewZoneHost) {
        self.inner.attach(host);
    }

    /// Follow the region and refresh the resolved titles
    pub fn update(
        &mut self,
        host: &mut dyn ViewZoneHost,
        content: SummaryContent,
        height: f32,
        width: f32,
    ) -> bool {
        let moved = self.inner.update(host, content.region_start, Some(height), width);
        let changed = content != self.content;
        if changed {
            self.content = content.clone();
            self.inner.set_kind(host, WidgetKind::FoldingSummary(content));
        }
        moved || changed
    }

    /// Run one of the summary's actions
    ///
    /// The raw action closes an open form before expanding, so no panel is
    /// left pointing at hidden lines.
    pub fn perform(
        &self,
        action: SummaryAction,
        forms: &mut dyn FormSurface,
        folding: &mut dyn FoldingModelPort,
    ) {
        match action {
            SummaryAction::Primary => {
                if let Some(form_id) = &self.content.form_id {
                    forms.open(form_id);
                }
            }
            SummaryAction::Raw => {
                if let Some(form_id) = &self.content.form_id {
                    if forms.is_open(form_id) {
                        forms.close(form_id);
                    }
                }
                folding.expand_at_lines(&[self.content.region_start]);
            }
        }
    }

    pub fn dispose(&mut self, host: &mut dyn ViewZoneHost) {
        self.inner.dispose(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::types::FoldState;
    use crate::widgets::test_host::RecordingHost;
    use ropey::Rope;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Forms {
        open: HashSet<String>,
        log: Vec<String>,
    }

    impl FormSurface for Forms {
        fn is_open(&self, form_id: &str) -> bool {
            self.open.contains(form_id)
        }

        fn open(&mut self, form_id: &str) {
            self.open.insert(form_id.to_string());
            self.log.push(format!("open {form_id}"));
        }

        fn close(&mut self, form_id: &str) {
            self.open.remove(form_id);
            self.log.push(format!("close {form_id}"));
        }
    }

    const TEXT: &str = "---\nparams:\n  - day\n---\n```sql id=q1 name=\"Daily\"\nselect 1\n```\n```sql id=q2\nselect 2\n```\nplain\n  nested\n";

    fn document() -> (DocumentOutline, NotebookDocument) {
        let text = Rope::from_str(TEXT);
        let outline = DocumentOutline::scan(&text);
        let mut document = NotebookDocument::from_outline("sales", &outline);
        // The model may lag behind the text
        document.blocks.retain(|b: &Block| b.id != "q2");
        (outline, document)
    }

    fn collapsed(start: usize, end: usize) -> FoldingRegion {
        FoldingRegion {
            index: 0,
            start_line: start,
            end_line: end,
            collapsed: true,
        }
    }

    #[test]
    fn test_resolve_titles() {
        let (outline, document) = document();

        let (id, preamble) = SummaryContent::resolve(&collapsed(0, 3), &outline, &document, "---");
        assert_eq!(id.as_str(), "fold:preamble");
        assert_eq!(preamble.title, "sales");
        assert_eq!(preamble.form_id.as_deref(), Some("params-form"));

        let (id, block) = SummaryContent::resolve(&collapsed(4, 6), &outline, &document, "");
        assert_eq!(id.as_str(), "fold:block:q1");
        assert_eq!(block.title, "Daily");
        assert_eq!(block.subtitle.as_deref(), Some("sql"));
        assert_eq!(block.form_id.as_deref(), Some("q1-form"));

        let (_, lagging) = SummaryContent::resolve(&collapsed(7, 9), &outline, &document, "");
        assert_eq!(lagging.title, "q2");
        assert_eq!(lagging.subtitle.as_deref(), Some("sql"));

        let (id, plain) = SummaryContent::resolve(&collapsed(10, 11), &outline, &document, "plain ");
        assert_eq!(id.as_str(), "fold:line:10");
        assert_eq!(plain.title, "plain");
        assert_eq!(plain.subtitle.as_deref(), Some("1 lines"));
        assert_eq!(plain.form_id, None);
    }

    #[test]
    fn test_overlay_placement() {
        let (outline, document) = document();
        let (id, content) = SummaryContent::resolve(&collapsed(4, 6), &outline, &document, "");
        let mut host = RecordingHost::default();
        let mut widget = FoldingSummaryWidget::new(id, content, 28.0, 500.0);
        widget.attach(&mut host);

        let placement = host.zone_for(widget.render_target().unwrap()).unwrap();
        assert_eq!(placement.line, 4);
        assert_eq!(placement.anchor, crate::widgets::ZoneAnchor::Overlay);
    }

    #[test]
    fn test_raw_action_closes_form_then_expands() {
        let (outline, document) = document();
        let (id, content) = SummaryContent::resolve(&collapsed(4, 6), &outline, &document, "");
        let widget = FoldingSummaryWidget::new(id, content, 28.0, 500.0);

        let mut folds = FoldState::new();
        folds.rebuild(vec![(0, 3), (4, 6)]);
        folds.toggle_fold_at_line(4);
        let mut forms = Forms::default();

        widget.perform(SummaryAction::Primary, &mut forms, &mut folds);
        assert!(forms.is_open("q1-form"));
        assert!(folds.region_at_line(4).unwrap().collapsed);

        widget.perform(SummaryAction::Raw, &mut forms, &mut folds);
        assert_eq!(forms.log, vec!["open q1-form", "close q1-form"]);
        assert!(!folds.region_at_line(4).unwrap().collapsed);
    }
}
