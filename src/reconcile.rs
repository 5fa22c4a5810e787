//! Reconciliation pass: desired widgets → live handles
//!
//! Each pass recomputes the full desired set from the text, the document
//! model, the block results and the folding regions, then converges the
//! [`WidgetRegistry`] towards it. Existing handles are updated in place; only
//! ids that appear or disappear touch the render-target set, so a pass that
//! changes nothing costs no host calls at all.

use bevy::prelude::*;
use ropey::Rope;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use crate::document::{AnchorTarget, DocumentOutline, NotebookDocument};
use crate::folding::FoldingModelPort;
use crate::settings::{SizingObserverSettings, WidgetSizingSettings};
use crate::types::{BlockResults, EditorLayout};
use crate::widgets::{
    preamble_form_id, DynamicWidget, FixedWidget, FoldingSummaryWidget, SizingPolicy,
    SummaryContent, ViewZoneHost, WatcherConfig, WidgetHandle, WidgetId, WidgetKind,
    WidgetRegistry, WidgetSpec, ZonePlacement,
};

/// Everything a pass reads
pub struct ReconcileInput<'a> {
    /// `None` while no text is loaded
    pub text: Option<&'a Rope>,
    /// `None` while no document model is available
    pub document: Option<&'a NotebookDocument>,
    pub layout: &'a EditorLayout,
    pub folding: &'a dyn FoldingModelPort,
    pub results: &'a BlockResults,
    pub widgets: &'a WidgetSizingSettings,
    pub observer: &'a SizingObserverSettings,
}

/// Output of the pure half of a pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DesiredWidgets {
    pub specs: Vec<WidgetSpec>,
    /// Width every widget is laid out at
    pub width: f32,
    /// False when the folding model had no regions to offer
    pub folding_ready: bool,
}

/// What one pass changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub disposed: usize,
    /// The published id → render target map differs from the previous pass
    pub published_changed: bool,
    pub folding_ready: bool,
    /// The guard tripped: nothing to show, everything was torn down
    pub guarded: bool,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.disposed == 0 && !self.published_changed
    }
}

/// Compute the desired widget set
///
/// Returns `None` when the guard trips (no text, no document, or a layout
/// that has not been measured yet).
pub fn desired_specs(input: &ReconcileInput<'_>) -> Option<DesiredWidgets> {
    let (Some(text), Some(document)) = (input.text, input.document) else {
        return None;
    };
    if !input.layout.is_ready() {
        return None;
    }

    let outline = DocumentOutline::scan(text);
    let width = input.layout.available_width();
    let mut specs = Vec::new();

    if document.has_params() {
        match outline.resolve(AnchorTarget::Preamble) {
            Some(line) => specs.push(WidgetSpec {
                id: WidgetId::parameter_form(),
                anchor_line: line,
                sizing: SizingPolicy::Fixed {
                    height: input.widgets.form_height(document.params.len()),
                },
                kind: WidgetKind::ParameterForm {
                    form_id: preamble_form_id(),
                    param_names: document.params.iter().map(|p| p.name.clone()).collect(),
                },
            }),
            None => debug!("parameter form skipped: preamble not found in text"),
        }
    }

    for block in &document.blocks {
        if input.results.get(&block.id).is_none() {
            continue;
        }
        match outline.resolve(AnchorTarget::Block(&block.id)) {
            Some(line) => specs.push(WidgetSpec {
                id: WidgetId::output(&block.id),
                anchor_line: line,
                sizing: SizingPolicy::Dynamic {
                    min: input.widgets.output_min_height,
                    max: input.widgets.output_max_height.max(input.widgets.output_min_height),
                },
                kind: WidgetKind::OutputViewer {
                    block_id: block.id.clone(),
                },
            }),
            None => debug!("output viewer for {} skipped: block not found in text", block.id),
        }
    }

    let regions = input.folding.regions();
    let folding_ready = regions.is_some();
    for region in regions.iter().flatten().filter(|r| r.collapsed) {
        let first_line = text
            .get_line(region.start_line)
            .map(|line| line.to_string())
            .unwrap_or_default();
        let (id, content) = SummaryContent::resolve(region, &outline, document, &first_line);
        specs.push(WidgetSpec {
            id,
            anchor_line: region.start_line,
            sizing: SizingPolicy::Fixed {
                height: input.widgets.summary_height,
            },
            kind: WidgetKind::FoldingSummary(content),
        });
    }

    Some(DesiredWidgets {
        specs: dedupe(specs),
        width,
        folding_ready,
    })
}

/// Enforce one spec per id and one spec per anchor slot; later specs win
///
/// Summaries sit on their line while the other widgets sit below it, so the
/// two never compete for the same slot.
pub(crate) fn dedupe(specs: Vec<WidgetSpec>) -> Vec<WidgetSpec> {
    let mut by_id: Vec<WidgetSpec> = Vec::with_capacity(specs.len());
    let mut id_slot: HashMap<WidgetId, usize> = HashMap::new();
    for spec in specs {
        match id_slot.get(&spec.id) {
            Some(&index) => {
                warn!("duplicate widget id {}, keeping the later one", spec.id);
                by_id[index] = spec;
            }
            None => {
                id_slot.insert(spec.id.clone(), by_id.len());
                by_id.push(spec);
            }
        }
    }

    let mut winners: HashMap<(usize, bool), usize> = HashMap::new();
    for (index, spec) in by_id.iter().enumerate() {
        let slot = (spec.anchor_line, is_overlay(&spec.kind));
        if let Some(previous) = winners.insert(slot, index) {
            warn!(
                "widgets {} and {} both anchor at line {}, keeping {}",
                by_id[previous].id, spec.id, spec.anchor_line, spec.id
            );
        }
    }
    let keep: HashSet<usize> = winners.into_values().collect();

    by_id
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .map(|(_, spec)| spec)
        .collect()
}

fn is_overlay(kind: &WidgetKind) -> bool {
    matches!(kind, WidgetKind::FoldingSummary(_))
}

/// Owns the live widgets and the last published render-target map
#[derive(Debug, Default)]
pub struct Reconciler {
    registry: WidgetRegistry,
    published: BTreeMap<WidgetId, Entity>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.registry
    }

    /// Render targets as of the last pass
    pub fn published(&self) -> &BTreeMap<WidgetId, Entity> {
        &self.published
    }

    /// Run one pass
    pub fn reconcile(
        &mut self,
        input: &ReconcileInput<'_>,
        host: &mut dyn ViewZoneHost,
        now: Duration,
    ) -> ReconcileReport {
        let Some(desired) = desired_specs(input) else {
            let disposed = self.registry.dispose_all(host);
            let published_changed = self.publish();
            if disposed > 0 {
                debug!("reconcile guard: disposed {disposed} widgets");
            }
            return ReconcileReport {
                disposed,
                published_changed,
                guarded: true,
                ..Default::default()
            };
        };

        let mut report = ReconcileReport {
            folding_ready: desired.folding_ready,
            ..Default::default()
        };

        let wanted: HashSet<&WidgetId> = desired.specs.iter().map(|s| &s.id).collect();
        let stale: Vec<WidgetId> = self
            .registry
            .ids()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if self.registry.dispose(&id, host) {
                report.disposed += 1;
            }
        }

        for spec in desired.specs {
            let compatible = self
                .registry
                .get(&spec.id)
                .map(|handle| fits(handle, &spec));
            match compatible {
                Some(true) => {
                    if let Some(handle) = self.registry.get_mut(&spec.id) {
                        if update(handle, spec, desired.width, host) {
                            report.updated += 1;
                        }
                    }
                }
                Some(false) => {
                    // Sizing variant changed: recreate
                    self.registry.dispose(&spec.id, host);
                    report.disposed += 1;
                    let handle = create(spec, desired.width, input.observer, host, now);
                    self.registry.insert(handle, host);
                    report.created += 1;
                }
                None => {
                    let handle = create(spec, desired.width, input.observer, host, now);
                    self.registry.insert(handle, host);
                    report.created += 1;
                }
            }
        }

        report.published_changed = self.publish();
        if !report.is_noop() {
            debug!(
                "reconcile: {} created, {} updated, {} disposed",
                report.created, report.updated, report.disposed
            );
        }
        report
    }

    /// Dispose every handle and publish the empty set
    pub fn teardown(&mut self, host: &mut dyn ViewZoneHost) -> usize {
        let disposed = self.registry.dispose_all(host);
        self.publish();
        disposed
    }

    fn publish(&mut self) -> bool {
        let targets = self.registry.render_targets();
        if targets == self.published {
            return false;
        }
        self.published = targets;
        true
    }
}

/// Whether an existing handle can be updated in place to match `spec`
fn fits(handle: &WidgetHandle, spec: &WidgetSpec) -> bool {
    match (handle, &spec.sizing, &spec.kind) {
        (WidgetHandle::Summary(_), SizingPolicy::Fixed { .. }, WidgetKind::FoldingSummary(_)) => {
            true
        }
        (WidgetHandle::Fixed(_), SizingPolicy::Fixed { .. }, kind) => !is_overlay(kind),
        (WidgetHandle::Dynamic(_), SizingPolicy::Dynamic { .. }, kind) => !is_overlay(kind),
        _ => false,
    }
}

fn update(handle: &mut WidgetHandle, spec: WidgetSpec, width: f32, host: &mut dyn ViewZoneHost) -> bool {
    match (handle, spec.sizing, spec.kind) {
        (WidgetHandle::Summary(widget), SizingPolicy::Fixed { height }, WidgetKind::FoldingSummary(content)) => {
            widget.update(host, content, height, width)
        }
        (WidgetHandle::Fixed(widget), SizingPolicy::Fixed { height }, kind) => {
            let moved = widget.update(host, spec.anchor_line, Some(height), width);
            widget.set_kind(host, kind) || moved
        }
        (WidgetHandle::Dynamic(widget), SizingPolicy::Dynamic { min, max }, kind) => {
            let moved = widget.update(host, spec.anchor_line, width, min, max);
            widget.set_kind(host, kind) || moved
        }
        _ => false,
    }
}

fn create(
    spec: WidgetSpec,
    width: f32,
    observer: &SizingObserverSettings,
    host: &mut dyn ViewZoneHost,
    now: Duration,
) -> WidgetHandle {
    match (spec.sizing, spec.kind) {
        (SizingPolicy::Fixed { height }, WidgetKind::FoldingSummary(content)) => {
            let mut widget = FoldingSummaryWidget::new(spec.id, content, height, width);
            widget.attach(host);
            WidgetHandle::Summary(widget)
        }
        (SizingPolicy::Fixed { height }, kind) => {
            let placement = ZonePlacement::below(spec.anchor_line, height, width);
            let mut widget = FixedWidget::new(spec.id, kind, placement);
            widget.attach(host);
            WidgetHandle::Fixed(widget)
        }
        (SizingPolicy::Dynamic { min, max }, kind) => {
            let config = WatcherConfig::new(min, max, observer);
            let mut widget = DynamicWidget::new(spec.id, kind, spec.anchor_line, width, config);
            widget.attach(host, now);
            WidgetHandle::Dynamic(widget)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentOutline, NotebookDocument};
    use crate::gutter::{compute, GutterDecoration, GutterMarker, GutterStatus};
    use crate::types::{BlockResult, FoldState, OutputClaim};
    use crate::widgets::test_host::{HostCall, RecordingHost};
    use crate::widgets::{WidgetKindTag, ZoneAnchor};

    const TEXT: &str = "---\n\
params:\n\
  - region\n\
---\n\
```sql id=q1 name=\"Revenue\"\n\
select 1\n\
```\n\
```python id=q2\n\
print(2)\n\
print(3)\n\
```\n";

    struct Fixture {
        text: Rope,
        document: NotebookDocument,
        layout: EditorLayout,
        folds: FoldState,
        results: BlockResults,
        widgets: WidgetSizingSettings,
        observer: SizingObserverSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let text = Rope::from_str(TEXT);
            let document = NotebookDocument::scan("sales", &text);
            let mut folds = FoldState::new();
            folds.rebuild(vec![(0, 3), (4, 6), (7, 10)]);
            let mut results = BlockResults::new();
            results.set(
                "q1",
                BlockResult::Success {
                    output: OutputClaim {
                        key: "out-1".into(),
                        content_type: "table".into(),
                    },
                },
            );
            Self {
                text,
                document,
                layout: EditorLayout {
                    content_width: 800.0,
                    scrollbar_width: 14.0,
                    ..Default::default()
                },
                folds,
                results,
                widgets: WidgetSizingSettings::default(),
                observer: SizingObserverSettings::default(),
            }
        }

        fn input(&self) -> ReconcileInput<'_> {
            ReconcileInput {
                text: Some(&self.text),
                document: Some(&self.document),
                layout: &self.layout,
                folding: &self.folds,
                results: &self.results,
                widgets: &self.widgets,
                observer: &self.observer,
            }
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn ids(reconciler: &Reconciler) -> Vec<String> {
        reconciler.registry().ids().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_desired_specs_for_document() {
        let mut fixture = Fixture::new();
        fixture.folds.toggle_fold_at_line(7);
        let desired = desired_specs(&fixture.input()).unwrap();

        assert_eq!(desired.width, 786.0);
        assert!(desired.folding_ready);
        let summary: Vec<_> = desired
            .specs
            .iter()
            .map(|s| (s.id.to_string(), s.anchor_line, s.kind.tag()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("params".to_string(), 3, WidgetKindTag::ParameterForm),
                ("output:q1".to_string(), 6, WidgetKindTag::OutputViewer),
                ("fold:block:q2".to_string(), 7, WidgetKindTag::FoldingSummary),
            ]
        );
        assert_eq!(desired.specs[0].sizing, SizingPolicy::Fixed { height: 92.0 });
        assert_eq!(
            desired.specs[1].sizing,
            SizingPolicy::Dynamic { min: 48.0, max: 480.0 }
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut fixture = Fixture::new();
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();

        let report = reconciler.reconcile(&fixture.input(), &mut host, ms(0));
        assert_eq!(report.created, 2);
        assert!(report.published_changed);
        assert_eq!(ids(&reconciler), vec!["output:q1", "params"]);

        // Collapse the block that has a result: a summary joins form and output
        let params_target = reconciler.published()[&WidgetId::parameter_form()];
        let output_target = reconciler.published()[&WidgetId::output("q1")];
        fixture.folds.toggle_fold_at_line(4);
        let calls_before = host.calls.len();
        let report = reconciler.reconcile(&fixture.input(), &mut host, ms(200));
        assert_eq!((report.created, report.updated, report.disposed), (1, 0, 0));
        assert_eq!(host.calls.len(), calls_before + 2);
        assert_eq!(ids(&reconciler), vec!["fold:block:q1", "output:q1", "params"]);

        let summary = reconciler.registry().summary(&WidgetId::new("fold:block:q1")).unwrap();
        assert_eq!(summary.content().title, "Revenue");
        assert_eq!(summary.content().subtitle.as_deref(), Some("sql"));
        assert_eq!(summary.placement().line, 4);
        assert_eq!(summary.placement().anchor, ZoneAnchor::Overlay);

        // Gutter: run-all, then complete for q1 and runnable for q2
        let outline = DocumentOutline::scan(&fixture.text);
        let decorations = compute(&outline, &fixture.results);
        assert_eq!(
            decorations,
            vec![
                GutterDecoration {
                    line: 0,
                    marker: GutterMarker::RunAll,
                },
                GutterDecoration {
                    line: 4,
                    marker: GutterMarker::Block {
                        id: "q1".into(),
                        status: GutterStatus::Complete,
                    },
                },
                GutterDecoration {
                    line: 7,
                    marker: GutterMarker::Block {
                        id: "q2".into(),
                        status: GutterStatus::Runnable,
                    },
                },
            ]
        );

        // Expand again: only the summary is disposed
        fixture.folds.toggle_fold_at_line(4);
        let calls_before = host.calls.len();
        let report = reconciler.reconcile(&fixture.input(), &mut host, ms(400));
        assert_eq!((report.created, report.updated, report.disposed), (0, 0, 1));
        assert_eq!(host.count(|c| matches!(c, HostCall::RemoveZone(..))), 1);
        assert_eq!(host.calls.len(), calls_before + 2);
        assert_eq!(ids(&reconciler), vec!["output:q1", "params"]);
        assert_eq!(reconciler.published()[&WidgetId::parameter_form()], params_target);
        assert_eq!(reconciler.published()[&WidgetId::output("q1")], output_target);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut fixture = Fixture::new();
        fixture.folds.toggle_fold_at_line(0);
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();

        reconciler.reconcile(&fixture.input(), &mut host, ms(0));
        let calls = host.calls.len();
        let report = reconciler.reconcile(&fixture.input(), &mut host, ms(10));

        assert!(report.is_noop());
        assert_eq!(host.calls.len(), calls);
    }

    #[test]
    fn test_guard_disposes_everything() {
        let fixture = Fixture::new();
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&fixture.input(), &mut host, ms(0));

        let mut input = fixture.input();
        input.document = None;
        let report = reconciler.reconcile(&input, &mut host, ms(10));

        assert!(report.guarded);
        assert_eq!(report.disposed, 2);
        assert!(report.published_changed);
        assert!(reconciler.published().is_empty());
        assert!(host.targets.is_empty());

        let unmeasured = EditorLayout::default();
        let mut input = fixture.input();
        input.layout = &unmeasured;
        assert!(desired_specs(&input).is_none());
    }

    #[test]
    fn test_folding_not_ready_drops_summaries() {
        let mut fixture = Fixture::new();
        fixture.folds.toggle_fold_at_line(4);
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&fixture.input(), &mut host, ms(0));
        assert!(reconciler.registry().contains(&WidgetId::new("fold:block:q1")));

        fixture.folds.ready = false;
        let report = reconciler.reconcile(&fixture.input(), &mut host, ms(10));
        assert!(!report.folding_ready);
        assert!(!reconciler.registry().contains(&WidgetId::new("fold:block:q1")));
        assert!(reconciler.registry().contains(&WidgetId::parameter_form()));
    }

    #[test]
    fn test_edits_update_in_place() {
        let mut fixture = Fixture::new();
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&fixture.input(), &mut host, ms(0));
        let output_target = reconciler.published()[&WidgetId::output("q1")];

        // Two lines typed into q1 push its closing fence down
        fixture.text = Rope::from_str(&TEXT.replace("select 1\n", "select 1\nunion\nselect 2\n"));
        fixture.layout.content_width = 600.0;
        let report = reconciler.reconcile(&fixture.input(), &mut host, ms(500));

        assert_eq!((report.created, report.disposed), (0, 0));
        assert_eq!(report.updated, 2);
        assert!(!report.published_changed);
        let output = reconciler.registry().get(&WidgetId::output("q1")).unwrap();
        assert_eq!(output.render_target(), Some(output_target));
        assert_eq!(output.anchor_line(), 8);
        assert_eq!(output.placement().width, 586.0);
    }

    #[test]
    fn test_missing_anchor_skips_widget() {
        let mut fixture = Fixture::new();
        // The model still knows q1, but the text no longer has it
        fixture.text = Rope::from_str("---\nparams:\n  - region\n---\nplain text\n");
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&fixture.input(), &mut host, ms(0));

        assert_eq!(ids(&reconciler), vec!["params"]);
    }

    #[test]
    fn test_summary_count_matches_collapsed_regions() {
        let mut fixture = Fixture::new();
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();

        for line in [0, 4, 7, 4, 0, 7] {
            fixture.folds.toggle_fold_at_line(line);
            reconciler.reconcile(&fixture.input(), &mut host, ms(0));
            let collapsed = fixture.folds.regions.iter().filter(|r| r.collapsed).count();
            let summaries = reconciler
                .registry()
                .iter()
                .filter(|(_, h)| h.kind_tag() == WidgetKindTag::FoldingSummary)
                .count();
            assert_eq!(summaries, collapsed);
        }
    }

    #[test]
    fn test_dedupe_later_wins() {
        let spec = |id: &str, line: usize| WidgetSpec {
            id: WidgetId::new(id),
            anchor_line: line,
            sizing: SizingPolicy::Fixed { height: 10.0 },
            kind: WidgetKind::OutputViewer { block_id: id.into() },
        };

        let kept = dedupe(vec![spec("a", 1), spec("b", 1), spec("c", 2), spec("c", 3)]);
        let kept: Vec<_> = kept.iter().map(|s| (s.id.to_string(), s.anchor_line)).collect();
        assert_eq!(kept, vec![("b".to_string(), 1), ("c".to_string(), 3)]);
    }

    #[test]
    fn test_teardown_releases_all() {
        let mut fixture = Fixture::new();
        fixture.folds.toggle_fold_at_line(4);
        let mut host = RecordingHost::default();
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&fixture.input(), &mut host, ms(0));

        assert_eq!(reconciler.teardown(&mut host), 3);
        assert!(host.targets.is_empty());
        assert!(host.zones.is_empty());
        assert_eq!(host.count(|c| matches!(c, HostCall::DestroyTarget(..))), 3);
    }
}
