//! The widget engine: trigger debouncing around the reconciler
//!
//! Four signal sources feed the engine, each with its own trailing
//! debouncer. A pass runs when any of them fires. When a trigger-driven pass
//! finds the folding model not ready, one retry is scheduled; the retry pass
//! never schedules another.

use bevy::prelude::*;
use std::time::Duration;

use crate::document::DocumentOutline;
use crate::folding::{FoldingProviders, NotebookFoldingProvider, ProviderRegistration};
use crate::gutter::{DecorationHost, GutterDecorationManager, RunRequestSink};
use crate::reconcile::{ReconcileInput, ReconcileReport, Reconciler};
use crate::settings::TriggerSettings;
use crate::types::BlockResults;
use crate::widgets::{Debouncer, ViewZoneHost};

/// Signal sources that schedule a pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    Text,
    Folding,
    Layout,
    Results,
}

/// Why a pass is running
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassOrigin {
    /// A debounced signal fired
    Trigger,
    /// The delayed retry after the folding model was not ready
    Retry,
}

/// Reconciler, gutter manager and their timers for one notebook
#[derive(Resource, Debug)]
pub struct WidgetEngine {
    reconciler: Reconciler,
    gutter: GutterDecorationManager,
    text: Debouncer,
    folding: Debouncer,
    layout: Debouncer,
    results: Debouncer,
    folding_retry: Debouncer,
    registration: Option<ProviderRegistration>,
    passes: u64,
}

impl Default for WidgetEngine {
    fn default() -> Self {
        Self::new(&TriggerSettings::default())
    }
}

impl WidgetEngine {
    pub fn new(settings: &TriggerSettings) -> Self {
        Self {
            reconciler: Reconciler::new(),
            gutter: GutterDecorationManager::new(),
            text: Debouncer::from_millis(settings.text_debounce_ms),
            folding: Debouncer::from_millis(settings.folding_debounce_ms),
            layout: Debouncer::from_millis(settings.layout_debounce_ms),
            results: Debouncer::from_millis(settings.results_debounce_ms),
            folding_retry: Debouncer::from_millis(settings.folding_retry_delay_ms),
            registration: None,
            passes: 0,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    pub fn gutter(&self) -> &GutterDecorationManager {
        &self.gutter
    }

    /// Passes run since creation
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_open(&self) -> bool {
        self.registration.is_some()
    }

    /// Register this engine's folding provider; a no-op when already open
    pub fn open(&mut self, providers: &mut FoldingProviders, now: Duration) {
        if self.registration.is_some() {
            return;
        }
        let registration = providers.register(NotebookFoldingProvider);
        info!("notebook folding provider registered ({})", registration.id());
        self.registration = Some(registration);
        // First pass as soon as the text debounce allows
        self.notify(Trigger::Text, now);
    }

    /// Record a signal; the pass runs once the source's window is quiet
    pub fn notify(&mut self, trigger: Trigger, now: Duration) {
        self.debouncer_mut(trigger).schedule(now);
    }

    pub fn is_pending(&self) -> bool {
        [&self.text, &self.folding, &self.layout, &self.results, &self.folding_retry]
            .iter()
            .any(|debouncer| debouncer.is_pending())
    }

    pub fn retry_pending(&self) -> bool {
        self.folding_retry.is_pending()
    }

    /// Fire elapsed debouncers; `Some` when a pass should run now
    ///
    /// Several sources firing in the same frame collapse into one pass.
    pub fn due(&mut self, now: Duration) -> Option<PassOrigin> {
        let mut triggered = false;
        for debouncer in [&mut self.text, &mut self.folding, &mut self.layout, &mut self.results] {
            triggered |= debouncer.fire(now);
        }
        let retry = self.folding_retry.fire(now);
        match (triggered, retry) {
            (true, _) => {
                // A fresh pass supersedes the pending retry
                self.folding_retry.cancel();
                Some(PassOrigin::Trigger)
            }
            (false, true) => Some(PassOrigin::Retry),
            (false, false) => None,
        }
    }

    /// Run one reconciliation pass
    pub fn run_pass(
        &mut self,
        origin: PassOrigin,
        input: &ReconcileInput<'_>,
        host: &mut dyn ViewZoneHost,
        now: Duration,
    ) -> ReconcileReport {
        self.passes += 1;
        let report = self.reconciler.reconcile(input, host, now);
        if !report.guarded && !report.folding_ready {
            match origin {
                PassOrigin::Trigger => {
                    debug!("folding model not ready, retrying once");
                    self.folding_retry.schedule_once(now);
                }
                PassOrigin::Retry => {
                    debug!("folding model still not ready, waiting for the next change");
                }
            }
        }
        report
    }

    /// Rebuild the gutter glyphs
    pub fn refresh_gutter(
        &mut self,
        outline: &DocumentOutline,
        results: &BlockResults,
        host: &mut dyn DecorationHost,
    ) -> bool {
        self.gutter.refresh(outline, results, host)
    }

    /// Forward a gutter click to the run request sink
    pub fn click_gutter(&self, line: usize, sink: &mut dyn RunRequestSink) -> bool {
        self.gutter.click(line, sink)
    }

    /// Stop timers, release every widget, clear the gutter and give the
    /// folding provider back
    pub fn teardown(
        &mut self,
        host: &mut dyn ViewZoneHost,
        decorations: &mut dyn DecorationHost,
        providers: &mut FoldingProviders,
    ) -> usize {
        for debouncer in [
            &mut self.text,
            &mut self.folding,
            &mut self.layout,
            &mut self.results,
            &mut self.folding_retry,
        ] {
            debouncer.cancel();
        }
        let disposed = self.reconciler.teardown(host);
        self.gutter.clear(decorations);
        if let Some(registration) = self.registration.take() {
            providers.unregister(registration);
        }
        info!("widget engine torn down, {disposed} widgets released");
        disposed
    }

    fn debouncer_mut(&mut self, trigger: Trigger) -> &mut Debouncer {
        match trigger {
            Trigger::Text => &mut self.text,
            Trigger::Folding => &mut self.folding,
            Trigger::Layout => &mut self.layout,
            Trigger::Results => &mut self.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NotebookDocument;
    use crate::gutter::GutterDecoration;
    use crate::settings::{SizingObserverSettings, WidgetSizingSettings};
    use crate::types::{BlockResult, EditorLayout, FoldState};
    use crate::widgets::test_host::RecordingHost;
    use ropey::Rope;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[derive(Default)]
    struct Glyphs(Vec<GutterDecoration>);

    impl DecorationHost for Glyphs {
        fn replace_decorations(&mut self, decorations: &[GutterDecoration]) {
            self.0 = decorations.to_vec();
        }
    }

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
            let text = Rope::from_str("```sql id=a\nselect 1\n```\n");
            let mut folds = FoldState::new();
            folds.rebuild(vec![(0, 2)]);
            Self {
                document: NotebookDocument::scan("nb", &text),
                text,
                layout: EditorLayout {
                    content_width: 500.0,
                    ..Default::default()
                },
                folds,
                results: BlockResults::new(),
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

    #[test]
    fn test_burst_of_signals_runs_one_pass() {
        let mut engine = WidgetEngine::default();
        engine.notify(Trigger::Text, ms(0));
        engine.notify(Trigger::Text, ms(40));
        engine.notify(Trigger::Text, ms(80));

        assert_eq!(engine.due(ms(150)), None);
        assert_eq!(engine.due(ms(180)), Some(PassOrigin::Trigger));
        assert_eq!(engine.due(ms(500)), None);
    }

    #[test]
    fn test_sources_debounce_independently() {
        let mut engine = WidgetEngine::default();
        engine.notify(Trigger::Text, ms(0));
        engine.notify(Trigger::Folding, ms(0));

        // Folding window is shorter
        assert_eq!(engine.due(ms(50)), Some(PassOrigin::Trigger));
        assert!(engine.is_pending());
        assert_eq!(engine.due(ms(100)), Some(PassOrigin::Trigger));
        assert!(!engine.is_pending());
    }

    #[test]
    fn test_folding_not_ready_retries_once() {
        let mut fixture = Fixture::new();
        fixture.folds.ready = false;
        let mut host = RecordingHost::default();
        let mut engine = WidgetEngine::default();

        let report = engine.run_pass(PassOrigin::Trigger, &fixture.input(), &mut host, ms(0));
        assert!(!report.folding_ready);
        assert!(engine.retry_pending());
        assert_eq!(engine.due(ms(299)), None);
        assert_eq!(engine.due(ms(300)), Some(PassOrigin::Retry));

        // Still not ready: no further retry
        engine.run_pass(PassOrigin::Retry, &fixture.input(), &mut host, ms(300));
        assert!(!engine.retry_pending());
        assert_eq!(engine.due(ms(2000)), None);
    }

    #[test]
    fn test_trigger_supersedes_retry() {
        let mut fixture = Fixture::new();
        fixture.folds.ready = false;
        let mut host = RecordingHost::default();
        let mut engine = WidgetEngine::default();
        engine.run_pass(PassOrigin::Trigger, &fixture.input(), &mut host, ms(0));

        engine.notify(Trigger::Results, ms(260));
        assert_eq!(engine.due(ms(310)), Some(PassOrigin::Trigger));
        assert!(!engine.retry_pending());
    }

    #[test]
    fn test_open_registers_once_and_teardown_releases() {
        let mut fixture = Fixture::new();
        fixture.results.set("a", BlockResult::Running);
        let mut providers = FoldingProviders::default();
        let mut host = RecordingHost::default();
        let mut glyphs = Glyphs::default();
        let mut engine = WidgetEngine::default();

        engine.open(&mut providers, ms(0));
        engine.open(&mut providers, ms(0));
        assert_eq!(providers.len(), 1);
        assert!(engine.is_open());

        assert_eq!(engine.due(ms(100)), Some(PassOrigin::Trigger));
        engine.run_pass(PassOrigin::Trigger, &fixture.input(), &mut host, ms(100));
        let outline = DocumentOutline::scan(&fixture.text);
        assert!(engine.refresh_gutter(&outline, &fixture.results, &mut glyphs));
        assert_eq!(glyphs.0.len(), 2);
        assert_eq!(engine.reconciler().published().len(), 1);

        engine.notify(Trigger::Layout, ms(120));
        assert_eq!(engine.teardown(&mut host, &mut glyphs, &mut providers), 1);
        assert!(providers.is_empty());
        assert!(glyphs.0.is_empty());
        assert!(host.targets.is_empty());
        assert!(!engine.is_pending());
        assert!(!engine.is_open());
    }

    #[test]
    fn test_two_engines_register_independently() {
        let mut providers = FoldingProviders::default();
        let mut host = RecordingHost::default();
        let mut glyphs = Glyphs::default();
        let mut first = WidgetEngine::default();
        let mut second = WidgetEngine::default();

        first.open(&mut providers, ms(0));
        second.open(&mut providers, ms(0));
        assert_eq!(providers.len(), 2);

        first.teardown(&mut host, &mut glyphs, &mut providers);
        assert_eq!(providers.len(), 1);
        assert!(second.is_open());
    }
}
