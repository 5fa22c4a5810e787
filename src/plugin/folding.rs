//! Folding: region detection, fold commands and summary actions

use bevy::prelude::*;
use std::collections::BTreeSet;

use crate::document::DocumentOutline;
use crate::engine::WidgetEngine;
use crate::events::{
    CollapseAllRequested, ExpandAllRequested, FocusBlockRequested, FormSurfaceChanged,
    RevealLineRequested, SummaryActionRequested,
};
use crate::folding::{FoldingCommandDispatcher, FoldingProviders};
use crate::types::{FoldState, NotebookBuffer};
use crate::widgets::FormSurface;

/// Configuration surfaces the UI layer currently shows
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct OpenForms {
    pub open: BTreeSet<String>,
}

impl OpenForms {
    pub fn is_open(&self, form_id: &str) -> bool {
        self.open.contains(form_id)
    }
}

/// [`FormSurface`] over [`OpenForms`] that records what changed
struct FormChanges<'a> {
    forms: &'a mut OpenForms,
    changes: Vec<FormSurfaceChanged>,
}

impl FormSurface for FormChanges<'_> {
    fn is_open(&self, form_id: &str) -> bool {
        self.forms.is_open(form_id)
    }

    fn open(&mut self, form_id: &str) {
        if self.forms.open.insert(form_id.to_string()) {
            self.changes.push(FormSurfaceChanged {
                form_id: form_id.to_string(),
                open: true,
            });
        }
    }

    fn close(&mut self, form_id: &str) {
        if self.forms.open.remove(form_id) {
            self.changes.push(FormSurfaceChanged {
                form_id: form_id.to_string(),
                open: false,
            });
        }
    }
}

/// Recompute folding regions from the registered providers
///
/// Runs when the text changes or a provider comes or goes. Regions with an
/// unchanged span keep their collapsed flag.
pub(crate) fn detect_folding_regions(
    buffer: Option<Res<NotebookBuffer>>,
    providers: Res<FoldingProviders>,
    mut fold_state: ResMut<FoldState>,
    mut seen_generation: Local<Option<u64>>,
) {
    let Some(buffer) = buffer else {
        return;
    };
    if fold_state.content_version == buffer.content_version
        && *seen_generation == Some(providers.generation)
    {
        return;
    }

    let ranges = providers.folding_ranges(&buffer.rope);
    fold_state.rebuild(ranges);
    fold_state.content_version = buffer.content_version;
    *seen_generation = Some(providers.generation);
}

pub(crate) fn handle_fold_commands(
    mut collapse: MessageReader<CollapseAllRequested>,
    mut expand: MessageReader<ExpandAllRequested>,
    mut focus: MessageReader<FocusBlockRequested>,
    mut reveal: MessageWriter<RevealLineRequested>,
    mut fold_state: ResMut<FoldState>,
    buffer: Option<Res<NotebookBuffer>>,
) {
    for _ in collapse.read() {
        let count = FoldingCommandDispatcher::collapse_all(&mut *fold_state);
        debug!("collapsed {count} regions");
    }
    for _ in expand.read() {
        let count = FoldingCommandDispatcher::expand_all(&mut *fold_state);
        debug!("expanded {count} regions");
    }

    let requests: Vec<String> = focus.read().map(|r| r.block_id.clone()).collect();
    if requests.is_empty() {
        return;
    }
    let Some(buffer) = buffer else {
        return;
    };
    let outline = DocumentOutline::scan(&buffer.rope);
    for block_id in requests {
        match FoldingCommandDispatcher::reveal_block(&outline, &block_id, &mut *fold_state) {
            Some(line) => {
                reveal.write(RevealLineRequested { line });
            }
            None => debug!("focus: block {block_id} not found in text"),
        }
    }
}

pub(crate) fn handle_summary_actions(
    engine: Res<WidgetEngine>,
    mut actions: MessageReader<SummaryActionRequested>,
    mut fold_state: ResMut<FoldState>,
    mut forms: ResMut<OpenForms>,
    mut changed: MessageWriter<FormSurfaceChanged>,
) {
    if actions.is_empty() {
        return;
    }
    let mut surface = FormChanges {
        forms: &mut *forms,
        changes: Vec::new(),
    };
    for request in actions.read() {
        match engine.reconciler().registry().summary(&request.widget) {
            Some(summary) => summary.perform(request.action, &mut surface, &mut *fold_state),
            None => debug!("summary action for unknown widget {}", request.widget),
        }
    }
    for change in surface.changes {
        changed.write(change);
    }
}
