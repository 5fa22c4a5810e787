//! Notebook widgets example
//!
//! Shows the embedded widgets over a small notebook document:
//! - A parameter form under the front-matter
//! - An output viewer under every block that has run
//! - Summaries over collapsed regions (click to open the block's form,
//!   shift-click to expand)
//! - Run glyphs in the gutter (click to run a block, or all of them)
//!
//! Keys: `C` collapse all, `E` expand all, `R` reload the results from JSON,
//! `W` close or reopen the notebook.

use bevy::prelude::*;
use bevy_notebook_widgets::prelude::*;
use std::time::Duration;

const NOTEBOOK: &str = r#"---
title: Weekly sales
params:
  - region: EU
  - limit: 10
---
```sql id=totals name="Totals by region"
select region, sum(amount)
from sales
group by region
```

```python id=chart name="Revenue chart"
plot(totals)
```

```sql id=broken
select * from missing_table
```
"#;

const RESULTS_JSON: &str = r#"{
    "totals": { "status": "success", "output": { "key": "totals/1", "content_type": "table" } },
    "broken": { "status": "error", "message": "relation \"missing_table\" does not exist" }
}"#;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Bevy Notebook Widgets".to_string(),
                resolution: (1200, 800).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(NotebookWidgetsPlugin::default())
        .insert_resource(NotebookBuffer::new(NOTEBOOK))
        .init_resource::<FakeExecutor>()
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                track_window_width,
                handle_keys,
                run_requested_blocks,
                finish_runs,
                draw_text_lines,
                fill_forms,
                fill_outputs,
                fill_summaries,
                click_summaries,
            ),
        )
        .run();
}

/// Blocks "executing" and when they finish
#[derive(Resource, Default)]
struct FakeExecutor {
    running: Vec<(String, Duration)>,
}

#[derive(Component)]
struct TextLine(usize);

#[derive(Component)]
struct TargetContent;

fn setup(mut commands: Commands, mut document: ResMut<NotebookDocument>) {
    commands.spawn(Camera2d);
    document.name = "Weekly sales".to_string();
}

fn track_window_width(windows: Query<&Window>, mut layout: ResMut<EditorLayout>) {
    let Ok(window) = windows.single() else {
        return;
    };
    layout.set_if_neq(EditorLayout {
        content_width: window.width(),
        ..*layout
    });
}

fn handle_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut collapse: MessageWriter<CollapseAllRequested>,
    mut expand: MessageWriter<ExpandAllRequested>,
    mut opened: MessageWriter<NotebookOpened>,
    mut closed: MessageWriter<NotebookClosed>,
    mut results: ResMut<BlockResults>,
    mut is_open: Local<Option<bool>>,
) {
    if keys.just_pressed(KeyCode::KeyC) {
        collapse.write(CollapseAllRequested);
    }
    if keys.just_pressed(KeyCode::KeyE) {
        expand.write(ExpandAllRequested);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        match results.apply_json(RESULTS_JSON) {
            Ok(count) => info!("loaded {count} results"),
            Err(e) => warn!("bad results snapshot: {e}"),
        }
    }
    if keys.just_pressed(KeyCode::KeyW) {
        let open = is_open.get_or_insert(true);
        if *open {
            closed.write(NotebookClosed);
        } else {
            opened.write(NotebookOpened);
        }
        *open = !*open;
    }
}

fn run_requested_blocks(
    time: Res<Time>,
    document: Res<NotebookDocument>,
    mut requests: MessageReader<RunRequested>,
    mut executor: ResMut<FakeExecutor>,
    mut results: ResMut<BlockResults>,
) {
    for request in requests.read() {
        let ids: Vec<String> = match &request.target {
            RunTarget::Block(id) => vec![id.clone()],
            RunTarget::All => document.blocks.iter().map(|b| b.id.clone()).collect(),
        };
        for id in ids {
            info!("running {id}");
            results.set(id.clone(), BlockResult::Running);
            executor
                .running
                .push((id, time.elapsed() + Duration::from_millis(800)));
        }
    }
}

fn finish_runs(time: Res<Time>, mut executor: ResMut<FakeExecutor>, mut results: ResMut<BlockResults>) {
    let now = time.elapsed();
    let (done, running): (Vec<_>, Vec<_>) = executor
        .running
        .drain(..)
        .partition(|(_, finish_at)| *finish_at <= now);
    executor.running = running;

    for (id, _) in done {
        let result = if id == "broken" {
            BlockResult::Error {
                message: "relation \"missing_table\" does not exist".to_string(),
                trace: None,
            }
        } else {
            BlockResult::Success {
                output: OutputClaim {
                    key: format!("{id}/latest"),
                    content_type: "table".to_string(),
                },
            }
        };
        results.set(id, result);
    }
}

/// Draw the document text around the reserved zones
fn draw_text_lines(
    mut commands: Commands,
    buffer: Res<NotebookBuffer>,
    layout: Res<EditorLayout>,
    layout_map: Res<NotebookLayoutMap>,
    fold_state: Res<FoldState>,
    mut lines: Query<(Entity, &TextLine, &mut Node, &mut Visibility)>,
) {
    if !layout_map.is_changed() && !buffer.is_changed() {
        return;
    }
    if buffer.is_changed() {
        for (entity, ..) in lines.iter() {
            commands.entity(entity).despawn();
        }
        for line in 0..buffer.line_count() {
            let text = buffer.line(line).unwrap_or_default();
            commands.spawn((
                Text::new(text.trim_end().to_string()),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                Node {
                    position_type: PositionType::Absolute,
                    left: Val::Px(layout.gutter_width + 8.0),
                    top: Val::Px(layout_map.line_y(line, &layout)),
                    ..default()
                },
                TextLine(line),
            ));
        }
        return;
    }

    for (_, line, mut node, mut visibility) in lines.iter_mut() {
        node.top = Val::Px(layout_map.line_y(line.0, &layout));
        *visibility = if fold_state.is_line_hidden(line.0) {
            Visibility::Hidden
        } else {
            Visibility::Inherited
        };
    }
}

fn clear_content(commands: &mut Commands, target: Entity, children: Option<&Children>) {
    if let Some(children) = children {
        for child in children.iter() {
            commands.entity(child).despawn();
        }
    }
    commands
        .entity(target)
        .insert(BackgroundColor(Color::srgba(0.15, 0.17, 0.22, 0.95)));
}

fn fill_forms(
    mut commands: Commands,
    forms: Query<(Entity, &ParameterFormTarget, Option<&Children>), Changed<ParameterFormTarget>>,
) {
    for (entity, form, children) in forms.iter() {
        clear_content(&mut commands, entity, children);
        let label = format!("Parameters: {}", form.param_names.join(", "));
        commands.entity(entity).with_child((Text::new(label), TargetContent));
    }
}

fn fill_outputs(
    mut commands: Commands,
    results: Res<BlockResults>,
    outputs: Query<(Entity, &OutputViewerTarget, Option<&Children>)>,
    added: Query<(), Added<OutputViewerTarget>>,
) {
    for (entity, viewer, children) in outputs.iter() {
        if !results.is_changed() && !added.contains(entity) {
            continue;
        }
        clear_content(&mut commands, entity, children);
        let label = match results.get(&viewer.block_id) {
            Some(BlockResult::Pending) => "Queued".to_string(),
            Some(BlockResult::Running) => "Running...".to_string(),
            Some(BlockResult::Success { output }) => {
                format!("{} output ({})", output.content_type, output.key)
            }
            Some(BlockResult::Error { message, .. }) => format!("Error: {message}"),
            None => continue,
        };
        commands.entity(entity).with_child((Text::new(label), TargetContent));
    }
}

fn fill_summaries(
    mut commands: Commands,
    summaries: Query<(Entity, &FoldingSummaryTarget, Option<&Children>), Changed<FoldingSummaryTarget>>,
) {
    for (entity, summary, children) in summaries.iter() {
        clear_content(&mut commands, entity, children);
        let content = &summary.content;
        let label = match &content.subtitle {
            Some(subtitle) => format!("▸ {}  ({subtitle})", content.title),
            None => format!("▸ {}", content.title),
        };
        commands
            .entity(entity)
            .insert(Interaction::default())
            .with_child((Text::new(label), TargetContent));
    }
}

fn click_summaries(
    keys: Res<ButtonInput<KeyCode>>,
    summaries: Query<(&Interaction, &WidgetRenderTarget), (Changed<Interaction>, With<FoldingSummaryTarget>)>,
    mut actions: MessageWriter<SummaryActionRequested>,
) {
    for (interaction, target) in summaries.iter() {
        if *interaction != Interaction::Pressed {
            continue;
        }
        let action = if keys.pressed(KeyCode::ShiftLeft) {
            SummaryAction::Raw
        } else {
            SummaryAction::Primary
        };
        actions.write(SummaryActionRequested {
            widget: target.widget.clone(),
            action,
        });
    }
}
