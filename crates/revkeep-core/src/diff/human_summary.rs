//! Plain-text renderer for history diffs.

use std::collections::HashMap;

use revkeep_core_types::ObjectKey;

use crate::diff::model::HistoryDiff;
use crate::errors::Result;
use crate::model::Catalog;
use crate::store::RecordStore;

const SEPARATOR_WIDTH: usize = 80;

/// Render a [`HistoryDiff`] newest revision first
///
/// ```text
/// --------------------------------------------------------------------------------
/// 1|2024-05-01 12:00:00|ada
///     Change <Page: Home>
///         title: 'Home' was: 'Start'
/// ```
///
/// Revisions without changes are skipped; the leading number counts the
/// rendered revisions. Revisions without an actor show `anonymous`; an actor
/// that no longer exists shows its key.
///
/// # Errors
///
/// Returns store errors from actor lookups.
pub fn render_history<S: RecordStore>(
    diff: &HistoryDiff,
    catalog: &Catalog,
    store: &S,
) -> Result<String> {
    let mut lines = Vec::new();
    let mut actors: HashMap<ObjectKey, String> = HashMap::new();
    let mut rendered = 0usize;

    for entry in diff.revisions.values().rev() {
        if entry.changes.is_empty() {
            continue;
        }
        rendered += 1;
        lines.push("-".repeat(SEPARATOR_WIDTH));

        let actor = match entry.revision.user {
            None => "anonymous".to_string(),
            Some(key) => match actors.get(&key) {
                Some(name) => name.clone(),
                None => {
                    let name = actor_name(catalog, store, key)?;
                    actors.insert(key, name.clone());
                    name
                }
            },
        };
        lines.push(format!(
            "{}|{}|{}",
            rendered,
            entry.revision.created_at.format("%Y-%m-%d %H:%M:%S"),
            actor
        ));

        for change in &entry.changes {
            lines.push(format!(
                "    {} {}",
                change.kind.label(),
                change.version.object_repr
            ));
            for field in &change.fields {
                if field.old.is_empty() {
                    lines.push(format!("        {}: '{}'", field.field, field.new));
                } else {
                    lines.push(format!(
                        "        {}: '{}' was: '{}'",
                        field.field, field.new, field.old
                    ));
                }
            }
        }
    }
    Ok(lines.join("\n"))
}

fn actor_name<S: RecordStore>(catalog: &Catalog, store: &S, key: ObjectKey) -> Result<String> {
    let Some(actor_type) = catalog.actor_type() else {
        return Ok(key.to_string());
    };
    Ok(store
        .get(actor_type, key)?
        .map(|record| catalog.display_name(&record))
        .unwrap_or_else(|| key.to_string()))
}
