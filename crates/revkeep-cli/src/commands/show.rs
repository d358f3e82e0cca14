//! Show command
//!
//! Usage: revkeep show <REVISION>

use clap::Args;
use revkeep_core::store::VersionStore;
use revkeep_core::{diff_version, RevisionId, RevkeepError};

use super::Context;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Revision id
    pub revision: i64,
}

/// Execute show command
pub fn execute(ctx: &Context, args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (registry, store) = ctx.open()?;
    let id = RevisionId::new(args.revision);
    let revision = store
        .revision(id)?
        .ok_or(RevkeepError::RevisionNotFound {
            revision_id: args.revision,
        })?;

    println!("revision: {}", revision.id);
    println!(
        "created_at: {}",
        revision.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    match revision.user {
        Some(user) => println!("user: {}", user),
        None => println!("user: anonymous"),
    }
    if !revision.comment.is_empty() {
        println!("comment: {}", revision.comment);
    }
    for meta in store.revision_meta(id)? {
        println!("meta {}: {}", meta.kind, serde_json::to_string(&meta.data)?);
    }

    for version in store.revision_versions(id)? {
        println!("    {} {}", version.action.label(), version.object_repr);
        // Unregistered types are still listed, just without fields
        let fields = match diff_version(&registry, &store, &version) {
            Ok(fields) => fields,
            Err(RevkeepError::NotRegistered { .. }) => continue,
            Err(err) => return Err(err.into()),
        };
        for field in fields {
            if field.old.is_empty() {
                println!("        {}: '{}'", field.field, field.new);
            } else {
                println!("        {}: '{}' was: '{}'", field.field, field.new, field.old);
            }
        }
    }
    Ok(())
}
