//! Revert command
//!
//! Usage: revkeep revert <REVISION> [--delete]

use clap::Args;
use revkeep_core::{revert_revision, RevisionId, RevisionManager};

use super::Context;

#[derive(Debug, Args)]
pub struct RevertArgs {
    /// Revision id to restore
    pub revision: i64,

    /// Also delete objects that were added to the revision's closure since
    #[arg(long)]
    pub delete: bool,
}

/// Execute revert command
///
/// The revert runs inside a scope, so it is recorded as a new revision.
pub fn execute(ctx: &Context, args: RevertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (registry, mut store) = ctx.open()?;
    let mut manager = RevisionManager::new(registry.clone());
    let id = RevisionId::new(args.revision);

    let report = manager.run(&mut store, |m, s| {
        m.set_comment(format!("Reverted revision {}", args.revision))?;
        revert_revision(&registry, s, m, id, args.delete)
    })?;

    println!(
        "✓ Reverted revision {} (restored: {}, deleted: {})",
        args.revision,
        report.restored.len(),
        report.deleted.len()
    );
    Ok(())
}
