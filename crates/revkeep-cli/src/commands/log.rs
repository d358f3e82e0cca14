//! Log command
//!
//! Usage: revkeep log [--type <TYPE> --key <KEY>] [--limit <N>] [--up-to <REVISION>]

use clap::Args;
use revkeep_core::{history_diff, render_history, ObjectKey, ObjectRef, RevisionId};

use super::Context;

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Restrict to one object of this type
    #[arg(long = "type", requires = "key")]
    pub type_name: Option<String>,

    /// Key of the object to restrict to
    #[arg(long, requires = "type_name")]
    pub key: Option<i64>,

    /// Number of revisions to show
    #[arg(long, default_value_t = 128)]
    pub limit: usize,

    /// Ignore revisions after this one
    #[arg(long)]
    pub up_to: Option<i64>,
}

/// Execute log command
pub fn execute(ctx: &Context, args: LogArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (registry, store) = ctx.open()?;

    let target = match (args.type_name, args.key) {
        (Some(type_name), Some(key)) => Some(ObjectRef::new(type_name, ObjectKey::new(key))),
        _ => None,
    };
    let diff = history_diff(
        &registry,
        &store,
        target.as_ref(),
        args.limit,
        args.up_to.map(RevisionId::new),
    )?;

    let text = render_history(&diff, registry.catalog(), &store)?;
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(())
}
