//! Migrate command
//!
//! Usage: revkeep migrate [--db <PATH>]

use revkeep_store::db;
use revkeep_store::migrations::{applied_migrations, apply_migrations};

use super::{ensure_parent_dir, Context};

/// Execute migrate command
pub fn execute(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent_dir(&ctx.db)?;
    let mut conn = db::open(&ctx.db)?;
    db::configure(&conn)?;
    apply_migrations(&mut conn)?;

    for id in applied_migrations(&conn)? {
        println!("✓ {}", id);
    }
    Ok(())
}
