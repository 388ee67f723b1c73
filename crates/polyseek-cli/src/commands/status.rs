//! Status command

use crate::app::StatusArgs;
use anyhow::Result;
use polyseek_core::Database;

pub async fn run(args: StatusArgs, db: &Database) -> Result<()> {
    let count = db.count_items(&args.workspace, &args.knowledge_base)?;
    println!(
        "{} items in {}/{}",
        count, args.workspace, args.knowledge_base
    );
    Ok(())
}
