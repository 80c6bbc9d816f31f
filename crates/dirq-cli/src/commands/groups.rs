//! groups command - find groups by pattern or DN

use super::{print_groups, CommandContext};
use anyhow::Result;
use dirq_ldap::GroupQuery;
use tracing::debug;

pub async fn execute(ctx: &CommandContext, pattern: &str, query: &GroupQuery) -> Result<()> {
    let directory = ctx.directory()?;
    debug!(pattern, ?query, "Searching groups");

    let groups = directory.find_groups(pattern, query).await?;
    print_groups(ctx, &groups)
}
