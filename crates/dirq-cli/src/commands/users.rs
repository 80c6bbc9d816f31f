//! users command - find users by pattern or DN

use super::{print_users, CommandContext};
use anyhow::Result;
use dirq_ldap::UserQuery;
use tracing::debug;

pub async fn execute(ctx: &CommandContext, pattern: &str, query: &UserQuery) -> Result<()> {
    let directory = ctx.directory()?;
    debug!(pattern, ?query, "Searching users");

    let users = directory.find_users(pattern, query).await?;
    print_users(ctx, &users)
}
