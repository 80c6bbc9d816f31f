//! group-users and group-groups commands - resolve group membership

use super::{print_groups, print_users, CommandContext};
use anyhow::Result;

pub async fn users_of_group(ctx: &CommandContext, dn: &str) -> Result<()> {
    let directory = ctx.directory()?;
    let users = directory.find_users_of_group(dn).await?;
    print_users(ctx, &users)
}

pub async fn groups_of_group(ctx: &CommandContext, dn: &str) -> Result<()> {
    let directory = ctx.directory()?;
    let groups = directory.find_groups_of_group(dn).await?;
    print_groups(ctx, &groups)
}
