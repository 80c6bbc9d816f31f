//! CLI command implementations

pub mod check;
pub mod config;
pub mod groups;
pub mod members;
pub mod users;

use crate::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use dirq_core::{DirectorySettings, GroupRecord, UserRecord};
use dirq_ldap::Directory;
use serde::Serialize;

/// Context passed to all commands
pub struct CommandContext {
    pub settings: DirectorySettings,
    pub server: Option<String>,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Directory handle for the selected server
    pub fn directory(&self) -> Result<Directory> {
        Ok(Directory::from_settings(&self.settings, self.server.as_deref())?)
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub(crate) fn render_user(user: &UserRecord) -> String {
    let mut out = format!("{}  {}", user.username.bold(), user.dn.dimmed());

    let full_name = match (&user.first, &user.last) {
        (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
        (Some(name), None) | (None, Some(name)) => Some(name.clone()),
        (None, None) => None,
    };
    if let Some(name) = full_name {
        out.push_str(&format!("\n    name:   {}", name));
    }
    if let Some(ref email) = user.email {
        out.push_str(&format!("\n    email:  {}", email));
    }
    for group in &user.groups {
        out.push_str(&format!("\n    group:  {}", group));
    }

    out
}

pub(crate) fn render_group(group: &GroupRecord) -> String {
    let mut out = format!("{}  {}", group.name.bold(), group.dn.dimmed());

    for member in &group.members {
        out.push_str(&format!("\n    member: {}", member));
    }
    for uid in &group.posix_members {
        out.push_str(&format!("\n    uid:    {}", uid));
    }

    out
}

pub(crate) fn print_users(ctx: &CommandContext, users: &[UserRecord]) -> Result<()> {
    if ctx.is_json() {
        return ctx.print_json(users);
    }

    if users.is_empty() {
        println!("{}", "No users found".yellow());
        return Ok(());
    }
    for user in users {
        println!("{}", render_user(user));
    }
    println!("\n{} user(s)", users.len());
    Ok(())
}

pub(crate) fn print_groups(ctx: &CommandContext, groups: &[GroupRecord]) -> Result<()> {
    if ctx.is_json() {
        return ctx.print_json(groups);
    }

    if groups.is_empty() {
        println!("{}", "No groups found".yellow());
        return Ok(());
    }
    for group in groups {
        println!("{}", render_group(group));
    }
    println!("\n{} group(s)", groups.len());
    Ok(())
}
