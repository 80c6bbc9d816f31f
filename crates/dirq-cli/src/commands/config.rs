//! config command - show the resolved configuration

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;

pub fn execute(ctx: &CommandContext) -> Result<()> {
    let mut settings = ctx.settings.clone();
    settings.ldap.default = settings.ldap.default.redacted();
    for server in settings.ldap.servers.values_mut() {
        *server = server.redacted();
    }

    if ctx.is_json() {
        return ctx.print_json(&settings);
    }

    let servers = ctx.settings.server_names();
    if !servers.is_empty() {
        println!("{} {}", "Named servers:".bold(), servers.join(", "));
    }
    if let Some(ref name) = ctx.server {
        println!("{} {}", "Selected server:".bold(), name);
    }
    print!("{}", toml::to_string_pretty(&settings)?);

    Ok(())
}
