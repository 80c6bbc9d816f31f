//! check command - verify connectivity and credentials

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use dirq_core::{Error, ServerInfo};
use serde::Serialize;

#[derive(Serialize)]
struct CheckResult<'a> {
    success: bool,
    url: Option<&'a str>,
    bind_identity: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_info: Option<ServerInfo>,
}

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let directory = ctx.directory()?;
    let config = directory.config();

    let outcome = directory.server_info().await;

    let result = match outcome {
        Ok(ref info) => CheckResult {
            success: true,
            url: config.url.as_deref(),
            bind_identity: config.bind_identity(),
            message: "Connection successful".to_string(),
            error_code: None,
            server_info: Some(info.clone()),
        },
        Err(ref e) => CheckResult {
            success: false,
            url: config.url.as_deref(),
            bind_identity: config.bind_identity(),
            message: e.to_string(),
            error_code: Some(e.code()),
            server_info: None,
        },
    };

    if ctx.is_json() {
        ctx.print_json(&result)?;
    } else if let Some(ref info) = result.server_info {
        println!("{} {}", "✓".green(), result.message);
        println!("  {:<16} {}", "URL:", result.url.unwrap_or("-"));
        println!(
            "  {:<16} {}",
            "Bound as:",
            result.bind_identity.as_deref().unwrap_or("(anonymous)")
        );
        println!("  {:<16} {}", "Vendor:", info.vendor.as_deref().unwrap_or("-"));
        println!("  {:<16} {}", "Version:", info.version.as_deref().unwrap_or("-"));
        println!(
            "  {:<16} {}",
            "LDAP versions:",
            info.supported_ldap_version.join(", ")
        );
        for context in &info.naming_contexts {
            println!("  {:<16} {}", "Naming context:", context);
        }
    }

    directory.invalidate().await;

    outcome.map(|_| ()).map_err(check_failure)
}

/// The single report for a failed check, printed by the caller
fn check_failure(e: Error) -> anyhow::Error {
    let stage = if e.is_connection_error() {
        "could not connect"
    } else {
        "server query failed"
    };
    let context = format!("{} Connection check failed, {} [{}]", "✗".red(), stage, e.code());
    anyhow::Error::new(e).context(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_failure_reports_code_once() {
        colored::control::set_override(false);

        let err = check_failure(Error::Bind {
            bind_dn: "cn=reader,dc=example,dc=com".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "✗ Connection check failed, could not connect [BindFailed]"
        );

        let chain: Vec<String> = err.chain().map(|c| c.to_string()).collect();
        assert_eq!(chain.len(), 2);
        assert_eq!(
            chain[1],
            "Failed to bind to LDAP server as user cn=reader,dc=example,dc=com"
        );
    }

    #[test]
    fn test_check_failure_after_bind() {
        colored::control::set_override(false);

        let err = check_failure(Error::Search("result code 50: insufficient access".to_string()));
        assert!(err.to_string().contains("server query failed [SearchFailed]"));
    }
}
