//! Token CLI commands: issue, revoke.

use anyhow::{Result, bail};
use console::style;

use storefront_types::principal::Role;

use crate::state::AppState;

/// Issue a token and print it once.
///
/// ```bash
/// sfront token issue --user-id 1 --role admin --label ops
/// ```
pub async fn issue_token(
    state: &AppState,
    user_id: i64,
    role: Role,
    label: &str,
    json: bool,
) -> Result<()> {
    let issued = state.tokens.issue(user_id, role, label).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": issued.id,
                "token": issued.token,
                "userId": user_id,
                "role": role,
                "label": label,
            })
        );
    } else {
        println!();
        println!(
            "  {} Token issued for user {} ({}) -- save it, it won't be shown again:",
            style("✓").green().bold(),
            style(user_id).bold(),
            role
        );
        println!();
        println!("  {}", style(&issued.token).yellow().bold());
        println!();
        println!("  {} {}", style("id").dim(), issued.id);
        println!();
    }

    Ok(())
}

/// Revoke the token whose id is, or uniquely starts with, `id`.
pub async fn revoke_token(state: &AppState, id: &str, json: bool) -> Result<()> {
    let revoked = state.tokens.revoke(id).await?;

    if json {
        println!("{}", serde_json::json!({ "revoked": revoked }));
        return Ok(());
    }

    let Some(revoked) = revoked else {
        bail!("no token matches '{id}'");
    };

    println!("  {} Revoked token {}", style("✓").green().bold(), revoked);
    Ok(())
}
