//! Built-in commands.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::{CommandContext, CommandHandler};
use crate::centralauth::AccountLookup;

/// `hi`: liveness check.
pub struct HiCommand;

#[async_trait]
impl CommandHandler for HiCommand {
    async fn handle(&self, ctx: &CommandContext<'_>) {
        let greeting = format!("Hello {}! I saw your message!", ctx.source.nick);
        ctx.responder.send(&greeting, Some(ctx.reply_target));
    }
}

/// `ca <account>`: Central Auth summary for a global account, posted to the
/// home channel wherever it was asked.
pub struct CaCommand {
    lookup: Arc<dyn AccountLookup>,
}

impl CaCommand {
    pub fn new(lookup: Arc<dyn AccountLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl CommandHandler for CaCommand {
    async fn handle(&self, ctx: &CommandContext<'_>) {
        let account = ctx.args.trim();
        if account.is_empty() {
            let usage = format!("Usage: {}ca <account>", ctx.prefix);
            ctx.responder.send(&usage, None);
            return;
        }

        let reply = match self.lookup.lookup(account).await {
            Ok(Some(found)) => found.to_string(),
            Ok(None) => format!("{account} does not have a global account."),
            Err(e) => {
                warn!(account = %account, error = %e, "central auth lookup failed");
                format!("Central Auth lookup for {account} failed.")
            }
        };
        ctx.responder.send(&reply, None);
    }
}
