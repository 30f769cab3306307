//! Executes parsed commands against the store and renders templated
//! responses. Also originates cross-platform reply notifications through
//! the [`RelaySink`] seam.

use std::sync::Arc;

use {
    adrift_common::{MAX_CONTENT_CHARS, PlatformId, UserRef, format_ms, render_template},
    adrift_store::{
        MailboxStore,
        types::{Bottle, BottleReply, NewBottle, NewMessage, NewReply, StatField},
    },
    async_trait::async_trait,
    tracing::{debug, error, warn},
};

use crate::{
    notify::RelaySink,
    parse::{Command, parse_command},
    permission::may_reply,
    templates::ResponseKind,
};

const LIST_LIMIT: u32 = 10;
const SNIPPET_CHARS: usize = 30;

/// The interpreter's answer to one inbound message, delivered back on the
/// platform it arrived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub is_error: bool,
}

impl CommandReply {
    fn ok(text: String) -> Self {
        Self { text, is_error: false }
    }

    fn err(text: String) -> Self {
        Self { text, is_error: true }
    }
}

/// Stateless command executor shared by every platform adapter. All state
/// lives in the store; notifications go out through the optional sink.
pub struct CommandInterpreter {
    store: Arc<dyn MailboxStore>,
    notifier: Option<Arc<dyn RelaySink>>,
}

impl CommandInterpreter {
    #[must_use]
    pub fn new(store: Arc<dyn MailboxStore>) -> Self {
        Self { store, notifier: None }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn RelaySink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Interpret one inbound message. Never fails outward: internal errors
    /// collapse to the internal-error template so the user always gets a
    /// response.
    pub async fn handle(&self, platform: PlatformId, user_id: &str, raw: &str) -> CommandReply {
        let user = UserRef::new(platform, user_id);

        // Audit first, even for messages that turn out invalid. A failed
        // audit write must not block the command itself.
        if let Err(e) = self.store.log_command(&user, raw).await {
            warn!(%user, error = %e, "failed to audit inbound command");
        }

        let command = parse_command(raw);
        debug!(%user, ?command, "interpreting command");

        match self.run(&user, command).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(%user, error = %e, "command execution failed");
                CommandReply::err(self.render(platform, ResponseKind::Internal, &[]).await)
            }
        }
    }

    async fn run(&self, user: &UserRef, command: Command) -> anyhow::Result<CommandReply> {
        match command {
            Command::Help => Ok(CommandReply::ok(
                self.render(
                    user.platform,
                    ResponseKind::Help,
                    &[("max", &MAX_CONTENT_CHARS.to_string())],
                )
                .await,
            )),
            Command::New { content } => self.run_new(user, content).await,
            Command::Check => self.run_check(user).await,
            Command::Reply { id_token, content } => self.run_reply(user, id_token, content).await,
            Command::List => self.run_list(user).await,
            Command::Stats => self.run_stats(user).await,
            Command::Unknown { verb } => {
                debug!(%user, verb, "unknown command verb");
                Ok(CommandReply::err(
                    self.render(user.platform, ResponseKind::InvalidCommand, &[])
                        .await,
                ))
            }
        }
    }

    async fn run_new(&self, user: &UserRef, content: String) -> anyhow::Result<CommandReply> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Ok(CommandReply::err(
                self.render(user.platform, ResponseKind::EmptyContent, &[])
                    .await,
            ));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Ok(CommandReply::err(
                self.render(
                    user.platform,
                    ResponseKind::ContentTooLong,
                    &[("max", &MAX_CONTENT_CHARS.to_string())],
                )
                .await,
            ));
        }

        let bottle = self
            .store
            .create_bottle(NewBottle { content, sender: user.clone() })
            .await?;
        self.store.increment_stat(user, StatField::BottlesSent).await?;
        debug!(%user, bottle_id = bottle.id, "bottle released");

        Ok(CommandReply::ok(
            self.render(
                user.platform,
                ResponseKind::BottleSent,
                &[("id", &bottle.id.to_string())],
            )
            .await,
        ))
    }

    async fn run_check(&self, user: &UserRef) -> anyhow::Result<CommandReply> {
        let Some(bottle) = self.store.claim_random_bottle(user).await? else {
            return Ok(CommandReply::ok(
                self.render(user.platform, ResponseKind::NoBottles, &[]).await,
            ));
        };

        self.store
            .increment_stat(user, StatField::BottlesReceived)
            .await?;
        let replies = self.store.replies(bottle.id).await?;
        debug!(%user, bottle_id = bottle.id, "bottle claimed");

        Ok(CommandReply::ok(
            self.render(
                user.platform,
                ResponseKind::BottleReceived,
                &[
                    ("id", &bottle.id.to_string()),
                    ("content", &bottle.content),
                    ("platform", bottle.sender.platform.as_str()),
                    ("replies", &render_reply_block(&replies)),
                ],
            )
            .await,
        ))
    }

    async fn run_reply(
        &self,
        user: &UserRef,
        id_token: Option<String>,
        content: String,
    ) -> anyhow::Result<CommandReply> {
        let content = content.trim().to_string();
        let Some(id_token) = id_token else {
            return Ok(CommandReply::err(
                self.render(user.platform, ResponseKind::MissingReplyArgs, &[])
                    .await,
            ));
        };
        if content.is_empty() {
            return Ok(CommandReply::err(
                self.render(user.platform, ResponseKind::MissingReplyArgs, &[])
                    .await,
            ));
        }

        let Ok(bottle_id) = id_token.parse::<i64>() else {
            return Ok(CommandReply::err(
                self.render(
                    user.platform,
                    ResponseKind::InvalidBottleId,
                    &[("id", &id_token)],
                )
                .await,
            ));
        };

        if content.chars().count() > MAX_CONTENT_CHARS {
            return Ok(CommandReply::err(
                self.render(
                    user.platform,
                    ResponseKind::ContentTooLong,
                    &[("max", &MAX_CONTENT_CHARS.to_string())],
                )
                .await,
            ));
        }

        let Some(bottle) = self.store.bottle(bottle_id).await? else {
            return Ok(CommandReply::err(
                self.render(
                    user.platform,
                    ResponseKind::BottleNotFound,
                    &[("id", &bottle_id.to_string())],
                )
                .await,
            ));
        };

        let prior = self.store.replies(bottle.id).await?;
        if !may_reply(&bottle, &prior, user) {
            return Ok(CommandReply::err(
                self.render(
                    user.platform,
                    ResponseKind::PermissionDenied,
                    &[("id", &bottle.id.to_string())],
                )
                .await,
            ));
        }

        let reply = self
            .store
            .create_reply(NewReply {
                bottle_id: bottle.id,
                content,
                author: user.clone(),
            })
            .await?;
        self.store.increment_stat(user, StatField::RepliesSent).await?;
        debug!(%user, bottle_id = bottle.id, reply_id = reply.id, "reply recorded");

        self.notify_counterpart(user, &bottle, &prior, &reply).await;

        Ok(CommandReply::ok(
            self.render(
                user.platform,
                ResponseKind::ReplySent,
                &[("id", &bottle.id.to_string())],
            )
            .await,
        ))
    }

    /// Route the new reply to the other party of the conversation. Delivery
    /// failures are the relay's problem; here they only get logged.
    async fn notify_counterpart(
        &self,
        author: &UserRef,
        bottle: &Bottle,
        prior: &[BottleReply],
        reply: &BottleReply,
    ) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let (target, kind) = if *author == bottle.sender {
            // may_reply guaranteed a finder exists before the sender could
            // reply, so the counterpart is always present here.
            let Some(finder) = prior.iter().find(|r| r.author != bottle.sender) else {
                warn!(bottle_id = bottle.id, "sender reply without finder; skipping notification");
                return;
            };
            (finder.author.clone(), ResponseKind::SenderReplyNotification)
        } else {
            (bottle.sender.clone(), ResponseKind::ReplyNotification)
        };

        // Rendered against the *target's* platform templates.
        let text = self
            .render(
                target.platform,
                kind,
                &[("id", &bottle.id.to_string()), ("content", &reply.content)],
            )
            .await;

        let outcome = notifier
            .relay(NewMessage {
                source: author.clone(),
                source_user: target.user_id.clone(),
                target_platform: target.platform,
                content: text,
            })
            .await;
        if let Err(e) = outcome {
            warn!(bottle_id = bottle.id, %target, error = %e, "reply notification failed");
        }
    }

    async fn run_list(&self, user: &UserRef) -> anyhow::Result<CommandReply> {
        let listings = self.store.user_bottles(user, LIST_LIMIT).await?;
        if listings.is_empty() {
            return Ok(CommandReply::ok(
                self.render(user.platform, ResponseKind::EmptyList, &[]).await,
            ));
        }

        let lines: Vec<String> = listings
            .iter()
            .map(|l| {
                format!(
                    "#{}: {} (replies: {})",
                    l.bottle.id,
                    snippet(&l.bottle.content),
                    l.reply_count
                )
            })
            .collect();

        Ok(CommandReply::ok(
            self.render(
                user.platform,
                ResponseKind::List,
                &[("bottleList", &lines.join("\n"))],
            )
            .await,
        ))
    }

    async fn run_stats(&self, user: &UserRef) -> anyhow::Result<CommandReply> {
        let Some(stats) = self.store.user_stats(user).await? else {
            return Ok(CommandReply::ok(
                self.render(user.platform, ResponseKind::NoStats, &[]).await,
            ));
        };

        Ok(CommandReply::ok(
            self.render(
                user.platform,
                ResponseKind::Stats,
                &[
                    ("sent", &stats.bottles_sent.to_string()),
                    ("received", &stats.bottles_received.to_string()),
                    ("replies", &stats.replies_sent.to_string()),
                    ("activity", &format_ms(stats.last_activity_ms)),
                ],
            )
            .await,
        ))
    }

    /// Look up the per-platform override for `kind`, falling back to the
    /// built-in template, and substitute `vars`.
    async fn render(&self, platform: PlatformId, kind: ResponseKind, vars: &[(&str, &str)]) -> String {
        let template = match self.store.response_template(platform, kind.as_str()).await {
            Ok(Some(custom)) => custom,
            Ok(None) => kind.default_template().to_string(),
            Err(e) => {
                warn!(%platform, kind = kind.as_str(), error = %e, "template lookup failed");
                kind.default_template().to_string()
            }
        };
        render_template(&template, vars)
    }
}

#[async_trait]
impl adrift_channels::CommandSink for CommandInterpreter {
    async fn handle(
        &self,
        platform: PlatformId,
        sender_id: &str,
        text: &str,
    ) -> adrift_channels::SinkReply {
        let reply = CommandInterpreter::handle(self, platform, sender_id, text).await;
        adrift_channels::SinkReply {
            text: reply.text,
            is_error: reply.is_error,
        }
    }
}

/// The `{replies}` block for a picked-up bottle.
fn render_reply_block(replies: &[BottleReply]) -> String {
    if replies.is_empty() {
        return "\n\nNo replies yet.".to_string();
    }
    let lines: Vec<String> = replies.iter().map(|r| format!("- {}", r.content)).collect();
    format!("\n\nReplies ({}):\n{}", replies.len(), lines.join("\n"))
}

/// First characters of a bottle's content for list entries.
fn snippet(content: &str) -> String {
    if content.chars().count() <= SNIPPET_CHARS {
        return content.to_string();
    }
    let head: String = content.chars().take(SNIPPET_CHARS).collect();
    format!("{head}…")
}
