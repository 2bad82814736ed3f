use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ReplyParameters};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::lifecycle::LifecycleComponent;
use crate::core::store::types::UserId;
use crate::core::tracking::{AllowList, TrackingMachine};

pub struct TelegramInterface {
    token: String,
    access: Arc<AllowList>,
    machine: Arc<Mutex<TrackingMachine>>,
    task: Option<JoinHandle<()>>,
}

impl TelegramInterface {
    pub fn new(token: String, access: AllowList, machine: TrackingMachine) -> Self {
        Self {
            token,
            access: Arc::new(access),
            machine: Arc::new(Mutex::new(machine)),
            task: None,
        }
    }

    async fn start_bot(&mut self) {
        let bot_client = Bot::new(&self.token);

        let commands = vec![
            BotCommand::new("start", "Starts timer with optional note"),
            BotCommand::new("stop", "Stops timer"),
            BotCommand::new("help", "Show available commands"),
        ];
        if let Err(e) = bot_client.set_my_commands(commands).await {
            error!("Failed to set telegram bot commands: {}", e);
        }

        let access = self.access.clone();
        let machine = self.machine.clone();

        self.task = Some(tokio::spawn(async move {
            teloxide::repl(bot_client, move |bot: Bot, msg: Message| {
                let access = access.clone();
                let machine = machine.clone();
                async move {
                    let Some(user) = msg.from.as_ref() else {
                        return Ok(());
                    };

                    if let Some(reply) = dispatch(&access, &machine, user.id.0, msg.text()).await {
                        if let Err(e) = bot
                            .send_message(msg.chat.id, reply)
                            .reply_parameters(ReplyParameters::new(msg.id))
                            .await
                        {
                            error!("Failed to send telegram reply: {}", e);
                        }
                    }
                    Ok(())
                }
            })
            .await;
        }));
    }
}

/// Routes one inbound message. Senders outside the allow-list get their
/// numeric id back and never reach the tracking machine.
///
/// Messages without text (stickers, photos) are ignored unless a note is
/// pending, in which case they count as an empty note.
pub(crate) async fn dispatch(
    access: &AllowList,
    machine: &Mutex<TrackingMachine>,
    sender: u64,
    text: Option<&str>,
) -> Option<String> {
    if !access.is_allowed(sender) {
        warn!(user_id = sender, "Rejected message from unauthorized user");
        return Some(format!(
            "You are not authorized to use this bot.\nYour Telegram ID is: {}",
            sender
        ));
    }

    let user = UserId::from(sender);
    let mut machine = machine.lock().await;
    let text = match text {
        Some(text) => text,
        None if machine.is_awaiting_note(&user) => "",
        None => return None,
    };
    machine.handle(&user, text).await
}

#[async_trait]
impl LifecycleComponent for TelegramInterface {
    fn name(&self) -> &'static str {
        "Telegram Interface"
    }

    async fn on_init(&mut self) -> Result<()> {
        info!("Telegram Interface initializing...");
        if self.access.is_open() {
            warn!("AUTHORIZED_USERS is empty, the bot will answer everyone");
        }
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        info!("Telegram Interface starting...");
        self.start_bot().await;
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Telegram Interface shutting down...");
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}
