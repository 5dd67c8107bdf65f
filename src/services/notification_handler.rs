use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use teloxide::{
    adaptors::throttle::{Limits, Throttle},
    prelude::*,
    types::{MessageId, ThreadId},
    Bot,
};

use crate::config::TelegramConfig;
use crate::database::models::{Notification, PoolEvent};
use crate::database::store::NotificationStore;

/// Escape special characters for MarkdownV2
fn escape_markdownv2(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|'
            | '{' | '}' | '.' | '!' => {
                format!("\\{}", c)
            }
            _ => c.to_string(),
        })
        .collect()
}

/// A delivery channel for user notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Persists notifications so users can list and dismiss them
pub struct StoredNotifier {
    store: Arc<dyn NotificationStore>,
}

impl StoredNotifier {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoredNotifier {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.store.insert(notification).await
    }
}

/// Mirrors notifications into a Telegram chat
pub struct TelegramNotifier {
    bot: Throttle<Bot>,
    chat_id: String,
    thread_id: Option<u64>,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, thread_id: Option<u64>) -> Self {
        let bot = Bot::new(token).throttle(Limits::default());
        Self {
            bot,
            chat_id,
            thread_id,
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Option<Self> {
        match (&config.token, &config.chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => Some(
                Self::new(token.clone(), chat_id.clone(), config.thread_id),
            ),
            _ => None,
        }
    }

    fn format(notification: &Notification) -> String {
        format!(
            "*{}*\n_{}_\n{}",
            escape_markdownv2(&notification.title),
            escape_markdownv2(&notification.user_email),
            escape_markdownv2(&notification.message)
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let mut request = self
            .bot
            .send_message(self.chat_id.clone(), Self::format(notification))
            .parse_mode(teloxide::types::ParseMode::MarkdownV2);
        if let Some(thread_id) = self.thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread_id as i32)));
        }

        request
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send telegram notification: {}", e))?;
        Ok(())
    }
}

/// Fire-and-forget fan-out of pool events to every configured notifier.
///
/// Delivery runs on spawned tasks; failures are logged and never reach the caller.
#[derive(Clone, Default)]
pub struct NotificationEmitter {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationEmitter {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn emit(
        &self,
        event: PoolEvent,
        created_by: &str,
        recipients: &[String],
        title: &str,
        message: &str,
        link: &str,
    ) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "No async runtime available, dropping {} notifications",
                event.as_str()
            );
            return;
        };

        debug!(
            "Emitting {} to {} recipients",
            event.as_str(),
            recipients.len()
        );

        for recipient in recipients {
            let notification = Notification::new(
                event,
                created_by.to_string(),
                recipient.clone(),
                title.to_string(),
                message.to_string(),
                link.to_string(),
            );

            for notifier in &self.notifiers {
                let notifier = notifier.clone();
                let notification = notification.clone();
                runtime.spawn(async move {
                    if let Err(e) = notifier.deliver(&notification).await {
                        warn!(
                            "{} notifier failed to deliver {} to {}: {}",
                            notifier.name(),
                            notification.event.as_str(),
                            notification.user_email,
                            e
                        );
                    }
                });
            }
        }
    }
}
