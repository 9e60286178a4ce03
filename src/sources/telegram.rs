//! Telegram source: reads channel history over MTProto with grammers.
//!
//! Uses a user account (not a bot), since the Bot API cannot read channel
//! history. The session is stored on disk and reused between runs.

use std::io::{BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::config::TelegramConfig;
use crate::error::ChannelAccessError;
use crate::pipeline::types::{ChannelFeed, ChannelRef, RawMessage, TimeWindow};
use crate::sources::MessageSource;

/// Authenticated Telegram session, scoped to one run.
pub struct TelegramSource {
    client: grammers_client::Client,
    // need to store to keep session alive
    handle: grammers_mtsender::SenderPoolHandle,
}

impl TelegramSource {
    /// Open the session file and sign in if needed.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, ChannelAccessError> {
        let session_file = config.session_file();
        let session = Arc::new(
            grammers_session::storages::SqliteSession::open(&session_file).await.map_err(|e| {
                ChannelAccessError::Session(format!(
                    "failed to open {}: {e}",
                    session_file.display()
                ))
            })?,
        );
        let sender_pool = grammers_mtsender::SenderPool::new(Arc::clone(&session), config.api_id);
        let client = grammers_client::client::Client::new(sender_pool.handle.clone());

        let grammers_mtsender::SenderPool {
            runner,
            updates: _updates,
            handle,
        } = sender_pool;

        tokio::spawn(runner.run());

        let source = Self {
            client,
            handle: handle.thin,
        };
        source.authorize(config).await?;
        Ok(source)
    }

    async fn authorize(&self, config: &TelegramConfig) -> Result<(), ChannelAccessError> {
        tracing::info!("Checking authorization status...");

        let authorized = self
            .client
            .is_authorized()
            .await
            .map_err(|e| ChannelAccessError::Session(e.to_string()))?;
        if authorized {
            tracing::info!(username = %config.username, "Already authorized");
            return Ok(());
        }

        tracing::info!(phone = %config.phone, "Not authorized, requesting login code");

        let token = self
            .client
            .request_login_code(&config.phone, config.api_hash.expose_secret())
            .await
            .map_err(|e| ChannelAccessError::Session(format!("login code request failed: {e}")))?;

        let code = prompt("Enter the code you received: ")?;

        match self.client.sign_in(&token, &code).await {
            Ok(_user) => {
                tracing::info!("Signed in successfully");
            }
            Err(grammers_client::SignInError::PasswordRequired(password_token)) => {
                let password = prompt("2FA is enabled. Enter your password: ")?;
                self.client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| ChannelAccessError::Session(format!("2FA failed: {e}")))?;
                tracing::info!("Signed in with 2FA");
            }
            Err(e) => return Err(ChannelAccessError::Session(format!("sign in failed: {e}"))),
        }

        Ok(())
    }

    async fn resolve_peer(
        &self,
        handle: &str,
    ) -> Result<grammers_client::peer::Peer, ChannelAccessError> {
        let resolved = self
            .client
            .resolve_username(handle)
            .await
            .map_err(|e| ChannelAccessError::Platform {
                channel: handle.to_string(),
                reason: e.to_string(),
            })?;

        resolved.ok_or_else(|| ChannelAccessError::NotFound(handle.to_string()))
    }
}

#[async_trait]
impl MessageSource for TelegramSource {
    async fn open(
        &self,
        channel: &ChannelRef,
        window: &TimeWindow,
    ) -> Result<ChannelFeed, ChannelAccessError> {
        let handle = channel.username()?;
        let peer = self.resolve_peer(&handle).await?;

        let title = peer
            .name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(handle.as_str())
            .to_string();

        tracing::debug!(%channel, %title, "Resolved channel");

        // History comes newest-first, so stop once past the window.
        let cutoff = window.start.timestamp();
        let iter = self.client.iter_messages(&peer);
        let messages = futures::stream::try_unfold(iter, move |mut iter| {
            let handle = handle.clone();
            async move {
                match iter.next().await {
                    Ok(Some(message)) => {
                        let date = message.date().timestamp();
                        if date < cutoff {
                            return Ok(None);
                        }
                        let raw = RawMessage {
                            id: i64::from(message.id()),
                            text: message.text().to_string(),
                            date,
                        };
                        Ok(Some((raw, iter)))
                    }
                    Ok(None) => Ok(None),
                    Err(e) => Err(ChannelAccessError::Platform {
                        channel: handle,
                        reason: e.to_string(),
                    }),
                }
            }
        });

        Ok(ChannelFeed {
            title,
            messages: Box::pin(messages),
        })
    }

    async fn close(&self) {
        tracing::info!("Closing Telegram session");
        self.handle.quit();
    }
}

impl Drop for TelegramSource {
    fn drop(&mut self) {
        self.handle.quit();
    }
}

fn prompt(message: &str) -> Result<String, ChannelAccessError> {
    let read = || -> std::io::Result<String> {
        print!("{message}");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().lock().read_line(&mut input)?;
        Ok(input.trim().to_string())
    };
    read().map_err(|e| ChannelAccessError::Session(format!("failed to read stdin: {e}")))
}
