//! HTTP bot-gateway chat transport.
//!
//! Speaks the JSON bot API shape: outbound messages are POSTed to
//! `sendMessage`, inbound traffic is long-polled from `getUpdates` by a
//! background task that normalizes raw updates into [`InboundEvent`]s.

use crate::{ChatError, ChatInterface};
use async_trait::async_trait;
use boost_types::{Button, Command, InboundEvent, InboundKind, UserId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// HTTP chat transport against a bot gateway endpoint.
pub struct HttpChat {
	client: reqwest::Client,
	base_url: String,
	poll_timeout: u64,
	running: Arc<AtomicBool>,
	task: Mutex<Option<JoinHandle<()>>>,
}

/// A raw inbound update from the gateway.
#[derive(Debug, Deserialize)]
struct Update {
	update_id: i64,
	#[serde(default)]
	message: Option<Message>,
	#[serde(default)]
	callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
	#[serde(default)]
	from: Option<Sender>,
	#[serde(default)]
	text: Option<String>,
	#[serde(default)]
	photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Deserialize)]
struct Sender {
	id: i64,
	#[serde(default)]
	username: Option<String>,
	#[serde(default)]
	first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
	file_id: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
	from: Sender,
	#[serde(default)]
	data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
	ok: bool,
	result: Option<T>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton {
	text: String,
	callback_data: String,
}

impl Sender {
	fn handle(&self) -> String {
		self.username
			.clone()
			.or_else(|| self.first_name.clone())
			.unwrap_or_else(|| self.id.to_string())
	}
}

/// Normalizes a raw update into an [`InboundEvent`].
///
/// Updates with no usable payload (edits, service messages) yield `None`
/// and are dropped; unknown slash commands fall through as plain text so
/// the dialog machinery can treat them as ordinary conversation.
fn translate(update: Update) -> Option<InboundEvent> {
	if let Some(callback) = update.callback_query {
		let action = callback.data?;
		return Some(InboundEvent {
			user_id: UserId(callback.from.id),
			handle: callback.from.handle(),
			kind: InboundKind::Button(action),
		});
	}

	let message = update.message?;
	let from = message.from?;
	let user_id = UserId(from.id);
	let handle = from.handle();

	if let Some(photos) = message.photo.filter(|p| !p.is_empty()) {
		// The largest rendition is listed last.
		let file_ref = photos.last().map(|p| p.file_id.clone())?;
		return Some(InboundEvent {
			user_id,
			handle,
			kind: InboundKind::Photo { file_ref },
		});
	}

	let text = message.text?;
	let kind = if text.trim() == "/start" {
		InboundKind::Start
	} else if let Some(command) = Command::parse(&text) {
		InboundKind::Command(command)
	} else {
		InboundKind::Text(text)
	};

	Some(InboundEvent {
		user_id,
		handle,
		kind,
	})
}

impl HttpChat {
	/// Creates a new HttpChat against the given gateway base URL.
	pub fn new(base_url: String, poll_timeout: u64) -> Result<Self, ChatError> {
		// The long-poll request must outlive the poll timeout itself.
		let client = reqwest::Client::builder()
			.timeout(std::time::Duration::from_secs(poll_timeout + 10))
			.build()
			.map_err(|e| ChatError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			base_url,
			poll_timeout,
			running: Arc::new(AtomicBool::new(false)),
			task: Mutex::new(None),
		})
	}

	async fn call<T: serde::de::DeserializeOwned>(
		&self,
		method: &str,
		payload: serde_json::Value,
	) -> Result<T, ChatError> {
		let url = format!("{}/{}", self.base_url, method);
		let response = self
			.client
			.post(&url)
			.json(&payload)
			.send()
			.await
			.map_err(|e| ChatError::Network(e.to_string()))?;

		let body: ApiResponse<T> = response
			.json()
			.await
			.map_err(|e| ChatError::Parse(e.to_string()))?;
		if !body.ok {
			return Err(ChatError::Network(format!("{} rejected", method)));
		}
		body.result
			.ok_or_else(|| ChatError::Parse(format!("{} returned no result", method)))
	}
}

#[async_trait]
impl ChatInterface for HttpChat {
	async fn send_message(&self, user: UserId, text: &str) -> Result<(), ChatError> {
		self.call::<serde_json::Value>(
			"sendMessage",
			serde_json::json!({ "chat_id": user.0, "text": text }),
		)
		.await
		.map(|_| ())
	}

	async fn send_keyboard(
		&self,
		user: UserId,
		text: &str,
		keyboard: &[Vec<Button>],
	) -> Result<(), ChatError> {
		let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
			.iter()
			.map(|row| {
				row.iter()
					.map(|b| InlineKeyboardButton {
						text: b.label.clone(),
						callback_data: b.action.clone(),
					})
					.collect()
			})
			.collect();
		self.call::<serde_json::Value>(
			"sendMessage",
			serde_json::json!({
				"chat_id": user.0,
				"text": text,
				"reply_markup": { "inline_keyboard": rows },
			}),
		)
		.await
		.map(|_| ())
	}

	async fn start_updates(
		&self,
		sender: mpsc::UnboundedSender<InboundEvent>,
	) -> Result<(), ChatError> {
		if self.running.swap(true, Ordering::SeqCst) {
			return Err(ChatError::AlreadyListening);
		}

		let client = self.client.clone();
		let base_url = self.base_url.clone();
		let poll_timeout = self.poll_timeout;
		let running = self.running.clone();

		let handle = tokio::spawn(async move {
			let mut offset: i64 = 0;
			while running.load(Ordering::SeqCst) {
				let url = format!("{}/getUpdates", base_url);
				let payload =
					serde_json::json!({ "offset": offset, "timeout": poll_timeout });
				let updates: Vec<Update> = match client.post(&url).json(&payload).send().await {
					Ok(response) => match response.json::<ApiResponse<Vec<Update>>>().await {
						Ok(body) if body.ok => body.result.unwrap_or_default(),
						Ok(_) | Err(_) => {
							tracing::warn!("Malformed update batch, retrying");
							tokio::time::sleep(std::time::Duration::from_secs(5)).await;
							continue;
						},
					},
					Err(e) => {
						tracing::warn!(error = %e, "Update poll failed, retrying");
						tokio::time::sleep(std::time::Duration::from_secs(5)).await;
						continue;
					},
				};

				for update in updates {
					offset = offset.max(update.update_id + 1);
					if let Some(event) = translate(update) {
						if sender.send(event).is_err() {
							// Engine side is gone; stop listening.
							running.store(false, Ordering::SeqCst);
							break;
						}
					}
				}
			}
		});

		*self.task.lock().await = Some(handle);
		Ok(())
	}

	async fn stop_updates(&self) -> Result<(), ChatError> {
		self.running.store(false, Ordering::SeqCst);
		if let Some(handle) = self.task.lock().await.take() {
			handle.abort();
		}
		Ok(())
	}
}

/// Factory function to create an HTTP chat transport from configuration.
///
/// Configuration parameters:
/// - `api_url`: Bot gateway base URL including the bot token (required)
/// - `poll_timeout_seconds`: Long-poll timeout (default: 25)
pub fn create_chat(config: &toml::Value) -> Result<Box<dyn ChatInterface>, ChatError> {
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ChatError::Configuration("api_url is required".to_string()))?
		.to_string();
	let poll_timeout = config
		.get("poll_timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(25) as u64;

	Ok(Box::new(HttpChat::new(api_url, poll_timeout)?))
}
