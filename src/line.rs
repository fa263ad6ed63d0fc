use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::config::{LineConfig, Target};
use crate::error::{AppError, Result};
use crate::slots::Slot;

/// Pushes flex messages through the LINE Messaging API. The `disabled` flag
/// turns every send into a logged no-op, used both for --no-notify runs and
/// for degrading when credentials are missing or rejected.
pub struct LineClient {
    client: Client,
    config: LineConfig,
    booking_url: String,
    disabled: bool,
}

impl LineClient {
    pub fn new(config: LineConfig, booking_url: String, disabled: bool) -> Self {
        LineClient {
            client: Client::new(),
            config,
            booking_url,
            disabled,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Sends one flex message listing the found slots. Transport problems
    /// and non-2xx responses surface as errors for the caller to log; they
    /// never abort the watch loop.
    pub async fn notify_available_slots(&self, slots: &[Slot]) -> Result<()> {
        if slots.is_empty() {
            return Ok(());
        }
        if self.disabled {
            info!(
                "Notifications disabled, skipping send for {} slots",
                slots.len()
            );
            return Ok(());
        }

        self.send(self.flex_message(slots)).await
    }

    /// Pushes the regular payload built from sample slots. Used by the
    /// --notify-test mode and the startup probe.
    pub async fn send_test_message(&self, target: &Target) -> Result<()> {
        info!("Sending test notification with sample slots");
        let samples = vec![
            sample_slot(target, "08/01 (Fri)"),
            sample_slot(target, "08/02 (Sat)"),
        ];
        self.notify_available_slots(&samples).await
    }

    async fn send(&self, message: Value) -> Result<()> {
        let (token, user_id) = match (&self.config.channel_token, &self.config.user_id) {
            (Some(token), Some(user_id)) => (token, user_id),
            _ => {
                return Err(AppError::NotificationConfig(
                    "LINE channel token and user id are required".to_string(),
                ));
            }
        };

        let payload = json!({
            "to": user_id,
            "messages": [message],
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::NotificationRejected {
                status: response.status().as_u16(),
            });
        }

        info!("Notification sent");
        Ok(())
    }

    fn flex_message(&self, slots: &[Slot]) -> Value {
        let mut contents: Vec<Value> = slots.iter().map(|slot| self.slot_box(slot)).collect();
        contents.push(self.booking_button());

        json!({
            "type": "flex",
            "altText": format!("空き枠が見つかりました！({}件)", slots.len()),
            "contents": {
                "type": "bubble",
                "header": {
                    "type": "box",
                    "layout": "vertical",
                    "contents": [{
                        "type": "text",
                        "text": "🎉 空き枠発見！",
                        "size": "xl",
                        "weight": "bold",
                        "color": "#1DB446"
                    }]
                },
                "body": {
                    "type": "box",
                    "layout": "vertical",
                    "spacing": "md",
                    "contents": contents
                }
            }
        })
    }

    fn slot_box(&self, slot: &Slot) -> Value {
        json!({
            "type": "box",
            "layout": "vertical",
            "contents": [
                {
                    "type": "box",
                    "layout": "vertical",
                    "spacing": "sm",
                    "contents": [
                        {
                            "type": "text",
                            "text": format!("📍 {}", slot.location),
                            "size": "md",
                            "weight": "bold",
                            "color": "#1DB446"
                        },
                        {
                            "type": "text",
                            "text": format!("👥 {}", slot.category),
                            "size": "sm",
                            "color": "#666666",
                            "margin": "sm",
                            "wrap": true
                        },
                        {
                            "type": "text",
                            "text": format!("📅 {}", slot.date),
                            "size": "sm",
                            "color": "#666666",
                            "margin": "sm"
                        }
                    ]
                },
                { "type": "separator", "margin": "md" }
            ]
        })
    }

    fn booking_button(&self) -> Value {
        json!({
            "type": "box",
            "layout": "vertical",
            "margin": "md",
            "contents": [{
                "type": "button",
                "style": "primary",
                "color": "#1DB446",
                "action": {
                    "type": "uri",
                    "label": "予約する",
                    "uri": self.booking_url
                }
            }]
        })
    }
}

fn sample_slot(target: &Target, date: &str) -> Slot {
    Slot {
        location: target.location.clone(),
        category: target.category.clone(),
        date: date.to_string(),
        available: true,
    }
}
