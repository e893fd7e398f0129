use serde::Deserialize;

// Telegram webhook update envelope (only the fields the relay reads)

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl Message {
    /// Username of the chat, or of the sender for group chats.
    pub fn username(&self) -> Option<String> {
        self.chat
            .username
            .clone()
            .or_else(|| self.from.as_ref().and_then(|u| u.username.clone()))
    }

    pub fn first_name(&self) -> Option<String> {
        self.chat.first_name.clone().or_else(|| {
            self.from
                .as_ref()
                .map(|u| u.first_name.clone())
                .filter(|n| !n.is_empty())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}
