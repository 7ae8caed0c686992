use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Label the dashboard uses for the influencer side of an account.
pub const CURATOR: &str = "curator";

/// Map server role labels onto the ones the dashboard understands.
pub fn normalize_role(raw: &str) -> Option<String> {
    match raw.trim() {
        "" => None,
        "influencer" | "adventurer" => Some(CURATOR.to_string()),
        other => Some(other.to_string()),
    }
}

/// The signed-in account as the front end sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientUser {
    /// Everything the server sent apart from the role fields.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
    pub role: Option<String>,
    #[serde(rename = "activeRole")]
    pub active_role: Option<String>,
    pub roles: Vec<String>,
}

impl ClientUser {
    /// Build from a raw user object. `None` when `raw` is not an object.
    pub fn from_value(raw: Value) -> Option<Self> {
        let Value::Object(mut profile) = raw else {
            return None;
        };
        let raw_role = take_string(&mut profile, "role");
        let raw_active = take_string(&mut profile, "activeRole");
        let raw_roles = profile.remove("roles");

        let active = raw_active
            .as_deref()
            .or(raw_role.as_deref())
            .and_then(normalize_role);

        let roles = match raw_roles {
            Some(Value::Array(items)) => {
                let mut roles: Vec<String> = Vec::new();
                for role in items.iter().filter_map(Value::as_str).filter_map(normalize_role) {
                    if !roles.contains(&role) {
                        roles.push(role);
                    }
                }
                roles
            }
            _ => active.iter().cloned().collect(),
        };

        Some(ClientUser {
            profile,
            role: active.clone().or(raw_role.clone()),
            active_role: active.or(raw_active).or(raw_role),
            roles,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: ChatSender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: ChatSender, content: impl Into<String>) -> Self {
        ChatMessage {
            id: Uuid::now_v7().to_string(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Image fields a profile edit may change locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_cover_url: Option<String>,
}

/// Session state for one dashboard: who is signed in, which role they are
/// acting as, the assistant chat, and the theme.
#[derive(Debug, Clone, Default)]
pub struct AppStore {
    user: Option<ClientUser>,
    active_role: Option<String>,
    is_chat_open: bool,
    chat_messages: Vec<ChatMessage>,
    is_dark_mode: bool,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&ClientUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn active_role(&self) -> Option<&str> {
        self.active_role.as_deref()
    }

    pub fn is_dark_mode(&self) -> bool {
        self.is_dark_mode
    }

    pub fn is_chat_open(&self) -> bool {
        self.is_chat_open
    }

    pub fn chat_messages(&self) -> &[ChatMessage] {
        &self.chat_messages
    }

    /// Replace the signed-in user. `None` (or a non-object) signs out.
    pub fn set_user(&mut self, raw: Option<Value>) {
        match raw.and_then(ClientUser::from_value) {
            Some(user) => {
                self.active_role = user.active_role.clone();
                self.is_dark_mode = self.active_role.as_deref() == Some(CURATOR);
                self.user = Some(user);
            }
            None => self.logout(),
        }
    }

    /// Merge the given fields into the profile. No-op when signed out.
    pub fn update_user_profile(&mut self, updates: ProfileUpdates) {
        let Some(user) = self.user.as_mut() else {
            return;
        };
        let fields = [
            ("profile_pic", updates.profile_pic),
            ("cover_url", updates.cover_url),
            ("partner_profile_pic", updates.partner_profile_pic),
            ("partner_cover_url", updates.partner_cover_url),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                user.profile.insert(key.to_string(), Value::String(value));
            }
        }
    }

    /// Act as `role`. Refused (returns false) when signed out or when the
    /// account does not hold that role.
    pub fn switch_role(&mut self, role: &str) -> bool {
        let Some(user) = self.user.as_mut() else {
            return false;
        };
        if !user.roles.iter().any(|r| r == role) {
            return false;
        }
        user.role = Some(role.to_string());
        user.active_role = Some(role.to_string());
        self.active_role = Some(role.to_string());
        self.is_dark_mode = role == CURATOR;
        true
    }

    /// Drop identity state. The chat transcript is kept.
    pub fn logout(&mut self) {
        self.user = None;
        self.active_role = None;
        self.is_dark_mode = false;
    }

    pub fn toggle_chat(&mut self) {
        self.is_chat_open = !self.is_chat_open;
    }

    pub fn set_chat_open(&mut self, open: bool) {
        self.is_chat_open = open;
    }

    pub fn add_chat_message(&mut self, message: ChatMessage) {
        self.chat_messages.push(message);
    }

    pub fn clear_chat(&mut self) {
        self.chat_messages.clear();
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        self.is_dark_mode = dark;
    }
}
