use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Structured values extracted from a message. Nothing populates it yet.
pub type Entities = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    ScheduleAppointment,
    CheckAvailability,
    PricingInquiry,
    ModifyAppointment,
    Gratitude,
    Farewell,
    General,
}

impl Intent {
    /// Every label, in the order the classifier tries them.
    pub const ALL: [Intent; 8] = [
        Intent::Greeting,
        Intent::ScheduleAppointment,
        Intent::CheckAvailability,
        Intent::PricingInquiry,
        Intent::ModifyAppointment,
        Intent::Gratitude,
        Intent::Farewell,
        Intent::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::ScheduleAppointment => "schedule_appointment",
            Self::CheckAvailability => "check_availability",
            Self::PricingInquiry => "pricing_inquiry",
            Self::ModifyAppointment => "modify_appointment",
            Self::Gratitude => "gratitude",
            Self::Farewell => "farewell",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown intent label: {0}")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == value.trim())
            .ok_or_else(|| UnknownIntent(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMessageRequest {
    pub business_id: i64,
    pub session_id: String,
    pub user_message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conversation_history: Vec<ConversationMessage>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMessageResponse {
    pub bot_response: String,
    pub detected_intent: Intent,
    pub entities: Entities,
}
