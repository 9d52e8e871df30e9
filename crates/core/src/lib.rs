pub mod intent;
pub mod models;

pub use intent::{
    classify, classify_intent_rules, respond, rules, Classification, ClassificationRule,
    FALLBACK_RESPONSE,
};
pub use models::*;
