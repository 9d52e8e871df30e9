use crate::models::{Entities, Intent, ProcessMessageRequest, ProcessMessageResponse};

/// One keyword rule. A rule fires when any keyword occurs as a substring of the
/// lowercased message.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
    pub response: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub response: &'static str,
    pub entities: Entities,
}

pub const FALLBACK_RESPONSE: &str = "Entiendo. Estoy aquí para ayudarte con el agendamiento de citas. \
Puedo ayudarte a reservar una cita, consultar horarios disponibles o modificar citas existentes. \
¿Qué te gustaría hacer?";

// Evaluation order is significant: the first matching rule wins.
static RULES: [ClassificationRule; 7] = [
    ClassificationRule {
        intent: Intent::Greeting,
        keywords: &["hola", "buenos días", "buenas tardes", "hey", "hello"],
        response: "¡Hola! Bienvenido a nuestro servicio de agendamiento de citas. ¿En qué puedo ayudarte hoy?",
    },
    ClassificationRule {
        intent: Intent::ScheduleAppointment,
        keywords: &["agendar", "cita", "reservar", "appointment", "book"],
        response: "¡Perfecto! Me encantaría ayudarte a agendar una cita. ¿Qué día y hora te vendría bien?",
    },
    ClassificationRule {
        intent: Intent::CheckAvailability,
        keywords: &["horario", "disponibilidad", "available", "hours"],
        response: "Nuestro horario de atención es de lunes a viernes de 9:00 AM a 6:00 PM. ¿Qué día prefieres?",
    },
    ClassificationRule {
        intent: Intent::PricingInquiry,
        keywords: &["precio", "costo", "cuánto", "price", "cost"],
        response: "Con gusto te proporciono información sobre nuestros precios. ¿Qué servicio te interesa?",
    },
    ClassificationRule {
        intent: Intent::ModifyAppointment,
        keywords: &["cancelar", "modificar", "cambiar", "cancel", "reschedule"],
        response: "Entiendo que necesitas modificar o cancelar una cita. Por favor proporcióname tu nombre o número de confirmación.",
    },
    ClassificationRule {
        intent: Intent::Gratitude,
        keywords: &["gracias", "thank", "excelente", "perfecto"],
        response: "¡De nada! ¿Hay algo más en lo que pueda ayudarte?",
    },
    ClassificationRule {
        intent: Intent::Farewell,
        keywords: &["adiós", "chao", "bye", "hasta luego"],
        response: "¡Hasta luego! Que tengas un excelente día. No dudes en contactarnos si necesitas algo más.",
    },
];

/// The keyword rules in evaluation order. The `general` fallback is implicit.
pub fn rules() -> &'static [ClassificationRule] {
    &RULES
}

pub fn classify(message: &str) -> Classification {
    let lower = message.to_lowercase();

    let (intent, response) = RULES
        .iter()
        .find(|rule| contains_any(&lower, rule.keywords))
        .map(|rule| (rule.intent, rule.response))
        .unwrap_or((Intent::General, FALLBACK_RESPONSE));

    Classification {
        intent,
        response,
        entities: Entities::new(),
    }
}

pub fn classify_intent_rules(message: &str) -> Intent {
    classify(message).intent
}

/// Builds the reply for a chat request. Identifiers and history are accepted
/// but play no part in the answer.
pub fn respond(request: &ProcessMessageRequest) -> ProcessMessageResponse {
    let classification = classify(&request.user_message);

    ProcessMessageResponse {
        bot_response: classification.response.to_string(),
        detected_intent: classification.intent,
        entities: classification.entities,
    }
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
