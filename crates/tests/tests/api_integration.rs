use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use clonchat_api::build_app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::String(
            String::from_utf8_lossy(&body).into_owned(),
        ))
    };
    (status, parsed)
}

fn process_message_request(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-message")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn detected_intent(user_message: &str) -> String {
    let (status, body) = send(
        build_app(),
        process_message_request(json!({
            "business_id": 1,
            "session_id": "session-1",
            "user_message": user_message
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["detected_intent"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_service_identity() {
    let (status, body) = send(
        build_app(),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "ok", "service": "chatbot", "version": "1.0.0" })
    );
}

#[tokio::test]
async fn process_message_returns_greeting_payload() {
    let (status, body) = send(
        build_app(),
        process_message_request(json!({
            "business_id": 42,
            "session_id": "abc-123",
            "user_message": "Hola, buenos días",
            "conversation_history": [
                { "role": "user", "content": "hey" },
                { "role": "assistant", "content": "¡Hola!" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detected_intent"], "greeting");
    assert_eq!(
        body["bot_response"],
        "¡Hola! Bienvenido a nuestro servicio de agendamiento de citas. ¿En qué puedo ayudarte hoy?"
    );
    assert_eq!(body["entities"], json!({}));
}

#[tokio::test]
async fn first_matching_rule_wins() {
    assert_eq!(detected_intent("hola, quiero agendar una cita").await, "greeting");
    assert_eq!(detected_intent("gracias, adiós").await, "gratitude");
    assert_eq!(detected_intent("What are your hours?").await, "check_availability");
    assert_eq!(detected_intent("I need to RESCHEDULE").await, "modify_appointment");
    assert_eq!(detected_intent("¿Cuál es el precio?").await, "pricing_inquiry");
    assert_eq!(detected_intent("bye bye").await, "farewell");
}

#[tokio::test]
async fn empty_message_gets_fallback_reply() {
    let (status, body) = send(
        build_app(),
        process_message_request(json!({
            "business_id": 1,
            "session_id": "s",
            "user_message": ""
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detected_intent"], "general");
    assert_eq!(
        body["bot_response"],
        "Entiendo. Estoy aquí para ayudarte con el agendamiento de citas. Puedo ayudarte a reservar una cita, consultar horarios disponibles o modificar citas existentes. ¿Qué te gustaría hacer?"
    );
    assert_eq!(body["entities"], json!({}));
}

#[tokio::test]
async fn repeated_calls_are_byte_identical() {
    let app = build_app();
    let payload = json!({
        "business_id": 9,
        "session_id": "same",
        "user_message": "Quiero reservar una cita"
    });

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(process_message_request(payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(to_bytes(response.into_body(), usize::MAX).await.unwrap());
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn missing_required_field_is_rejected() {
    let (status, body) = send(
        build_app(),
        process_message_request(json!({
            "business_id": 1,
            "user_message": "hola"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("session_id"));
}

#[tokio::test]
async fn null_history_is_treated_as_empty() {
    let (status, body) = send(
        build_app(),
        process_message_request(json!({
            "business_id": 1,
            "session_id": "s",
            "user_message": "gracias",
            "conversation_history": null
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detected_intent"], "gratitude");
    assert_eq!(
        body["bot_response"],
        "¡De nada! ¿Hay algo más en lo que pueda ayudarte?"
    );
}

#[tokio::test]
async fn history_turn_with_unknown_role_is_rejected() {
    let (status, body) = send(
        build_app(),
        process_message_request(json!({
            "business_id": 1,
            "session_id": "s",
            "user_message": "hola",
            "conversation_history": [{ "role": "system", "content": "be brief" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("conversation_history"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/process-message")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("detail").is_some());
}

#[tokio::test]
async fn analyze_intent_echoes_query_message() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-intent?message=hola%20mundo")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Intent analysis endpoint - to be implemented",
            "input": "hola mundo"
        })
    );
}

#[tokio::test]
async fn analyze_intent_accepts_json_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-intent")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": "precio" }).to_string()))
        .unwrap();

    let (status, body) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"], "precio");
}

#[tokio::test]
async fn analyze_intent_requires_message() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-intent")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "field required: message");
}

#[tokio::test]
async fn analyze_intent_rejects_bad_query_with_detail() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-intent?message=a&message=b")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(build_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("message"));
}

#[tokio::test]
async fn metrics_count_processed_and_fallback_messages() {
    let app = build_app();

    for message in ["hola", "nada que ver"] {
        let (status, _) = send(
            app.clone(),
            process_message_request(json!({
                "business_id": 1,
                "session_id": "m",
                "user_message": message
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        app,
        Request::builder().uri("/metrics").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests_total"], 2);
    assert_eq!(body["fallback_total"], 1);
    assert_eq!(body["intents"]["greeting"], 1);
    assert_eq!(body["intents"]["general"], 1);
    assert_eq!(body["processing_errors_total"], 0);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let response = build_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
