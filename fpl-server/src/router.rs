use crate::registry::SessionRegistry;
use fpl_core::ipc::{AssistantRequest, AssistantResponse, DEFAULT_SESSION};
use fpl_core::{ChatSession, ImageRef, ImagePickerResult};
use serde::Serialize;

pub async fn handle_request(
    request: AssistantRequest,
    registry: &SessionRegistry,
) -> AssistantResponse {
    let key = request
        .session_key()
        .unwrap_or(DEFAULT_SESSION)
        .to_string();

    match request {
        AssistantRequest::Ping => AssistantResponse::pong(),
        AssistantRequest::Send {
            text, image, wait, ..
        } => {
            let session = registry.get_or_create(&key);
            match handle_send(&session, &text, image, wait).await {
                Ok(data) => AssistantResponse::ok(data),
                Err(e) => AssistantResponse::err(e.to_string()),
            }
        }
        AssistantRequest::History { .. } => {
            let session = registry.get_or_create(&key);
            session_data(&key, &session)
        }
        AssistantRequest::Clear { .. } => {
            let session = registry.get_or_create(&key);
            session.clear_chat();
            session_data(&key, &session)
        }
        AssistantRequest::Status { .. } => {
            let session = registry.get_or_create(&key);
            let snapshot = session.snapshot();
            AssistantResponse::ok(serde_json::json!({
                "session": key,
                "session_id": snapshot.session_id,
                "message_count": snapshot.messages.len(),
                "composing": snapshot.composing,
                "revision": snapshot.revision,
            }))
        }
        AssistantRequest::Sessions => AssistantResponse::ok(serde_json::json!({
            "sessions": registry.keys(),
        })),
    }
}

/// Append the user message and, when `wait` is set, hold until the reply lands.
async fn handle_send(
    session: &ChatSession,
    text: &str,
    image: Option<ImagePickerResult>,
    wait: bool,
) -> anyhow::Result<serde_json::Value> {
    let image = image.map(ImageRef::from);
    let pending = match session.send_message(text, image)? {
        Some(pending) => pending,
        None => {
            tracing::debug!(session_id = %session.id(), "Ignored empty message");
            return Ok(serde_json::json!({
                "accepted": false,
                "messages": [],
                "composing": session.is_composing(),
            }));
        }
    };

    let mut data = serde_json::json!({
        "accepted": true,
        "messages": pending.appended(),
    });

    if wait {
        let outcome = pending.outcome().await;
        data["reply"] = serde_json::to_value(&outcome)?;
    }
    data["composing"] = serde_json::Value::Bool(session.is_composing());
    Ok(data)
}

fn session_data(key: &str, session: &ChatSession) -> AssistantResponse {
    #[derive(Serialize)]
    struct SessionView<'a> {
        session: &'a str,
        #[serde(flatten)]
        snapshot: fpl_core::SessionSnapshot,
    }

    let view = SessionView {
        session: key,
        snapshot: session.snapshot(),
    };
    match serde_json::to_value(&view) {
        Ok(data) => AssistantResponse::ok(data),
        Err(e) => AssistantResponse::err(format!("Serialization error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpl_core::ChatConfig;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(ChatConfig {
            rng_seed: Some(21),
            ..ChatConfig::instant()
        })
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = handle_request(AssistantRequest::Ping, &registry()).await;
        assert!(resp.is_ok());
        assert_eq!(resp.data.unwrap()["pong"], true);
    }

    #[tokio::test]
    async fn test_send_with_wait_returns_reply() {
        let registry = registry();
        let resp = handle_request(
            AssistantRequest::Send {
                session: None,
                text: "who to captain".to_string(),
                image: None,
                wait: true,
            },
            &registry,
        )
        .await;

        assert!(resp.is_ok(), "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["accepted"], true);
        assert_eq!(data["messages"].as_array().unwrap().len(), 1);
        assert_eq!(data["messages"][0]["sender"], "user");
        assert_eq!(data["reply"]["outcome"], "answered");
        assert_eq!(data["reply"]["message"]["sender"], "bot");
        assert_eq!(data["composing"], false);
    }

    #[tokio::test]
    async fn test_send_image_returns_pending_placeholder() {
        let registry = registry();
        let resp = handle_request(
            AssistantRequest::Send {
                session: Some("league".to_string()),
                text: "rate my team".to_string(),
                image: Some(ImagePickerResult {
                    uri: "file:///team.png".to_string(),
                    width: Some(1080),
                    height: Some(1920),
                    file_size: None,
                    file_name: Some("team.png".to_string()),
                }),
                wait: false,
            },
            &registry,
        )
        .await;

        let data = resp.data.unwrap();
        let messages = data["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["image"]["uri"], "file:///team.png");
        assert_eq!(messages[1]["analysis"], "pending");
        assert!(data.get("reply").is_none());
        assert_eq!(registry.keys(), vec!["league".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_send_messages_show_state_at_append() {
        let registry = registry();
        for _ in 0..20 {
            let resp = handle_request(
                AssistantRequest::Send {
                    session: None,
                    text: String::new(),
                    image: Some(ImagePickerResult {
                        uri: "file:///team.png".to_string(),
                        width: None,
                        height: None,
                        file_size: None,
                        file_name: None,
                    }),
                    wait: true,
                },
                &registry,
            )
            .await;

            let data = resp.data.unwrap();
            assert_eq!(data["messages"][1]["analysis"], "pending");
            assert_eq!(data["reply"]["message"]["analysis"], "complete");
        }
    }

    #[tokio::test]
    async fn test_empty_send_not_accepted() {
        let registry = registry();
        let resp = handle_request(
            AssistantRequest::Send {
                session: None,
                text: "  ".to_string(),
                image: None,
                wait: true,
            },
            &registry,
        )
        .await;

        let data = resp.data.unwrap();
        assert_eq!(data["accepted"], false);
        assert_eq!(registry.get_or_create(DEFAULT_SESSION).len(), 1);
    }

    #[tokio::test]
    async fn test_single_flight_rejection_is_error_response() {
        let registry = SessionRegistry::new(ChatConfig {
            single_flight: true,
            reply_delay_min_ms: 60_000,
            reply_delay_max_ms: 60_000,
            ..ChatConfig::default()
        });
        let send = || AssistantRequest::Send {
            session: None,
            text: "hello".to_string(),
            image: None,
            wait: false,
        };

        assert!(handle_request(send(), &registry).await.is_ok());
        let resp = handle_request(send(), &registry).await;
        assert!(!resp.is_ok());
        assert!(resp.error.unwrap().contains("in flight"));
    }

    #[tokio::test]
    async fn test_clear_and_history() {
        let registry = registry();
        handle_request(
            AssistantRequest::Send {
                session: None,
                text: "fixtures".to_string(),
                image: None,
                wait: true,
            },
            &registry,
        )
        .await;

        let history = handle_request(AssistantRequest::History { session: None }, &registry).await;
        let data = history.data.unwrap();
        assert_eq!(data["session"], DEFAULT_SESSION);
        assert_eq!(data["messages"].as_array().unwrap().len(), 3);

        let cleared = handle_request(AssistantRequest::Clear { session: None }, &registry).await;
        let data = cleared.data.unwrap();
        assert_eq!(data["messages"].as_array().unwrap().len(), 1);
        assert_eq!(data["composing"], false);

        let status = handle_request(AssistantRequest::Status { session: None }, &registry).await;
        assert_eq!(status.data.unwrap()["message_count"], 1);
    }
}
