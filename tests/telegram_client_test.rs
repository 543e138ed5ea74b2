mod common;

use common::{ticket, MockGateway};
use helpdesk_relay::{
    bot::{BotHandler, BotPoller},
    error::AppError,
    models::{OutgoingMessage, ReplyKeyboard},
    notifications::{Notifier, TelegramClient, TelegramNotifier, Update},
    state::{RecipientRegistry, SessionRegistry},
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;

const TOKEN: &str = "123:abc";

fn client(server: &Server) -> TelegramClient {
    TelegramClient::new(&server.url(), TOKEN, 5).unwrap()
}

fn path(method: &str) -> String {
    format!("/bot{}/{}", TOKEN, method)
}

#[tokio::test]
async fn test_send_message_with_keyboard() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", path("sendMessage").as_str())
        .match_body(Matcher::Json(json!({
            "chat_id": 42,
            "text": "<b>hi</b>",
            "parse_mode": "HTML",
            "reply_markup": {
                "keyboard": [[{ "text": "/help" }]],
                "resize_keyboard": true
            }
        })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"message_id":1}}"#)
        .create_async()
        .await;

    let message = OutgoingMessage::text("<b>hi</b>")
        .html()
        .with_keyboard(ReplyKeyboard::new(&[&["/help"]]));

    client(&server).send_message(42, &message).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_send_is_delivery_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", path("sendMessage").as_str())
        .with_status(400)
        .with_body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
        .create_async()
        .await;

    match client(&server)
        .send_message(7, &OutgoingMessage::text("hello"))
        .await
    {
        Err(AppError::Delivery(message)) => assert!(message.contains("chat not found")),
        other => panic!("expected delivery error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_updates_and_get_me() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", path("getUpdates").as_str())
        .match_body(Matcher::PartialJson(json!({
            "offset": 10,
            "allowed_updates": ["message"]
        })))
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 10,
                        "message": {
                            "message_id": 5,
                            "chat": { "id": 42, "type": "private" },
                            "from": { "id": 7, "is_bot": false, "first_name": "Kim" },
                            "text": "/start"
                        }
                    },
                    { "update_id": 11 }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", path("getMe").as_str())
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{"id":99,"is_bot":true,"username":"relay_bot"}}"#)
        .create_async()
        .await;

    let client = client(&server);

    let updates = client.get_updates(10, 0).await.unwrap();
    assert_eq!(updates.len(), 2);
    let message = updates[0].message.as_ref().unwrap();
    assert_eq!(message.chat.id, 42);
    assert_eq!(message.from.as_ref().unwrap().id, 7);
    assert_eq!(message.text.as_deref(), Some("/start"));
    assert!(updates[1].message.is_none());

    let me = client.get_me().await.unwrap();
    assert_eq!(me.username.as_deref(), Some("relay_bot"));
}

#[tokio::test]
async fn test_broadcast_reports_partial_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", path("sendMessage").as_str())
        .match_body(Matcher::PartialJson(json!({ "chat_id": 1 })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;
    server
        .mock("POST", path("sendMessage").as_str())
        .match_body(Matcher::PartialJson(json!({ "chat_id": 2 })))
        .with_status(403)
        .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#)
        .create_async()
        .await;

    let notifier = TelegramNotifier::new(client(&server));
    let report = notifier.broadcast(&[1, 2], "🔴 DOWN Alert").await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failed_recipients(), vec![2]);
}

#[tokio::test]
async fn test_poller_answers_update() {
    let mut server = Server::new_async().await;
    let reply = server
        .mock("POST", path("sendMessage").as_str())
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "chat_id": 42 })),
            Matcher::Regex("Ticket #41305".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    let sessions = SessionRegistry::new();
    let handler = Arc::new(BotHandler::new(
        Arc::new(MockGateway::new().with_ticket(ticket(41305, "Node-A: STATE - DOWN"))),
        RecipientRegistry::new(),
        sessions.clone(),
        None,
    ));
    let poller = BotPoller::new(client(&server), handler, Some("relay_bot".to_string()), 0, 1);

    let update: Update = serde_json::from_value(json!({
        "update_id": 1,
        "message": {
            "message_id": 3,
            "chat": { "id": 42 },
            "from": { "id": 7 },
            "text": "#41305"
        }
    }))
    .unwrap();

    poller.process_update(update).await;

    reply.assert_async().await;
    assert_eq!(sessions.current_ticket(7), Some(41305));
}
