use helpdesk_relay::{
    error::AppError,
    gateway::{FreshdeskClient, HelpdeskApi, TicketGateway},
    models::{TicketPriority, TicketStatus},
};
use mockito::{Matcher, Server};
use serde_json::json;

const AUTH_HEADER: &str = "Basic c2VjcmV0Olg=";

fn client(server: &Server) -> FreshdeskClient {
    FreshdeskClient::with_base_url(server.url(), "secret", 5).unwrap()
}

#[tokio::test]
async fn test_get_ticket_bare_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/tickets/41305")
        .match_header("authorization", AUTH_HEADER)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 41305,
                "subject": "Node-A (1.1.1.1): STATE - DOWN",
                "description_text": "Ping failed",
                "status": 2,
                "priority": 3,
                "email": "monitor@example.com",
                "created_at": "2024-03-01T10:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ticket = client(&server).get_ticket(41305).await.unwrap();

    mock.assert_async().await;
    assert_eq!(ticket.id, 41305);
    assert_eq!(ticket.subject, "Node-A (1.1.1.1): STATE - DOWN");
    assert_eq!(ticket.description, "Ping failed");
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.priority, TicketPriority::High);
    assert_eq!(ticket.customer_email, "monitor@example.com");
    assert!(ticket.created_at.is_some());
}

#[tokio::test]
async fn test_get_ticket_wrapped_response() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/tickets/9")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ticket": {
                    "id": 9,
                    "subject": "Mailbox full",
                    "status": 5,
                    "custom_fields": { "email": "user@example.com" }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ticket = client(&server).get_ticket(9).await.unwrap();

    assert_eq!(ticket.subject, "Mailbox full");
    assert_eq!(ticket.status, TicketStatus::Closed);
    assert_eq!(ticket.priority, TicketPriority::Unknown);
    assert_eq!(ticket.customer_email, "user@example.com");
}

#[tokio::test]
async fn test_get_ticket_error_statuses() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/tickets/404")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/tickets/401")
        .with_status(401)
        .with_body(r#"{"code":"invalid_credentials"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/tickets/500")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let client = client(&server);

    assert!(matches!(
        client.get_ticket(404).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        client.get_ticket(401).await,
        Err(AppError::Authentication(_))
    ));
    match client.get_ticket(500).await {
        Err(AppError::Gateway(message)) => {
            assert!(message.contains("500"));
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected gateway error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_ticket_without_id_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/tickets/3")
        .with_status(200)
        .with_body(r#"{"subject":"no id here"}"#)
        .create_async()
        .await;

    assert!(matches!(
        client(&server).get_ticket(3).await,
        Err(AppError::Gateway(_))
    ));
}

#[tokio::test]
async fn test_close_ticket_adds_note_then_closes() {
    let mut server = Server::new_async().await;
    let note = server
        .mock("POST", "/tickets/100/notes")
        .match_body(Matcher::Json(json!({
            "body": "Service is UP - Closed by automatic correlation with ticket #101",
            "private": true
        })))
        .with_status(201)
        .with_body(r#"{"id":1}"#)
        .create_async()
        .await;
    let close = server
        .mock("PUT", "/tickets/100")
        .match_body(Matcher::Json(json!({ "status": 5 })))
        .with_status(200)
        .with_body(r#"{"id":100,"status":5}"#)
        .create_async()
        .await;

    client(&server)
        .close_ticket(
            100,
            "Service is UP - Closed by automatic correlation with ticket #101",
        )
        .await
        .unwrap();

    note.assert_async().await;
    close.assert_async().await;
}

#[tokio::test]
async fn test_close_ticket_stops_when_note_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/tickets/100/notes")
        .with_status(500)
        .create_async()
        .await;
    let close = server
        .mock("PUT", "/tickets/100")
        .expect(0)
        .create_async()
        .await;

    assert!(client(&server).close_ticket(100, "reason").await.is_err());
    close.assert_async().await;
}

#[tokio::test]
async fn test_recent_tickets_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/tickets")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("per_page".into(), "50".into()),
            Matcher::UrlEncoded("order_by".into(), "created_at".into()),
            Matcher::UrlEncoded("order_type".into(), "desc".into()),
        ]))
        .with_status(200)
        .with_body(
            json!([
                { "id": 2, "subject": "Second", "status": 2, "priority": 1 },
                { "id": 1, "subject": "First", "status": 4, "priority": 4 },
                { "subject": "dropped without id" }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let tickets = client(&server).recent_tickets(50).await.unwrap();

    mock.assert_async().await;
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].id, 2);
    assert_eq!(tickets[1].status, TicketStatus::Resolved);
    assert_eq!(tickets[1].priority, TicketPriority::Urgent);
}

#[tokio::test]
async fn test_agents_fall_back_to_contact() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/agents")
        .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
        .with_status(200)
        .with_body(
            json!([
                {
                    "id": 11,
                    "available": true,
                    "contact": { "name": "Dana", "email": "dana@example.com" }
                },
                { "id": 12 }
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let agents = client(&server).agents().await.unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].name, "Dana");
    assert_eq!(agents[0].email, "dana@example.com");
    assert!(agents[0].available);
    assert_eq!(agents[1].name, "Unknown");
}

#[tokio::test]
async fn test_check_connection() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/agents")
        .match_query(Matcher::UrlEncoded("per_page".into(), "1".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    assert!(client(&server).check_connection().await);

    let mut failing = Server::new_async().await;
    failing
        .mock("GET", "/agents")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    assert!(!client(&failing).check_connection().await);
}

#[tokio::test]
async fn test_ticket_updates() {
    let mut server = Server::new_async().await;
    let priority = server
        .mock("PUT", "/tickets/7")
        .match_body(Matcher::Json(json!({ "priority": 4 })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let reply = server
        .mock("POST", "/tickets/7/conversations")
        .match_body(Matcher::Json(json!({
            "body": "On it",
            "body_html": "<p>On it</p>"
        })))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;

    let client = client(&server);
    client.update_priority(7, TicketPriority::Urgent).await.unwrap();
    client.add_reply(7, "On it").await.unwrap();

    priority.assert_async().await;
    reply.assert_async().await;

    assert!(matches!(
        client.update_status(7, TicketStatus::Unknown).await,
        Err(AppError::Validation(_))
    ));
}
