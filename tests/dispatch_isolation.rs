// tests/dispatch_isolation.rs
mod common;

use std::time::{Duration, Instant};

use common::{closed_port_url, spawn_host};
use cve_notifier::notify::{DeliveryOutcome, DispatchReport, Dispatcher, NotificationPayload};

fn payload() -> NotificationPayload {
    NotificationPayload {
        text: "Title: Apex One Remote Code Execution\nLink: https://vuldb.com/?id.329001".into(),
    }
}

#[tokio::test]
async fn every_endpoint_attempted_in_order() {
    let host = spawn_host(None).await;
    let dead = closed_port_url().await;
    let endpoints = vec![host.url("/fail"), dead.clone(), host.url("/ok")];
    let d = Dispatcher::new(Duration::from_secs(5), "test").unwrap();

    let report = d.dispatch(&payload(), &endpoints).await;
    let outcomes = report.outcomes();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes
            .iter()
            .map(DeliveryOutcome::endpoint)
            .collect::<Vec<_>>(),
        endpoints.iter().map(String::as_str).collect::<Vec<_>>()
    );
    assert!(matches!(
        &outcomes[0],
        DeliveryOutcome::Failed { status: Some(500), .. }
    ));
    assert!(matches!(&outcomes[1], DeliveryOutcome::Failed { status: None, .. }));
    assert_eq!(
        outcomes[2],
        DeliveryOutcome::Delivered {
            endpoint: host.url("/ok"),
            status: 200
        }
    );
    assert!(report.any_delivered());
}

#[tokio::test]
async fn duplicate_endpoints_each_receive_the_card() {
    let host = spawn_host(None).await;
    let endpoints = vec![host.url("/ok"), host.url("/ok")];
    let d = Dispatcher::new(Duration::from_secs(5), "test").unwrap();

    let report = d.dispatch(&payload(), &endpoints).await;

    assert_eq!(report.outcomes().len(), 2);
    assert_eq!(host.hits_on("/ok").len(), 2);
}

#[tokio::test]
async fn posted_body_is_the_adaptive_card() {
    let host = spawn_host(None).await;
    let d = Dispatcher::new(Duration::from_secs(5), "test").unwrap();

    d.dispatch(&payload(), &[host.url("/ok")]).await;

    let hit = &host.hits_on("/ok")[0];
    assert_eq!(hit.content_type.as_deref(), Some("application/json"));
    assert_eq!(hit.body["type"], "Message");
    let att = &hit.body["attachments"][0];
    assert_eq!(att["contentType"], "application/vnd.microsoft.card.adaptive");
    assert_eq!(
        att["content"]["$schema"],
        "http://adaptivecards.io/schemas/adaptive-card.json"
    );
    assert_eq!(att["content"]["type"], "AdaptiveCard");
    assert_eq!(att["content"]["version"], "1.2");
    assert_eq!(att["content"]["body"][0]["type"], "TextBlock");
    assert_eq!(att["content"]["body"][0]["wrap"], true);
    assert_eq!(hit.card_text(), payload().text);
}

#[tokio::test]
async fn hung_endpoint_is_cut_off_by_timeout() {
    let host = spawn_host(None).await;
    let d = Dispatcher::new(Duration::from_millis(300), "test").unwrap();
    let endpoints = vec![host.url("/slow"), host.url("/ok")];

    let t0 = Instant::now();
    let report = d.dispatch(&payload(), &endpoints).await;

    assert!(t0.elapsed() < Duration::from_secs(2), "took {:?}", t0.elapsed());
    let outcomes = report.outcomes();
    assert!(!outcomes[0].is_delivered());
    assert!(outcomes[1].is_delivered());
}

#[tokio::test]
async fn no_endpoints_no_traffic() {
    let d = Dispatcher::new(Duration::from_secs(1), "test").unwrap();
    assert_eq!(
        d.dispatch(&payload(), &[]).await,
        DispatchReport::NoDestinations
    );
}
