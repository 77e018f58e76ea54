//! # Integration Tests
//!
//! Cross-crate tests: blueprint loading, real connectors against local HTTP
//! servers, and mocked end-to-end fan-out.

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ChannelKind;

    const BLUEPRINT: &str = r#"
[dispatch]
timeout_ms = 3000
max_in_flight = 2
default_channels = ["webhook", "chat_broadcast"]

[[connectors]]
kind = "chat_broadcast"
display_name = "Announcements"
params = { base_url = "https://chat.example.com", token = "t", chat_id = "@news" }

[[connectors]]
kind = "webhook"
display_name = "Ops hook"
params = { url = "https://hooks.example.com/in" }

[[templates.variants]]
key = "default"
channels.chat_broadcast = { format = "{title}\n{body}" }
channels.webhook = { format = "{title}: {body}", max_chars = 200 }
"#;

    #[test]
    fn test_blueprint_survives_toml_round_trip() {
        let blueprint = ConfigLoader::load_from_str(BLUEPRINT, ConfigFormat::Toml).unwrap();
        let reloaded = ConfigLoader::load_from_str(
            &ConfigLoader::to_toml(&blueprint).unwrap(),
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(
            reloaded.default_channels(),
            vec![ChannelKind::Webhook, ChannelKind::ChatBroadcast]
        );
        assert_eq!(reloaded.dispatch.max_in_flight, Some(2));
        assert_eq!(reloaded.templates.variants[0].channels.len(), 2);
    }

    #[test]
    fn test_blueprint_builds_every_connector() {
        let blueprint = ConfigLoader::load_from_str(BLUEPRINT, ConfigFormat::Toml).unwrap();
        let connectors = connectors::create_connectors(&blueprint).unwrap();
        let kinds: Vec<_> = connectors.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![ChannelKind::ChatBroadcast, ChannelKind::Webhook]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use connectors::{MockBehavior, MockConnector};
    use contracts::{ChannelKind, Connector, ContentEnvelope, FailureReason};
    use dispatcher::{
        create_dispatcher, CancellationToken, DispatchError, DispatchOptions, DispatchSettings,
        DispatcherBuilder,
    };
    use observability::DistributionStatsAggregator;
    use templates::Selector;

    const LIVE_BLUEPRINT: &str = r#"
[dispatch]
timeout_ms = 2000

[[connectors]]
kind = "chat_broadcast"
display_name = "Announcements"
params = { base_url = "CHAT_URL", token = "T0K", chat_id = "@news" }

[[connectors]]
kind = "issue_tracker"
display_name = "Roadmap"
params = { base_url = "TRACKER_URL", repository = "acme/site", token = "gh", labels = "announcement" }

[[templates.variants]]
key = "default"
channels.chat_broadcast = { format = "{title}\n{body}" }
channels.issue_tracker = { format = "{body}", title = "[news] {title}" }
"#;

    const SPLIT_BLUEPRINT: &str = r#"
[[connectors]]
kind = "webhook"
display_name = "Hook"
params = { url = "https://hooks.example.com/in" }

[[connectors]]
kind = "social_queue"
display_name = "Social"
params = { base_url = "https://social.example.com", access_token = "a", profile_ids = "p1" }

[templates.policy]
type = "split"
variants = ["a", "b"]

[[templates.variants]]
key = "a"
channels.webhook = { format = "A {title}" }
channels.social_queue = { format = "A {title}" }

[[templates.variants]]
key = "b"
channels.webhook = { format = "B {title}" }
channels.social_queue = { format = "B {title}" }
"#;

    fn envelope(id: &str) -> ContentEnvelope {
        ContentEnvelope::builder()
            .id(id)
            .title("Release 1.2")
            .body("Faster fan-out")
            .tag("release")
            .build()
            .unwrap()
    }

    fn mocked(
        blueprint: &str,
        settings: DispatchSettings,
        mocks: &[Arc<MockConnector>],
    ) -> dispatcher::Dispatcher {
        let blueprint = ConfigLoader::load_from_str(blueprint, ConfigFormat::Toml).unwrap();
        mocks
            .iter()
            .fold(
                DispatcherBuilder::new(settings)
                    .selector(Selector::from_config(&blueprint.templates).unwrap()),
                |b, mock| b.connector(Arc::clone(mock) as Arc<dyn Connector>),
            )
            .build()
            .unwrap()
    }

    /// Blueprint -> real connectors -> local HTTP servers -> report
    #[tokio::test]
    async fn test_e2e_real_connectors_partial_success() {
        let mut chat = mockito::Server::new_async().await;
        let mut tracker = mockito::Server::new_async().await;

        let sent = chat
            .mock("POST", "/botT0K/sendMessage")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "chat_id": "@news",
                "text": "Release 1.2\nFaster fan-out"
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"message_id":42}}"#)
            .create_async()
            .await;
        let limited = tracker
            .mock("POST", "/repos/acme/site/issues")
            .with_status(429)
            .with_body(r#"{"message":"slow down"}"#)
            .create_async()
            .await;

        let config = LIVE_BLUEPRINT
            .replace("CHAT_URL", &chat.url())
            .replace("TRACKER_URL", &tracker.url());
        let blueprint = ConfigLoader::load_from_str(&config, ConfigFormat::Toml).unwrap();
        let dispatcher = create_dispatcher(&blueprint).unwrap();

        let report = dispatcher
            .distribute(
                &envelope("e1"),
                &blueprint.default_channels(),
                DispatchOptions::new(),
            )
            .await
            .unwrap();

        sent.assert_async().await;
        limited.assert_async().await;

        assert_eq!(report.len(), 2);
        let delivered = report.outcome(ChannelKind::ChatBroadcast).unwrap();
        assert!(delivered.success);
        assert_eq!(delivered.detail.as_deref(), Some("42"));
        assert!(delivered.latency_ms.is_some());

        let failed = report.outcome(ChannelKind::IssueTracker).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.failure, Some(FailureReason::Connector));
        assert_eq!(failed.detail.as_deref(), Some("rate_limited"));
        assert_eq!(report.failed_channels(), vec![ChannelKind::IssueTracker]);

        let status = dispatcher.status();
        assert!(status.healthy);
        assert!(status.connectors[&ChannelKind::ChatBroadcast].active);
        assert_eq!(
            status.connectors[&ChannelKind::IssueTracker]
                .last_error
                .as_deref(),
            Some("rate_limited")
        );

        observability::record_report(&report);
        let mut aggregator = DistributionStatsAggregator::new();
        aggregator.update(&report);
        let summary = aggregator.summary();
        assert_eq!((summary.delivered, summary.failed), (1, 1));
    }

    #[tokio::test]
    async fn test_health_check_isolates_bad_probes() {
        let ok = Arc::new(MockConnector::new(ChannelKind::ChatBroadcast));
        let panicking =
            Arc::new(MockConnector::new(ChannelKind::Webhook).with_probe(MockBehavior::Panic));
        let hanging =
            Arc::new(MockConnector::new(ChannelKind::SocialQueue).with_probe(MockBehavior::Hang));
        let settings = DispatchSettings {
            probe_timeout: Duration::from_millis(50),
            ..DispatchSettings::default()
        };
        let dispatcher = mocked(
            SPLIT_BLUEPRINT,
            settings,
            &[ok.clone(), panicking.clone(), hanging.clone()],
        );

        let health = dispatcher.registry().check_all_health().await;
        assert_eq!(health.len(), 3);
        assert!(health[&ChannelKind::ChatBroadcast]);
        assert!(!health[&ChannelKind::Webhook]);
        assert!(!health[&ChannelKind::SocialQueue]);

        let status = dispatcher.status();
        assert!(status.healthy);
        let webhook_error = status.connectors[&ChannelKind::Webhook]
            .last_error
            .clone()
            .unwrap();
        assert!(webhook_error.starts_with("probe panicked"));
        assert_eq!(
            status.connectors[&ChannelKind::SocialQueue]
                .last_error
                .as_deref(),
            Some("probe timeout")
        );
        assert_eq!(ok.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_split_policy_is_stable_per_envelope() {
        let channels = [ChannelKind::Webhook, ChannelKind::SocialQueue];
        let first = mocked(
            SPLIT_BLUEPRINT,
            DispatchSettings::default(),
            &[
                Arc::new(MockConnector::new(ChannelKind::Webhook)),
                Arc::new(MockConnector::new(ChannelKind::SocialQueue)),
            ],
        );
        let second = mocked(
            SPLIT_BLUEPRINT,
            DispatchSettings::default(),
            &[
                Arc::new(MockConnector::new(ChannelKind::Webhook)),
                Arc::new(MockConnector::new(ChannelKind::SocialQueue)),
            ],
        );

        for id in ["launch-1", "launch-2", "launch-3", "launch-4"] {
            let a = first
                .distribute(&envelope(id), &channels, DispatchOptions::new())
                .await
                .unwrap();
            let b = second
                .distribute(&envelope(id), &channels, DispatchOptions::new())
                .await
                .unwrap();

            let variants: Vec<_> = a.outcomes().iter().map(|o| o.variant.clone()).collect();
            assert_eq!(
                variants,
                b.outcomes()
                    .iter()
                    .map(|o| o.variant.clone())
                    .collect::<Vec<_>>()
            );
            assert_eq!(variants[0], variants[1], "one bucket per envelope");
            assert!(variants[0].is_some());
        }
    }

    #[tokio::test]
    async fn test_explicit_variant_and_prerendered_text() {
        let webhook = Arc::new(MockConnector::new(ChannelKind::Webhook));
        let social = Arc::new(MockConnector::new(ChannelKind::SocialQueue));
        let dispatcher = mocked(
            SPLIT_BLUEPRINT,
            DispatchSettings::default(),
            &[webhook.clone(), social.clone()],
        );

        let envelope = envelope("e2").with_rendered(ChannelKind::SocialQueue, "hand written");
        let channels = [ChannelKind::Webhook, ChannelKind::SocialQueue];

        dispatcher
            .distribute(&envelope, &channels, DispatchOptions::new())
            .await
            .unwrap();
        assert_eq!(social.payloads()[0].text, "hand written");

        let report = dispatcher
            .distribute(&envelope, &channels, DispatchOptions::new().with_variant("b"))
            .await
            .unwrap();
        assert!(report.is_complete_success());
        assert_eq!(webhook.payloads()[1].text, "B Release 1.2");
        assert_eq!(social.payloads()[1].text, "B Release 1.2");
    }

    #[tokio::test]
    async fn test_rejected_requests_call_no_connector() {
        let webhook = Arc::new(MockConnector::new(ChannelKind::Webhook));
        let dispatcher = mocked(
            SPLIT_BLUEPRINT,
            DispatchSettings::default(),
            &[webhook.clone()],
        );

        let err = dispatcher
            .distribute(
                &envelope("e3"),
                &[ChannelKind::Webhook, ChannelKind::IssueTracker],
                DispatchOptions::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownChannel(ChannelKind::IssueTracker));
        assert_eq!(webhook.send_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let webhook = Arc::new(MockConnector::new(ChannelKind::Webhook));
        let social = Arc::new(MockConnector::new(ChannelKind::SocialQueue));
        let dispatcher = mocked(
            SPLIT_BLUEPRINT,
            DispatchSettings::default(),
            &[webhook.clone(), social.clone()],
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = dispatcher
            .distribute(
                &envelope("e4"),
                &[ChannelKind::SocialQueue, ChannelKind::Webhook],
                DispatchOptions::new().with_cancel(cancel),
            )
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        assert!(report
            .outcomes()
            .iter()
            .all(|o| o.failure == Some(FailureReason::Cancelled)));
        assert_eq!(webhook.send_count() + social.send_count(), 0);
        assert!(dispatcher
            .status()
            .connectors
            .values()
            .all(|d| d.last_checked_at.is_none()));
    }

    #[tokio::test]
    async fn test_one_slow_channel_does_not_block_others() {
        let slow = Arc::new(MockConnector::new(ChannelKind::Webhook).hangs());
        let fast = Arc::new(MockConnector::new(ChannelKind::SocialQueue).succeed("queued-1"));
        let settings = DispatchSettings {
            timeout: Duration::from_millis(100),
            ..DispatchSettings::default()
        };
        let dispatcher = mocked(SPLIT_BLUEPRINT, settings, &[slow, fast]);

        let report = dispatcher
            .distribute(
                &envelope("e5"),
                &[ChannelKind::Webhook, ChannelKind::SocialQueue],
                DispatchOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.outcomes()[0].failure, Some(FailureReason::Timeout));
        assert_eq!(report.outcomes()[1].detail.as_deref(), Some("queued-1"));

        let metrics = dispatcher.metrics();
        let webhook = metrics
            .iter()
            .find(|(kind, _)| *kind == ChannelKind::Webhook)
            .map(|(_, snapshot)| *snapshot)
            .unwrap();
        assert_eq!(webhook.timed_out, 1);
    }
}
