//! End-to-end routing tests
//!
//! Drives the public API from utterance to JSON response with scripted
//! classifiers, a recording browser, and canned data providers.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use voxroute::classifier::{LlmClassifier, StaticClassifier};
use voxroute::domain::{ErrorKind, FallbackReason, HandlerResponse, Organ, TOOL_DATA_KEY};
use voxroute::handlers::RecordingLauncher;
use voxroute::llm::{CompletionResponse, MockLlmClient, StopReason, ToolCall};
use voxroute::store::DomainStore;
use voxroute::tools::{MockProvider, Tool};
use voxroute::{MasterRouter, RouterSettings};

struct Harness {
    router: MasterRouter,
    launcher: Arc<RecordingLauncher>,
    provider: Arc<MockProvider>,
}

fn harness(store: DomainStore, classifier: StaticClassifier, provider: MockProvider) -> Harness {
    let launcher = Arc::new(RecordingLauncher::new());
    let provider = Arc::new(provider);
    let router = MasterRouter::new(
        store.shared(),
        Arc::new(classifier),
        launcher.clone(),
        provider.clone(),
        provider.clone(),
        RouterSettings::default(),
    );
    Harness {
        router,
        launcher,
        provider,
    }
}

fn builtin(classifier: StaticClassifier) -> Harness {
    harness(DomainStore::builtin(), classifier, MockProvider::new())
}

#[tokio::test]
async fn test_navigation_home_opens_once() {
    let h = builtin(StaticClassifier::label("navigation", 0.93));
    let response = h.router.route("take me home").await;

    assert_eq!(
        response.to_json().unwrap(),
        json!({
            "type": "navigation",
            "result": "Successfully navigated to home page (https://google.com)",
            "page": "home",
            "url": "https://google.com"
        })
    );
    assert_eq!(h.launcher.opened(), vec!["https://google.com".to_string()]);
    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn test_navigation_unknown_page_never_launches() {
    let h = builtin(StaticClassifier::label("navigation", 0.93));
    let response = h.router.route("open the billing page").await;

    match response {
        HandlerResponse::Error(e) => {
            assert_eq!(e.kind, ErrorKind::UnresolvedTarget);
            assert_eq!(e.error, "billing not found");
        }
        other => panic!("unexpected response {other:?}"),
    }
    assert!(h.launcher.opened().is_empty());
}

#[tokio::test]
async fn test_low_confidence_touches_no_handler() {
    let h = harness(
        DomainStore::builtin(),
        StaticClassifier::label("general_tools", 0.42),
        MockProvider::new().with_response("get_weather_tool", json!({"temp": 30.0})),
    );
    let response = h.router.route("weather in Surat").await;

    let json = response.to_json().unwrap();
    assert_eq!(json["type"], "conversation");
    assert_eq!(json["reason"], "low_confidence");
    assert_eq!(h.provider.call_count(), 0);
    assert!(h.launcher.opened().is_empty());
}

#[tokio::test]
async fn test_weather_in_surat() {
    let provider = MockProvider::new()
        .with_place("Surat", 21.17, 72.83, "Surat, India")
        .with_response("get_weather_tool", json!({"temp": 25.5, "cond": "Partly Cloudy"}));
    let h = harness(DomainStore::builtin(), StaticClassifier::label("general_tools", 0.88), provider);

    let response = h.router.route("What's the weather in Surat?").await;

    assert_eq!(
        response.to_json().unwrap(),
        json!({
            "type": "tool",
            "tool": "get_weather_tool",
            "temperature": 25.5,
            "condition": "Partly Cloudy",
            "location": "Surat, India"
        })
    );
    // one geocode, one fetch
    assert_eq!(h.provider.call_count(), 2);
    assert!(h.launcher.opened().is_empty());
}

#[tokio::test]
async fn test_unknown_location_is_provider_failure() {
    let provider = MockProvider::new().with_response("get_weather_tool", json!({"temp": 1.0}));
    let h = harness(DomainStore::builtin(), StaticClassifier::label("general_tools", 0.88), provider);

    let response = h.router.route("what's the weather in Atlantis").await;
    assert_eq!(response.error_kind(), Some(ErrorKind::ProviderFailure));
    assert!(h.provider.recorded_calls().is_empty());
}

#[tokio::test]
async fn test_medical_site_belongs_to_organ() {
    let store = DomainStore::builtin();
    let h = builtin(StaticClassifier::label("medical", 0.97));

    for text in [
        "Gastroscopy, biopsy from the antrum for histology",
        "colonoscopy, polyp removed from the sigmoid colon",
        "upper GI endoscopy, biopsy from the sigmoid colon",
    ] {
        match h.router.route(text).await {
            HandlerResponse::Medical(m) => {
                if let Some(site) = &m.record.site {
                    assert!(store.medical.is_valid_site(m.record.organ, site), "{text}: {site}");
                } else {
                    assert!(!m.complete);
                }
            }
            other => panic!("{text}: unexpected response {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_medical_record_shape() {
    let h = builtin(StaticClassifier::label("medical", 0.97));
    let json = h
        .router
        .route("Gastroscopy, biopsy from the antrum for histology")
        .await
        .to_json()
        .unwrap();

    assert_eq!(json["type"], "medical");
    assert_eq!(json["organ"], Organ::UpperGit.as_str());
    assert_eq!(json["site"], "Antrum");
    assert!(json["procedure_types"].as_array().unwrap().contains(&json!("Biopsy")));
}

#[tokio::test]
async fn test_routing_is_repeatable() {
    let h = builtin(StaticClassifier::label("medical", 0.8));
    let text = "OGD: biopsies from D2 and antral brushing, send for histopathology";

    let first = h.router.route(text).await;
    let second = h.router.route(text).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_responses_survive_json_roundtrip() {
    let mut store = DomainStore::builtin();
    store
        .tools
        .add(Tool::new("fact_api", "Random fact", "https://example.com/fact").with_keywords(&["fact"]));

    let cases = [
        ("navigation", 0.9, "take me home", "navigation"),
        ("navigation", 0.3, "take me home", "conversation"),
        ("medical", 0.9, "upper GI endoscopy, biopsy from the sigmoid colon", "medical"),
        ("general_tools", 0.9, "tell me a joke", "tool"),
        ("general_tools", 0.9, "give me a fact", "tool"),
        ("general_tools", 0.9, "book me a flight", "error"),
        ("general_conversation", 0.9, "how are you", "conversation"),
    ];

    for (label, confidence, utterance, expected_type) in cases {
        let provider = MockProvider::new()
            .with_response("joke_api", json!({"setup": "Why?", "punchline": "Because."}))
            .with_response("fact_api", json!({"type": "trivia", "tool": "abacus", "text": "Honey never spoils."}));
        let h = harness(store.clone(), StaticClassifier::label(label, confidence), provider);

        let response = h.router.route(utterance).await;
        let json = response.to_json().unwrap();
        assert_eq!(json["type"], expected_type, "{utterance}");

        let restored = HandlerResponse::from_json(json).unwrap();
        assert_eq!(restored, response, "{utterance}");
    }
}

#[tokio::test]
async fn test_colliding_payload_keys_are_kept() {
    let mut store = DomainStore::builtin();
    store
        .tools
        .add(Tool::new("fact_api", "Random fact", "https://example.com/fact").with_keywords(&["fact"]));
    let payload = json!({"type": "trivia", "tool": "abacus", "text": "Honey never spoils."});
    let h = harness(
        store,
        StaticClassifier::label("general_tools", 0.9),
        MockProvider::new().with_response("fact_api", payload.clone()),
    );

    let json = h.router.route("give me a fact").await.to_json().unwrap();
    assert_eq!(json["type"], "tool");
    assert_eq!(json["tool"], "fact_api");
    assert_eq!(json[TOOL_DATA_KEY], payload);
}

#[tokio::test]
async fn test_medical_issues_roundtrip() {
    let h = builtin(StaticClassifier::label("medical", 0.9));
    let response = h.router.route("upper GI endoscopy, biopsy from the sigmoid colon").await;

    match &response {
        HandlerResponse::Medical(m) => assert!(!m.issues.is_empty()),
        other => panic!("unexpected response {other:?}"),
    }
    let text = serde_json::to_string(&response).unwrap();
    let restored: HandlerResponse = serde_json::from_str(&text).unwrap();
    assert_eq!(restored, response);
}

#[tokio::test]
async fn test_function_call_mode_end_to_end() {
    let h = builtin(StaticClassifier::failing("not used in function-call mode"));
    let client = MockLlmClient::new(vec![CompletionResponse {
        tool_calls: vec![ToolCall::new(
            "toolu_1",
            "extract_medical_info",
            json!({"user_query": "colonoscopy, biopsy from the caecum"}),
        )],
        stop_reason: StopReason::ToolUse,
        ..Default::default()
    }])
    .with_text("Happy to chat!");

    match h.router.route_function_call(&client, "colonoscopy, biopsy from the caecum").await {
        HandlerResponse::Medical(m) => {
            assert_eq!(m.record.organ, Organ::LowerGit);
            assert_eq!(m.record.site.as_deref(), Some("Caecum"));
        }
        other => panic!("unexpected response {other:?}"),
    }

    let response = h.router.route_function_call(&client, "good morning").await;
    let json = response.to_json().unwrap();
    assert_eq!(json["reason"], "no_function_call");
    assert!(json.get("confidence").is_none());
    assert_eq!(HandlerResponse::from_json(json).unwrap(), response);

    let offered: Vec<String> = client.requests()[0].tools.iter().map(|t| t.name.clone()).collect();
    assert!(offered.contains(&"navigate_to_page".to_string()));
    assert!(offered.contains(&"get_weather_tool".to_string()));
    assert!(h.launcher.opened().is_empty());
}

#[tokio::test]
async fn test_llm_classifier_end_to_end() {
    let store = DomainStore::builtin();
    let client = Arc::new(
        MockLlmClient::default()
            .with_text(r#"{"intent": "navigation", "confidence": 0.92, "target": "settings"}"#)
            .with_text("I could not decide"),
    );
    let classifier = LlmClassifier::new(client.clone()).with_store(&store);
    let launcher = Arc::new(RecordingLauncher::new());
    let provider = Arc::new(MockProvider::new());
    let router = MasterRouter::new(
        store.shared(),
        Arc::new(classifier),
        launcher.clone(),
        provider.clone(),
        provider,
        RouterSettings::default(),
    );

    let response = router.route("show me my preferences").await;
    assert!(matches!(response, HandlerResponse::Navigation(ref n) if n.page == "settings"));

    let response = router.route("hmm").await;
    assert_eq!(response.error_kind(), Some(ErrorKind::ClassificationUnavailable));

    assert_eq!(client.call_count(), 2);
    assert_eq!(launcher.opened().len(), 1);
}

#[tokio::test]
async fn test_custom_registry_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("registry.yml");
    std::fs::write(
        &path,
        r#"
pages:
  - name: reports
    url: https://example.com/reports
    aliases: [my reports]
"#,
    )
    .unwrap();

    let store = DomainStore::from_file(&path).unwrap();
    let h = harness(store, StaticClassifier::label("navigation", 0.9), MockProvider::new());

    let response = h.router.route("open my reports").await;
    assert!(matches!(response, HandlerResponse::Navigation(ref n) if n.url == "https://example.com/reports"));

    let response = h.router.route("go home").await;
    assert_eq!(response.error_kind(), Some(ErrorKind::UnresolvedTarget));
    assert_eq!(h.launcher.opened().len(), 1);
}

#[tokio::test]
async fn test_general_conversation_passthrough() {
    let h = builtin(StaticClassifier::label("general_conversation", 0.99));
    match h.router.route("how are you today?").await {
        HandlerResponse::Conversation(c) => {
            assert_eq!(c.reason, FallbackReason::GeneralIntent);
            assert_eq!(c.query, "how are you today?");
        }
        other => panic!("unexpected response {other:?}"),
    }
    assert_eq!(h.provider.call_count(), 0);
}
