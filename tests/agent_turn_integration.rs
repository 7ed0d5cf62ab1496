//! End-to-end turns through the agent loop against mock collaborators.
//!
//! Covers the verified happy path, the empty-source fallback path,
//! context compaction mid-conversation, and iteration exhaustion.

use std::sync::Arc;
use std::time::Duration;

use fixmaster::adapters::ai::MockReasoningEngine;
use fixmaster::adapters::knowledge::MockKnowledgeConnector;
use fixmaster::adapters::search::MockSearchConnector;
use fixmaster::adapters::session::InMemorySessionStore;
use fixmaster::adapters::usage::InMemoryUsageTracker;
use fixmaster::application::agent::{
    AgentOrchestrator, ContextManager, OrchestratorConfig, ToolRegistry, TurnRequest,
};
use fixmaster::domain::agent::tools::ToolCallRequest;
use fixmaster::domain::agent::{SafetyLevel, SourceTag, TurnOutcome};
use fixmaster::domain::conversation::Message;
use fixmaster::domain::foundation::{GuideId, SessionId, UserId};
use fixmaster::ports::{
    ChatRole, Citation, DeviceHit, GroundedAnswer, Guide, GuideStep, GuideSummary, SessionStore,
    UsageTracker,
};

struct Harness {
    engine: MockReasoningEngine,
    search: MockSearchConnector,
    store: Arc<InMemorySessionStore>,
    usage: Arc<InMemoryUsageTracker>,
    orchestrator: AgentOrchestrator,
}

fn harness(
    engine: MockReasoningEngine,
    knowledge: MockKnowledgeConnector,
    search: MockSearchConnector,
) -> Harness {
    let shared_engine = Arc::new(engine.clone());
    let store = Arc::new(InMemorySessionStore::new());
    let usage = Arc::new(InMemoryUsageTracker::new());

    let registry = Arc::new(ToolRegistry::new(
        Arc::new(knowledge),
        Arc::new(search.clone()),
        Duration::from_secs(5),
    ));
    let context = Arc::new(ContextManager::new(
        store.clone(),
        shared_engine.clone(),
        20,
        Duration::from_secs(5),
    ));
    let orchestrator = AgentOrchestrator::new(
        shared_engine,
        registry,
        context,
        usage.clone(),
        OrchestratorConfig::default(),
    );

    Harness {
        engine,
        search,
        store,
        usage,
        orchestrator,
    }
}

fn batch(id: &str, name: &str, args: serde_json::Value) -> TurnOutcome {
    TurnOutcome::ToolBatch {
        calls: vec![ToolCallRequest::new(id, name, args)],
    }
}

fn user() -> UserId {
    UserId::new("user-1").unwrap()
}

fn dualsense_knowledge() -> MockKnowledgeConnector {
    MockKnowledgeConnector::new()
        .with_devices(vec![DeviceHit {
            title: "PlayStation 5 DualSense".to_string(),
            url: "https://www.ifixit.com/Device/PlayStation_5_DualSense".to_string(),
        }])
        .with_guides(vec![GuideSummary {
            id: GuideId::new(8247),
            title: "Joystick Replacement".to_string(),
            summary: "Replace a drifting analog stick module".to_string(),
        }])
        .with_guide(
            GuideId::new(8247),
            Guide {
                title: "Joystick Replacement".to_string(),
                steps: vec![
                    GuideStep {
                        text: "Power off the controller.".to_string(),
                        image_url: None,
                    },
                    GuideStep {
                        text: "Disconnect the battery connector.".to_string(),
                        image_url: Some("https://img.example.com/2.jpg".to_string()),
                    },
                ],
                url: "https://www.ifixit.com/Guide/8247".to_string(),
            },
        )
}

// ── Scenario A: verified happy path ─────────────────────────────────────────

#[tokio::test]
async fn verified_path_retrieves_steps_through_all_three_tools() {
    let engine = MockReasoningEngine::new()
        .with_outcome(batch(
            "c1",
            "search_device",
            serde_json::json!({"query": "PS5 DualSense drift"}),
        ))
        .with_outcome(batch(
            "c2",
            "list_guides",
            serde_json::json!({"device_title": "PlayStation 5 DualSense"}),
        ))
        .with_outcome(batch(
            "c3",
            "get_repair_steps",
            serde_json::json!({"guide_id": 8247}),
        ))
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "1. Power off the controller.\n2. Disconnect the battery connector."
                .to_string(),
        });
    let h = harness(engine, dualsense_knowledge(), MockSearchConnector::new());

    let response = h
        .orchestrator
        .process_turn(TurnRequest::new(
            SessionId::new(),
            user(),
            "PS5 DualSense drift",
        ))
        .await
        .unwrap();

    assert_eq!(response.source_tag, SourceTag::Verified);
    assert_eq!(
        response.tools_used,
        vec!["search_device", "list_guides", "get_repair_steps"]
    );
    // Answer mentions the battery: warning tier.
    assert_eq!(response.safety_level, SafetyLevel::Warning);
    // Three unmetered rounds: base 1200 + 3 x 300.
    assert_eq!(response.estimated_tokens, 2100);
    // Fallback never fired.
    assert_eq!(h.search.call_count(), 0);
}

#[tokio::test]
async fn verified_turn_is_recorded_against_the_usage_tracker() {
    let engine = MockReasoningEngine::new().with_outcome(TurnOutcome::FinalAnswer {
        text: "General cleaning advice.".to_string(),
    });
    let h = harness(engine, dualsense_knowledge(), MockSearchConnector::new());
    let session_id = SessionId::new();

    h.orchestrator
        .process_turn(TurnRequest::new(
            session_id,
            user(),
            "how do I clean the controller?",
        ))
        .await
        .unwrap();

    let records = h.usage.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_tag, SourceTag::Verified);
    assert_eq!(records[0].rounds, 0);
    assert_eq!(records[0].estimated_tokens, 1200);
    assert_eq!(h.usage.total_for_session(session_id).await.unwrap(), 1200);
}

// ── Scenario B: empty verified source triggers one-shot fallback ────────────

#[tokio::test]
async fn empty_device_search_falls_back_to_web_search_once() {
    let engine = MockReasoningEngine::new()
        // Verified phase: one lookup that comes back empty, then the model
        // reports the miss.
        .with_outcome(batch(
            "c1",
            "search_device",
            serde_json::json!({"query": "Quantum Phone X99"}),
        ))
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "The manual source reports this device was not found.".to_string(),
        })
        // Fallback phase: one web search, then the grounded answer.
        .with_outcome(batch(
            "c2",
            "web_search",
            serde_json::json!({"query": "Quantum Phone X99 screen repair"}),
        ))
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Community guides suggest a standard screen swap. Source: forum.example.com"
                .to_string(),
        });
    let search = MockSearchConnector::new().with_answer(GroundedAnswer::new(
        "Standard screen swap applies.",
        vec![Citation {
            title: "Repair forum".to_string(),
            url: "https://forum.example.com/x99".to_string(),
        }],
    ));
    let h = harness(engine, MockKnowledgeConnector::new(), search);

    let response = h
        .orchestrator
        .process_turn(TurnRequest::new(
            SessionId::new(),
            user(),
            "How do I fix a Quantum Phone X99 screen?",
        ))
        .await
        .unwrap();

    assert_eq!(response.source_tag, SourceTag::Fallback);
    assert_eq!(h.search.call_count(), 1);
    assert_eq!(
        response.tools_used,
        vec!["search_device", "web_search"]
    );
    // Unmetered fallback: flat heuristic.
    assert_eq!(response.estimated_tokens, 2200);
}

#[tokio::test]
async fn not_found_sentinel_alone_triggers_fallback() {
    // No tool rounds at all: the model just answers with the sentinel.
    let engine = MockReasoningEngine::new()
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Not found in the documentation I can access.".to_string(),
        })
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Here is what the community suggests instead.".to_string(),
        });
    let h = harness(engine, MockKnowledgeConnector::new(), MockSearchConnector::new());

    let response = h
        .orchestrator
        .process_turn(TurnRequest::new(
            SessionId::new(),
            user(),
            "fix my obscure gadget",
        ))
        .await
        .unwrap();

    assert_eq!(response.source_tag, SourceTag::Fallback);
    assert_eq!(response.text, "Here is what the community suggests instead.");
}

// ── Scenario C: long sessions are compacted before reasoning ────────────────

#[tokio::test]
async fn long_session_is_summarized_before_the_next_reasoning_call() {
    let engine = MockReasoningEngine::new()
        .with_text("User has been troubleshooting a laptop fan.")
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Try reseating the fan cable.".to_string(),
        });
    let h = harness(engine, MockKnowledgeConnector::new(), MockSearchConnector::new());
    let session_id = SessionId::new();

    for i in 0..25 {
        h.store
            .append_message(session_id, Message::user(format!("prior message {i}")).unwrap())
            .await
            .unwrap();
    }

    h.orchestrator
        .process_turn(TurnRequest::new(
            session_id,
            user(),
            "any other ideas?",
        ))
        .await
        .unwrap();

    // The reasoning call saw exactly one summary message plus at most 20
    // recent messages, in chronological order.
    let requests = h.engine.captured_requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert!(messages.len() <= 21);
    let summaries = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .count();
    assert_eq!(summaries, 1);
    assert!(messages[0].content.contains("laptop fan"));

    // The stored log was pruned: 26 - 16 = 10 before the answer landed.
    assert!(h.store.load_summary(session_id).await.unwrap().is_some());
    let remaining = h.store.fetch_all(session_id).await.unwrap();
    assert_eq!(remaining.len(), 11); // 10 survivors + assistant answer
}

// ── Scenario D: iteration exhaustion with a dry fallback ────────────────────

#[tokio::test]
async fn four_tool_rounds_stop_after_three_and_apologize() {
    let mut engine = MockReasoningEngine::new();
    for i in 0..5 {
        engine = engine.with_outcome(batch(
            &format!("c{i}"),
            "search_device",
            serde_json::json!({"query": "PS5"}),
        ));
    }
    let h = harness(engine, dualsense_knowledge(), MockSearchConnector::new());

    let response = h
        .orchestrator
        .process_turn(TurnRequest::new(
            SessionId::new(),
            user(),
            "fix it",
        ))
        .await
        .unwrap();

    assert_eq!(response.estimated_tokens, 0);
    assert!(response.text.contains("try again"));
    // Three verified rounds plus the fallback opening call.
    assert_eq!(h.engine.generate_calls(), 4);
    assert_eq!(response.tools_used.len(), 3);
}

// ── Pairing and partial-failure invariants ──────────────────────────────────

#[tokio::test]
async fn every_issued_call_gets_exactly_one_result_before_the_next_round() {
    let engine = MockReasoningEngine::new()
        .with_outcome(TurnOutcome::ToolBatch {
            calls: vec![
                ToolCallRequest::new("call_a", "search_device", serde_json::json!({"query": "PS5"})),
                ToolCallRequest::new("call_b", "search_device", serde_json::json!({"query": 42})),
            ],
        })
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Found it in the manual source.".to_string(),
        });
    let h = harness(engine, dualsense_knowledge(), MockSearchConnector::new());

    h.orchestrator
        .process_turn(TurnRequest::new(
            SessionId::new(),
            user(),
            "fix my PS5",
        ))
        .await
        .unwrap();

    // The second reasoning round received one combined tool turn holding
    // exactly one result per issued call id.
    let requests = h.engine.captured_requests();
    assert_eq!(requests.len(), 2);
    let tool_turn = requests[1]
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::Tool)
        .next_back()
        .expect("tool turn present");
    assert_eq!(tool_turn.content.matches("call_a").count(), 1);
    assert_eq!(tool_turn.content.matches("call_b").count(), 1);
    // The invalid sibling failed without cancelling the valid call.
    assert!(tool_turn.content.contains("error: Tool arguments failed validation"));
    assert!(tool_turn.content.contains("PlayStation 5 DualSense"));
}

// ── Session independence ────────────────────────────────────────────────────

#[tokio::test]
async fn distinct_sessions_process_concurrently_and_independently() {
    let engine = MockReasoningEngine::new()
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Answer one.".to_string(),
        })
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Answer two.".to_string(),
        });
    let h = harness(engine, MockKnowledgeConnector::new(), MockSearchConnector::new());
    let orchestrator = &h.orchestrator;
    let (a, b) = (SessionId::new(), SessionId::new());

    let (ra, rb) = tokio::join!(
        orchestrator.process_turn(TurnRequest::new(
            a,
            user(),
            "first question",
        )),
        orchestrator.process_turn(TurnRequest::new(
            b,
            user(),
            "second question",
        )),
    );

    let (ra, rb) = (ra.unwrap(), rb.unwrap());
    assert_ne!(ra.text, rb.text);
    assert_eq!(h.store.message_count(a).await.unwrap(), 2);
    assert_eq!(h.store.message_count(b).await.unwrap(), 2);
}

#[tokio::test]
async fn same_session_turns_are_serialized_in_order() {
    let engine = MockReasoningEngine::new()
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "First answer.".to_string(),
        })
        .with_outcome(TurnOutcome::FinalAnswer {
            text: "Second answer.".to_string(),
        });
    let h = harness(engine, MockKnowledgeConnector::new(), MockSearchConnector::new());
    let session_id = SessionId::new();

    let first = h
        .orchestrator
        .process_turn(TurnRequest::new(
            session_id,
            user(),
            "question one",
        ))
        .await
        .unwrap();
    let second = h
        .orchestrator
        .process_turn(TurnRequest::new(
            session_id,
            user(),
            "question two",
        ))
        .await
        .unwrap();

    assert_eq!(first.text, "First answer.");
    assert_eq!(second.text, "Second answer.");

    // The log interleaves user and assistant turns in strict order.
    let log = h.store.fetch_all(session_id).await.unwrap();
    let contents: Vec<&str> = log.iter().map(|m| m.content()).collect();
    assert_eq!(
        contents,
        vec!["question one", "First answer.", "question two", "Second answer."]
    );
}

// ── Safety annotation end to end ────────────────────────────────────────────

#[tokio::test]
async fn hazardous_answers_are_flagged_critical() {
    let engine = MockReasoningEngine::new().with_outcome(TurnOutcome::FinalAnswer {
        text: "Warning: the power board carries high voltage even when unplugged.".to_string(),
    });
    let h = harness(engine, MockKnowledgeConnector::new(), MockSearchConnector::new());

    let response = h
        .orchestrator
        .process_turn(TurnRequest::new(
            SessionId::new(),
            user(),
            "how do I open my TV?",
        ))
        .await
        .unwrap();

    assert_eq!(response.safety_level, SafetyLevel::Critical);
}
