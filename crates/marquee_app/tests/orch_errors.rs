mod common;

use common::{Fixture, Reply, environment};
use marquee_app::{Graph, ITERATION_LIMIT_ANSWER, NO_CONTEXT_ANSWER, NO_CONTEXT_REPLY, Node};
use marquee_domain::{ChatCompletion, Error, HistoryKind, HistoryStore, Role, SessionId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn domain_error(error: &anyhow::Error) -> Option<&Error> {
    error.downcast_ref::<Error>()
}

#[tokio::test]
async fn test_step_limit_is_a_distinct_error() {
    let fixture = Fixture::with_environment(vec![], environment().max_steps(5usize));
    let orchestrator = fixture.orchestrator.graph(
        Graph::new(Node::Help)
            .edge(Node::Help, Node::NoContext)
            .edge(Node::NoContext, Node::Help),
    );

    let actual = orchestrator.invoke("loop forever").await.unwrap_err();

    assert!(matches!(domain_error(&actual), Some(Error::StepLimitExceeded { limit: 5 })));
    assert_eq!(actual.to_string(), "Conversation exceeded the limit of 5 steps");
}

#[tokio::test]
async fn test_router_failure_is_fatal() {
    let fixture = Fixture::new(vec![Reply::Failure]);

    let actual = fixture.orchestrator.invoke("Top movies?").await.unwrap_err();

    assert!(matches!(domain_error(&actual), Some(Error::Classification(_))));
}

#[tokio::test]
async fn test_retryable_failures_are_retried() {
    let fixture = Fixture::new(vec![Reply::Retryable, Reply::Retryable, Reply::text("NoContext")]);

    let actual = fixture.orchestrator.invoke("Hello there").await.unwrap();

    assert_eq!(actual.answer, NO_CONTEXT_REPLY);
    assert_eq!(fixture.services.completion.calls(), 3);
}

#[tokio::test]
async fn test_filtered_router_completion_means_no_context() {
    let fixture = Fixture::new(vec![Reply::Completion(ChatCompletion::content_filtered())]);

    let actual = fixture.orchestrator.invoke("something inappropriate").await.unwrap();

    assert_eq!(actual.answer, NO_CONTEXT_REPLY);
}

#[tokio::test]
async fn test_unparseable_pipeline_is_fatal() {
    let fixture = Fixture::new(vec![
        Reply::text("Movies"),
        Reply::tool_call("call_1", "get_movies", json!({"query": "best movies"})),
        Reply::text("Sorry, I cannot write that query."),
    ]);

    let actual = fixture.orchestrator.invoke("Best movies?").await.unwrap_err();

    match domain_error(&actual) {
        Some(Error::Parse { original, .. }) => {
            assert_eq!(original, "Sorry, I cannot write that query.")
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_stage_is_an_execution_error() {
    let fixture = Fixture::new(vec![
        Reply::text("Visualization"),
        Reply::text("Retrieve all movies."),
        Reply::text(r#"[{"$lookup": {"from": "comments", "as": "c"}}]"#),
    ]);

    let actual = fixture.orchestrator.invoke("Chart everything").await.unwrap_err();

    assert!(matches!(domain_error(&actual), Some(Error::Execution(_))));
}

#[tokio::test]
async fn test_rephrase_failure_is_fatal() {
    let fixture = Fixture::new(vec![Reply::text("Visualization"), Reply::Failure]);

    let actual = fixture.orchestrator.invoke("Chart ratings").await.unwrap_err();

    assert!(matches!(domain_error(&actual), Some(Error::Rephrase(_))));
}

#[tokio::test]
async fn test_bad_tool_calls_become_observations() {
    let fixture = Fixture::new(vec![
        Reply::text("Movies"),
        Reply::tool_call("call_1", "run_shell", json!({"cmd": "ls"})),
        Reply::tool_call("call_2", "get_movies", json!({"q": 1})),
        Reply::tool_call("call_3", "not_able_to_parse", json!({})),
        Reply::text("I cannot answer that."),
    ]);

    let actual = fixture.orchestrator.invoke("Tell me a joke").await.unwrap();
    assert_eq!(actual.answer, "I cannot answer that.");

    let requests = fixture.requests();
    let observations = requests[4]
        .messages
        .iter()
        .filter(|message| message.role == Role::Tool)
        .map(|message| message.content.clone())
        .collect::<Vec<_>>();
    assert_eq!(observations.len(), 3);
    assert_eq!(observations[0], "Error: Tool run_shell not found");
    assert!(observations[1].starts_with("Error: Invalid tool call arguments"));
    assert_eq!(observations[2], NO_CONTEXT_ANSWER);
}

#[tokio::test]
async fn test_agent_stops_at_the_iteration_limit() {
    let fixture = Fixture::with_environment(
        vec![
            Reply::text("Movies"),
            Reply::tool_call("call_1", "not_able_to_parse", json!({})),
            Reply::tool_call("call_2", "not_able_to_parse", json!({})),
        ],
        environment().max_agent_iterations(2usize),
    );

    let actual = fixture.orchestrator.invoke("Anything?").await.unwrap();

    assert_eq!(actual.answer, ITERATION_LIMIT_ANSWER);
    assert_eq!(fixture.services.completion.calls(), 3);

    let history = fixture
        .services
        .history
        .read(&SessionId::default(), HistoryKind::Answer)
        .await;
    assert_eq!(history.last().map(|m| m.content.as_str()), Some(ITERATION_LIMIT_ANSWER));
}
