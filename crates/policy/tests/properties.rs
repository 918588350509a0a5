#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    readgate_policy::{
        Arguments, AuditRecord, AuditSink, CallGate, ChannelKind, ChannelScope, Decision, Domain,
        DomainPolicy, GateError, SECURITY_MARKER, ToolDescriptor, Transport, filter_catalog,
        validate_query_document,
    },
    serde_json::{Value, json},
};

fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

#[test]
fn lists_are_disjoint_and_classify_as_listed() {
    for domain in Domain::ALL {
        let classifier = domain.classifier().unwrap();
        let white: Vec<String> = classifier.whitelist().map(String::from).collect();
        let black: Vec<String> = classifier.blacklist().map(String::from).collect();
        for name in &white {
            assert!(!black.contains(name), "{domain}: {name} in both lists");
            assert_eq!(classifier.classify(name).decision, Decision::Allow);
        }
        for name in &black {
            assert_eq!(classifier.classify(name).decision, Decision::Deny);
        }
    }
}

#[test]
fn classification_ignores_case() {
    let classifier = Domain::Monday.classifier().unwrap();
    assert_eq!(
        classifier.classify("GET_BOARDS").decision,
        classifier.classify("get_boards").decision
    );
    let slack = Domain::Slack.classifier().unwrap();
    assert_eq!(
        slack.classify("CHAT.POSTMESSAGE").decision,
        slack.classify("chat.postMessage").decision
    );
}

#[test]
fn unknown_names_fail_safe() {
    let classifier = Domain::Monday.classifier().unwrap();
    for name in ["launch", "x", "boards", "do_thing", "!!", "   "] {
        assert_eq!(classifier.classify(name).decision, Decision::Deny, "{name}");
    }
}

#[test]
fn catalog_is_an_allowed_subsequence() {
    let classifier = Domain::Monday.classifier().unwrap();
    let input: Vec<ToolDescriptor> = [
        "get_boards",
        "create_item",
        "list_items",
        "delete_board",
        "mcp_monday-mcp_get_board_info",
        "mystery",
    ]
    .into_iter()
    .map(ToolDescriptor::named)
    .collect();

    let output = filter_catalog(&classifier, &input);
    assert!(output.len() <= input.len());
    let mut cursor = input.iter();
    for tool in &output {
        assert!(classifier.classify(&tool.name).is_allowed());
        assert!(cursor.any(|t| t == tool), "{} out of order", tool.name);
    }

    let three_tools: Vec<ToolDescriptor> = ["get_boards", "create_item", "list_items"]
        .into_iter()
        .map(ToolDescriptor::named)
        .collect();
    let names: Vec<String> = filter_catalog(&classifier, &three_tools)
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, ["get_boards", "list_items"]);
}

#[test]
fn query_documents() {
    assert!(validate_query_document("query { boards { name } }").is_ok());
    assert!(validate_query_document("query { boards { name } } # mentions mutation and create").is_ok());
    for doc in [
        "mutation { create_item(board_id: 1) { id } }",
        "mutation CreateIt { create_item(board_id: 1) { id } }",
    ] {
        let err = validate_query_document(doc).unwrap_err();
        assert!(matches!(err, GateError::QueryRejected { .. }));
        assert!(err.to_string().contains("mutation"));
    }
}

#[test]
fn forbidden_channel_categories() {
    let scope = ChannelScope::from_csv("C1,C2,C3");
    for kind in ["private_channel", "im", "mpim"] {
        let kind: ChannelKind = kind.parse().unwrap();
        assert!(matches!(
            scope.validate("C1", Some(kind)),
            Err(GateError::AccessDenied { .. })
        ));
    }
}

struct CountingTransport {
    calls: AtomicUsize,
    last: Mutex<Option<Arguments>>,
}

#[async_trait]
impl Transport for CountingTransport {
    async fn list_operations(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
        Ok(Vec::new())
    }

    async fn invoke(&self, _operation: &str, arguments: Arguments) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        *self.last.lock().unwrap() = Some(arguments);
        Ok(json!({"ok": true}))
    }
}

struct Discard;

impl AuditSink for Discard {
    fn record(&self, _record: AuditRecord) {}
}

fn gate(board: Option<&str>) -> (CallGate, Arc<CountingTransport>) {
    let transport = Arc::new(CountingTransport {
        calls: AtomicUsize::new(0),
        last: Mutex::new(None),
    });
    let gate = CallGate::new(
        Arc::new(DomainPolicy::monday(board.map(String::from)).unwrap()),
        transport.clone(),
        Arc::new(Discard),
    );
    (gate, transport)
}

#[tokio::test]
async fn guarded_invoke_examples() {
    let (g, transport) = gate(None);
    let err = g
        .invoke("create_item", args(json!({"board_id": "123"})))
        .await
        .unwrap_err();
    assert!(err.to_string().contains(SECURITY_MARKER));
    assert_eq!(err.operation(), Some("create_item"));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

    let (g, transport) = gate(Some("555"));
    g.invoke("get_board_items", Arguments::new()).await.unwrap();
    let forwarded = transport.last.lock().unwrap().clone().unwrap();
    assert_eq!(forwarded.get("board_id"), Some(&json!("555")));

    let err = g
        .invoke("get_board_items", args(json!({"board_id": "999"})))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::AccessDenied { .. }));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_share_one_policy() {
    let (g, transport) = gate(Some("555"));
    let mut handles = Vec::new();
    for i in 0..64 {
        let g = g.clone();
        handles.push(tokio::spawn(async move {
            let name = if i % 2 == 0 { "get_board_items" } else { "delete_item" };
            g.invoke(name, Arguments::new()).await
        }));
    }

    let mut allowed = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => allowed += 1,
            Err(e) => {
                assert!(e.is_policy_rejection());
                denied += 1;
            },
        }
    }
    assert_eq!((allowed, denied), (32, 32));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 32);
}
