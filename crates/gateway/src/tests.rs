use super::*;
use pawline_core::tool::{ParameterKind, ToolDefinition, ToolParameter};
use pawline_protocol::{Frame, Request, Response, RpcError, next_frame, reader, send_frame, writer};
use pawline_tools::ToolServer;
use tokio::io::DuplexStream;

fn fast_options() -> GatewayOptions {
    GatewayOptions {
        connect_timeout: Duration::from_secs(2),
        call_timeout: Duration::from_millis(300),
        ..GatewayOptions::default()
    }
}

fn scheduler() -> Arc<ToolServer> {
    let (registry, _) = pawline_tools::default_registry(3).unwrap();
    Arc::new(ToolServer::new(registry))
}

async fn gateway_over_duplex() -> ToolGateway {
    let (client, server_end) = tokio::io::duplex(64 * 1024);
    tokio::spawn(scheduler().serve_connection(server_end));
    ToolGateway::connect_stream(client, fast_options()).await.unwrap()
}

fn rex_call() -> ToolCall {
    ToolCall {
        id: "call_1".into(),
        name: "schedule".into(),
        arguments: serde_json::json!({"dogId": 42, "dogName": "Rex"}),
    }
}

/// A hand-driven provider: answers the handshake with `tools`, then hands
/// every later request to the test.
async fn scripted_provider(
    tools: Vec<ToolDefinition>,
) -> (
    ToolGateway,
    pawline_protocol::FrameReader<tokio::io::ReadHalf<DuplexStream>>,
    pawline_protocol::FrameWriter<tokio::io::WriteHalf<DuplexStream>>,
) {
    let (client, server_end) = tokio::io::duplex(64 * 1024);
    let (r, w) = tokio::io::split(server_end);
    let (mut frames, mut sink) = (reader(r), writer(w));

    let serve_handshake = async move {
        let Some(Ok(Frame::Request(init))) = next_frame(&mut frames).await else {
            panic!("expected initialize");
        };
        assert_eq!(init.method, methods::INITIALIZE);
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            server_info: PeerInfo::new("scripted", "0"),
            tools,
        };
        send_frame(&mut sink, &Frame::Response(Response::success(init.id, result)))
            .await
            .unwrap();
        (frames, sink)
    };

    let (gateway, (frames, sink)) = tokio::join!(
        ToolGateway::connect_stream(client, fast_options()),
        serve_handshake
    );
    (gateway.unwrap(), frames, sink)
}

async fn next_request<R: AsyncRead + Unpin>(frames: &mut pawline_protocol::FrameReader<R>) -> Request {
    match next_frame(frames).await {
        Some(Ok(Frame::Request(r))) => r,
        other => panic!("expected a request, got {other:?}"),
    }
}

fn echo_tool() -> ToolDefinition {
    ToolDefinition::new(
        "echo",
        "echo the text",
        vec![ToolParameter::required("text", ParameterKind::String, "text")],
    )
}

#[tokio::test]
async fn handshake_discovers_catalog() {
    let gateway = gateway_over_duplex().await;
    assert_eq!(gateway.state(), ConnectionState::Ready);
    assert_eq!(gateway.catalog().names(), vec!["schedule"]);
    assert_eq!(gateway.server_info().name, "pawline-scheduler");
    assert!(gateway.ping().await.is_ok());
}

#[tokio::test]
async fn call_returns_remote_result() {
    let gateway = gateway_over_duplex().await;
    let result = gateway.call(&rex_call()).await.unwrap();
    assert!(result.success);
    assert_eq!(result.call_id, "call_1");
    let when = chrono::DateTime::parse_from_rfc3339(&result.output).unwrap();
    assert!(when.with_timezone(&chrono::Utc) > chrono::Utc::now());
}

#[tokio::test]
async fn unknown_tool_fails_closed() {
    let gateway = gateway_over_duplex().await;
    let err = gateway
        .call(&ToolCall {
            id: "c".into(),
            name: "adopt_all_dogs".into(),
            arguments: serde_json::json!({}),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));
}

#[tokio::test]
async fn malformed_arguments_are_invalid() {
    let gateway = gateway_over_duplex().await;
    let err = gateway
        .call(&ToolCall {
            id: "c".into(),
            name: "schedule".into(),
            arguments: serde_json::json!({"dogId": "Rex"}),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));
}

#[tokio::test]
async fn concurrent_calls_are_correlated_by_id() {
    let (gateway, mut frames, mut sink) = scripted_provider(vec![echo_tool()]).await;
    let gateway = Arc::new(gateway);

    let call = |text: &str| ToolCall {
        id: format!("call_{text}"),
        name: "echo".into(),
        arguments: serde_json::json!({"text": text}),
    };
    let first = tokio::spawn({
        let gateway = gateway.clone();
        let call = call("first");
        async move { gateway.call(&call).await }
    });
    let a = next_request(&mut frames).await;
    let second = tokio::spawn({
        let gateway = gateway.clone();
        let call = call("second");
        async move { gateway.call(&call).await }
    });
    let b = next_request(&mut frames).await;

    // Answer in reverse order.
    for req in [b, a] {
        let params: CallToolParams = req.params().unwrap();
        let reply = Response::success(req.id, CallToolResult::ok(params.arguments["text"].clone()));
        send_frame(&mut sink, &Frame::Response(reply)).await.unwrap();
    }

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.output, "first");
    assert_eq!(first.call_id, "call_first");
    assert_eq!(second.output, "second");
}

#[tokio::test]
async fn remote_errors_keep_their_codes() {
    let (gateway, mut frames, mut sink) = scripted_provider(vec![echo_tool()]).await;
    let gateway = Arc::new(gateway);
    let call = ToolCall {
        id: "c".into(),
        name: "echo".into(),
        arguments: serde_json::json!({"text": "boom"}),
    };

    let pending = tokio::spawn({
        let gateway = gateway.clone();
        let call = call.clone();
        async move { gateway.call(&call).await }
    });
    let req = next_request(&mut frames).await;
    let reply = Response::failure(
        Some(req.id),
        RpcError::new(codes::TOOL_EXECUTION_FAILED, "printer on fire"),
    );
    send_frame(&mut sink, &Frame::Response(reply)).await.unwrap();
    match pending.await.unwrap().unwrap_err() {
        ToolError::RemoteToolError { code, message, .. } => {
            assert_eq!(code, codes::TOOL_EXECUTION_FAILED);
            assert_eq!(message, "printer on fire");
        }
        other => panic!("unexpected {other:?}"),
    }

    let pending = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.call(&call).await }
    });
    let req = next_request(&mut frames).await;
    let reply = Response::failure(Some(req.id), RpcError::new(codes::INVALID_PARAMS, "too loud"));
    send_frame(&mut sink, &Frame::Response(reply)).await.unwrap();
    assert!(matches!(
        pending.await.unwrap().unwrap_err(),
        ToolError::InvalidArguments { .. }
    ));
}

#[tokio::test]
async fn silent_provider_times_out_as_unavailable() {
    let (gateway, mut frames, _sink) = scripted_provider(vec![echo_tool()]).await;
    let call = ToolCall {
        id: "c".into(),
        name: "echo".into(),
        arguments: serde_json::json!({"text": "hello?"}),
    };
    let (result, _) = tokio::join!(gateway.call(&call), next_request(&mut frames));
    assert!(matches!(result, Err(ToolError::RemoteUnavailable(_))));
    // The link itself is still usable.
    assert_eq!(gateway.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn close_fails_outstanding_calls() {
    let (gateway, mut frames, _sink) = scripted_provider(vec![echo_tool()]).await;
    let gateway = Arc::new(gateway);
    let pending = tokio::spawn({
        let gateway = gateway.clone();
        async move {
            gateway
                .call(&ToolCall {
                    id: "c".into(),
                    name: "echo".into(),
                    arguments: serde_json::json!({"text": "wait"}),
                })
                .await
        }
    });
    next_request(&mut frames).await;
    gateway.close().await;

    assert!(matches!(
        pending.await.unwrap(),
        Err(ToolError::RemoteUnavailable(_))
    ));
    assert_eq!(gateway.state(), ConnectionState::Closed);
    let again = gateway
        .call(&ToolCall {
            id: "d".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "still there?"}),
        })
        .await;
    assert!(matches!(again, Err(ToolError::RemoteUnavailable(_))));
    assert!(gateway.ping().await.is_err());
    assert!(gateway.reconnect().await.is_err());
}

#[tokio::test]
async fn provider_hangup_is_observable() {
    let (gateway, frames, sink) = scripted_provider(vec![echo_tool()]).await;
    let mut states = gateway.subscribe_state();
    drop((frames, sink));

    tokio::time::timeout(Duration::from_secs(2), states.wait_for(|s| *s == ConnectionState::Closed))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(gateway.ping().await, Err(ToolError::RemoteUnavailable(_))));
}

#[tokio::test]
async fn rejected_handshake_fails_connect() {
    let (client, server_end) = tokio::io::duplex(4096);
    let (r, w) = tokio::io::split(server_end);
    tokio::spawn(async move {
        let (mut frames, mut sink) = (reader(r), writer(w));
        if let Some(Ok(Frame::Request(req))) = next_frame(&mut frames).await {
            let reply = Response::failure(Some(req.id), RpcError::new(codes::INVALID_PARAMS, "go away"));
            let _ = send_frame(&mut sink, &Frame::Response(reply)).await;
        }
        // Hold the stream open until the client gives up.
        let _ = next_frame(&mut frames).await;
    });
    let err = ToolGateway::connect_stream(client, fast_options()).await.err().unwrap();
    assert!(matches!(err, ToolError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn stream_gateway_cannot_reconnect() {
    let gateway = gateway_over_duplex().await;
    assert!(matches!(
        gateway.reconnect().await,
        Err(ToolError::RemoteUnavailable(_))
    ));
}

#[tokio::test]
async fn tcp_reconnect_keeps_catalog() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(scheduler().serve(listener));

    let gateway = ToolGateway::connect(&addr, fast_options()).await.unwrap();
    let before = gateway.catalog();
    gateway.reconnect().await.unwrap();

    assert_eq!(gateway.state(), ConnectionState::Ready);
    assert_eq!(gateway.catalog(), before);
    assert!(gateway.call(&rex_call()).await.unwrap().success);
    gateway.close().await;
}

#[tokio::test]
async fn nothing_listening_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = ToolGateway::connect(addr, fast_options()).await.err().unwrap();
    assert!(matches!(err, ToolError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn unbounded_timeouts_do_not_overflow() {
    let options = GatewayOptions {
        connect_timeout: Duration::from_secs(i64::MAX as u64),
        call_timeout: Duration::MAX,
        ..GatewayOptions::default()
    };
    let (client, server_end) = tokio::io::duplex(64 * 1024);
    tokio::spawn(scheduler().serve_connection(server_end));
    let gateway = ToolGateway::connect_stream(client, options).await.unwrap();

    assert!(gateway.ping().await.is_ok());
    let result = gateway.call(&rex_call()).await.unwrap();
    assert!(result.success);
}
