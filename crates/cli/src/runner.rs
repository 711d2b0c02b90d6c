//! Node runner: the PAIR walkthrough itself.
//!
//! # Flow
//!
//! 1. Create an endpoint with IPC and TCP enabled and a receive deadline
//! 2. Try to listen on the address; if that fails the peer got there first,
//!    so dial it instead
//! 3. Send, receive, pause, `iterations` times
//! 4. Close the endpoint, whatever happened above
//!
//! Two processes started with the same address and different node names
//! pair up: whichever binds first listens, the other dials. If both try in
//! the same instant the outcome depends on the transport; that race is
//! accepted, not resolved.

use std::fmt;
use std::time::Duration;

use pairmsg_core::{Address, Endpoint, EndpointOptions, Message, TransportKind};
use pairmsg_transport::PairSocket;
use tracing::info;

/// Round trips per run.
pub const DEFAULT_ITERATIONS: usize = 3;

/// Receive deadline applied by the endpoint factory.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between round trips.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Everything a node run needs, fixed at process start.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Free-form name distinguishing the two processes in logs.
    pub node: String,
    pub address: Address,
    pub iterations: usize,
    pub recv_timeout: Duration,
    pub pause: Duration,
}

impl NodeConfig {
    pub fn new(node: impl Into<String>, address: Address) -> Self {
        Self {
            node: node.into(),
            address,
            iterations: DEFAULT_ITERATIONS,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

/// Side of the connection a node ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Listener,
    Dialer,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Listener => f.write_str("listener"),
            ConnectionRole::Dialer => f.write_str("dialer"),
        }
    }
}

/// What a completed run sent and received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReport {
    pub node: String,
    pub role: ConnectionRole,
    pub sent: Vec<String>,
    pub received: Vec<String>,
}

/// Fatal failures of a node run. Each names the node and the failed step.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Node {node}: invalid address '{url}': {source}")]
    InvalidAddress {
        node: String,
        url: String,
        source: pairmsg_core::Error,
    },

    #[error("Node {node}: Cannot create socket: {source}")]
    EndpointCreation {
        node: String,
        source: pairmsg_core::Error,
    },

    #[error("Node {node} can neither listen nor dial on socket '{url}': listen: {listen}; dial: {dial}")]
    Connection {
        node: String,
        url: String,
        listen: pairmsg_core::Error,
        dial: pairmsg_core::Error,
    },

    #[error("Node {node} failed to send '{payload}': {source}")]
    Send {
        node: String,
        payload: String,
        source: pairmsg_core::Error,
    },

    #[error("Node {node} failed receiving a message: {source}")]
    Receive {
        node: String,
        source: pairmsg_core::Error,
    },
}

/// Create the node's endpoint: PAIR, IPC + TCP, receive deadline.
pub fn new_endpoint(config: &NodeConfig) -> Result<PairSocket, NodeError> {
    let options = EndpointOptions::new()
        .with_transport(TransportKind::Ipc)
        .with_transport(TransportKind::Tcp)
        .with_recv_timeout(config.recv_timeout);

    PairSocket::new(options).map_err(|source| NodeError::EndpointCreation {
        node: config.node.clone(),
        source,
    })
}

/// Listen on the configured address, or dial it if listening fails.
pub async fn establish<E: Endpoint>(
    endpoint: &mut E,
    config: &NodeConfig,
) -> Result<ConnectionRole, NodeError> {
    let listen = match endpoint.listen(&config.address).await {
        Ok(()) => return Ok(ConnectionRole::Listener),
        Err(e) => e,
    };

    info!(
        "Node {} cannot listen on socket '{}': {}. Trying to dial instead",
        config.node, config.address, listen
    );

    match endpoint.dial(&config.address).await {
        Ok(()) => Ok(ConnectionRole::Dialer),
        Err(dial) => Err(NodeError::Connection {
            node: config.node.clone(),
            url: config.address.to_string(),
            listen,
            dial,
        }),
    }
}

/// Run the send-receive-pause loop on a connected endpoint.
pub async fn exchange<E: Endpoint>(
    endpoint: &mut E,
    config: &NodeConfig,
    role: ConnectionRole,
) -> Result<ExchangeReport, NodeError> {
    let node = &config.node;
    let mut report = ExchangeReport {
        node: node.clone(),
        role,
        sent: Vec::with_capacity(config.iterations),
        received: Vec::with_capacity(config.iterations),
    };

    for i in 0..config.iterations {
        let message = Message::exchange(i, node);
        let payload = message.to_string();

        info!("Node {} sends {}", node, payload);
        endpoint
            .send(message)
            .await
            .map_err(|source| NodeError::Send {
                node: node.clone(),
                payload: payload.clone(),
                source,
            })?;
        metrics::counter!("pairmsg_messages_sent_total", "node" => node.clone()).increment(1);
        report.sent.push(payload);

        let reply = endpoint.recv().await.map_err(|source| NodeError::Receive {
            node: node.clone(),
            source,
        })?;
        metrics::counter!("pairmsg_messages_received_total", "node" => node.clone()).increment(1);
        info!("Node {} received {}", node, reply);
        report.received.push(reply.to_string());

        tokio::time::sleep(config.pause).await;
    }

    info!("Node {}: Done.", node);
    Ok(report)
}

/// Establish and exchange on `endpoint`, then close it on every path.
pub async fn run_with<E: Endpoint>(
    mut endpoint: E,
    config: &NodeConfig,
) -> Result<ExchangeReport, NodeError> {
    let result = connect_and_exchange(&mut endpoint, config).await;
    endpoint.close().await;
    result
}

/// Full node run with the default endpoint.
pub async fn run_node(config: &NodeConfig) -> Result<ExchangeReport, NodeError> {
    let endpoint = new_endpoint(config)?;
    run_with(endpoint, config).await
}

async fn connect_and_exchange<E: Endpoint>(
    endpoint: &mut E,
    config: &NodeConfig,
) -> Result<ExchangeReport, NodeError> {
    let role = establish(endpoint, config).await?;
    info!("Node {} connected as {} on '{}'", config.node, role, config.address);
    exchange(endpoint, config, role).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pairmsg_core::Error;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Endpoint double that records every call and replays scripted results.
    struct ScriptedEndpoint {
        calls: Arc<Mutex<Vec<String>>>,
        listen_ok: bool,
        dial_ok: bool,
        fail_send_at: Option<usize>,
        replies: VecDeque<Result<Message, Error>>,
        sends: usize,
        clock: Option<tokio::time::Instant>,
    }

    impl ScriptedEndpoint {
        fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                calls,
                listen_ok: true,
                dial_ok: true,
                fail_send_at: None,
                replies: (0..3).map(|i| Ok(Message::exchange(i, "peer"))).collect(),
                sends: 0,
                clock: None,
            }
        }

        /// Stamp every recorded call with whole seconds since `start`.
        fn with_clock(mut self, start: tokio::time::Instant) -> Self {
            self.clock = Some(start);
            self
        }

        fn record(&self, call: impl Into<String>) {
            let mut call = call.into();
            if let Some(start) = self.clock {
                call = format!("{} @{}s", call, start.elapsed().as_secs());
            }
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Endpoint for ScriptedEndpoint {
        async fn listen(&mut self, _addr: &Address) -> pairmsg_core::Result<()> {
            self.record("listen");
            if self.listen_ok {
                Ok(())
            } else {
                Err(Error::Io(std::io::ErrorKind::AddrInUse.into()))
            }
        }

        async fn dial(&mut self, _addr: &Address) -> pairmsg_core::Result<()> {
            self.record("dial");
            if self.dial_ok {
                Ok(())
            } else {
                Err(Error::Io(std::io::ErrorKind::ConnectionRefused.into()))
            }
        }

        async fn send(&mut self, msg: Message) -> pairmsg_core::Result<()> {
            self.record(format!("send {}", msg));
            let index = self.sends;
            self.sends += 1;
            if self.fail_send_at == Some(index) {
                return Err(Error::Closed);
            }
            Ok(())
        }

        async fn recv(&mut self) -> pairmsg_core::Result<Message> {
            self.record("recv");
            self.replies
                .pop_front()
                .unwrap_or(Err(Error::Timeout(Duration::from_secs(10))))
        }

        async fn close(&mut self) {
            self.record("close");
        }
    }

    fn config() -> NodeConfig {
        NodeConfig::new("0", Address::parse("tcp://localhost:54545").unwrap())
            .with_pause(Duration::ZERO)
    }

    fn calls() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorded(calls: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_listener_alternates_send_and_recv() {
        let log = calls();
        let report = run_with(ScriptedEndpoint::new(log.clone()), &config())
            .await
            .unwrap();

        assert_eq!(report.role, ConnectionRole::Listener);
        assert_eq!(
            recorded(&log),
            vec![
                "listen",
                "send message 0 from node 0.",
                "recv",
                "send message 1 from node 0.",
                "recv",
                "send message 2 from node 0.",
                "recv",
                "close",
            ]
        );
        assert_eq!(report.received[2], "message 2 from node peer.");
    }

    #[tokio::test]
    async fn test_falls_back_to_dial_when_listen_fails() {
        let log = calls();
        let mut endpoint = ScriptedEndpoint::new(log.clone());
        endpoint.listen_ok = false;

        let report = run_with(endpoint, &config()).await.unwrap();

        assert_eq!(report.role, ConnectionRole::Dialer);
        assert_eq!(&recorded(&log)[..2], &["listen", "dial"]);
        assert_eq!(report.sent.len(), 3);
    }

    #[tokio::test]
    async fn test_listen_and_dial_failing_is_fatal_and_closes() {
        let log = calls();
        let mut endpoint = ScriptedEndpoint::new(log.clone());
        endpoint.listen_ok = false;
        endpoint.dial_ok = false;

        let err = run_with(endpoint, &config()).await.unwrap_err();

        assert!(matches!(err, NodeError::Connection { .. }));
        assert!(err.to_string().contains("can neither listen nor dial"));
        assert_eq!(recorded(&log), vec!["listen", "dial", "close"]);
    }

    #[tokio::test]
    async fn test_send_failure_names_payload_and_closes() {
        let log = calls();
        let mut endpoint = ScriptedEndpoint::new(log.clone());
        endpoint.fail_send_at = Some(1);

        let err = run_with(endpoint, &config()).await.unwrap_err();

        match &err {
            NodeError::Send { node, payload, .. } => {
                assert_eq!(node, "0");
                assert_eq!(payload, "message 1 from node 0.");
            }
            other => panic!("expected send failure, got {:?}", other),
        }
        assert_eq!(recorded(&log).last().unwrap(), "close");
        assert_eq!(recorded(&log).iter().filter(|c| *c == "recv").count(), 1);
    }

    #[tokio::test]
    async fn test_receive_timeout_is_fatal_without_retry() {
        let log = calls();
        let mut endpoint = ScriptedEndpoint::new(log.clone());
        endpoint.replies = VecDeque::from(vec![
            Ok(Message::exchange(0, "peer")),
            Err(Error::Timeout(Duration::from_secs(10))),
        ]);

        let err = run_with(endpoint, &config()).await.unwrap_err();

        match &err {
            NodeError::Receive { source, .. } => assert!(source.is_timeout()),
            other => panic!("expected receive failure, got {:?}", other),
        }
        let log = recorded(&log);
        assert_eq!(log.iter().filter(|c| *c == "recv").count(), 2);
        assert_eq!(log.last().unwrap(), "close");
    }

    #[tokio::test]
    async fn test_iterations_are_configurable() {
        let log = calls();
        let config = config().with_iterations(1);
        let report = run_with(ScriptedEndpoint::new(log.clone()), &config)
            .await
            .unwrap();

        assert_eq!(report.sent, vec!["message 0 from node 0."]);
        assert_eq!(recorded(&log).len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_follows_each_receive() {
        let log = calls();
        let start = tokio::time::Instant::now();
        let endpoint = ScriptedEndpoint::new(log.clone()).with_clock(start);
        let config = config().with_pause(Duration::from_secs(1));

        run_with(endpoint, &config).await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);
        assert_eq!(
            recorded(&log),
            vec![
                "listen @0s",
                "send message 0 from node 0. @0s",
                "recv @0s",
                "send message 1 from node 0. @1s",
                "recv @1s",
                "send message 2 from node 0. @2s",
                "recv @2s",
                "close @3s",
            ]
        );
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_dialer_logs_fallback_and_completion() {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut endpoint = ScriptedEndpoint::new(calls());
        endpoint.listen_ok = false;
        let config = NodeConfig::new("1", Address::parse("tcp://localhost:54545").unwrap())
            .with_pause(Duration::ZERO);
        run_with(endpoint, &config).await.unwrap();

        let logs = capture.text();
        assert!(logs.contains("Node 1 cannot listen on socket 'tcp://localhost:54545'"));
        assert!(logs.contains("Trying to dial instead"));
        for i in 0..3 {
            assert!(logs.contains(&format!("Node 1 sends message {} from node 1.", i)));
            assert!(logs.contains(&format!("Node 1 received message {} from node peer.", i)));
        }
        assert!(logs.contains("Node 1: Done."));
        let done = logs.find("Node 1: Done.").unwrap();
        assert!(logs.find("Node 1 received message 2").unwrap() < done);
    }

    #[test]
    fn test_factory_enables_ipc_and_tcp() {
        let socket = new_endpoint(&config()).unwrap();
        let options = socket.options();

        assert!(options.supports(TransportKind::Ipc));
        assert!(options.supports(TransportKind::Tcp));
        assert_eq!(options.recv_timeout, Some(DEFAULT_RECV_TIMEOUT));
    }

    #[test]
    fn test_error_messages_name_the_node() {
        let err = NodeError::Receive {
            node: "1".into(),
            source: Error::Timeout(Duration::from_secs(10)),
        };
        assert_eq!(
            err.to_string(),
            "Node 1 failed receiving a message: timed out after 10s"
        );
    }
}
