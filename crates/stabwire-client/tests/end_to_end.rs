//! Protocols run against the reference server, in-process and over TCP.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use stabwire_client::{
    CallError, Circuit, ClientConfig, LoopbackTransport, Session, Transport, TransportError, TwoBits,
    protocols,
};
use stabwire_proto::Handler;
use stabwire_server::{Config, Dispatcher, EngineConfig, Server};

const KIND: &str = "chp_state";

fn dispatcher(seed: u64) -> Dispatcher {
    Dispatcher::new(EngineConfig {
        max_qubits: 512,
        rng_seed: Some(seed),
    })
}

fn loopback(dispatcher: &Dispatcher) -> Session<LoopbackTransport> {
    Session::loopback(Arc::new(dispatcher.clone()))
}

async fn start_server(seed: u64) -> (ClientConfig, oneshot::Sender<()>, JoinHandle<()>) {
    let mut config = Config::default();
    config.server.address = "127.0.0.1:0".to_string();
    config.server.shutdown_timeout_seconds = 1;
    config.engine.rng_seed = Some(seed);

    let server = Server::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .serve_with_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    let client = ClientConfig {
        address: addr.to_string(),
        timeout_seconds: 5,
        ..ClientConfig::default()
    };
    (client, tx, handle)
}

#[tokio::test]
async fn test_qrng_is_balanced() {
    let d = dispatcher(11);
    let mut session = loopback(&d);

    let (mut ones, mut total) = (0, 0);
    for _ in 0..50 {
        let bits = protocols::qrng(&mut session, KIND, 64).await.unwrap();
        assert_eq!(bits.len(), 64);
        ones += bits.count_ones();
        total += bits.len();
    }
    let fraction = ones as f64 / total as f64;
    assert!((fraction - 0.5).abs() < 0.05, "fraction of ones {fraction}");

    assert!(session.live_systems().is_empty());
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_qrng_three_qubits_mean() {
    let d = dispatcher(17);
    let mut session = loopback(&d);

    let (mut ones, mut total) = (0, 0);
    for _ in 0..10_000 {
        let bits = protocols::qrng(&mut session, KIND, 3).await.unwrap();
        assert_eq!(bits.len(), 3);
        ones += bits.count_ones();
        total += bits.len();
    }
    let mean = ones as f64 / total as f64;
    assert!((mean - 0.5).abs() <= 0.02, "mean {mean}");
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_qrng_rejects_zero_qubits() {
    let d = dispatcher(1);
    let mut session = loopback(&d);
    let err = protocols::qrng(&mut session, KIND, 0).await.unwrap_err();
    assert!(matches!(err, CallError::Usage(_)));
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_superdense_decodes_every_message() {
    let d = dispatcher(5);
    let mut session = loopback(&d);

    for value in 0..4u8 {
        let message = TwoBits::new(value).unwrap();
        for _ in 0..10 {
            let decoded = protocols::superdense(&mut session, KIND, message).await.unwrap();
            assert_eq!(decoded, message.to_outcomes());
            assert_eq!(decoded.to_u64(), Some(u64::from(value)));
        }
    }
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_teleport_always_delivers() {
    let d = dispatcher(9);
    let mut session = loopback(&d);

    let mut bell_seen = std::collections::HashSet::new();
    for round in 0..40 {
        let payload = round % 2 == 1;
        let report = protocols::teleport(&mut session, KIND, payload).await.unwrap();
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(report.corrections, stabwire_client::corrections(&report.bell));
        bell_seen.insert(report.bell.to_string());
    }
    // The Bell outcomes are uniformly random, so forty rounds cover them all.
    assert_eq!(bell_seen.len(), 4);
    assert!(session.live_states().is_empty());
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_unknown_kind_leaves_nothing_behind() {
    let d = dispatcher(2);
    let mut session = loopback(&d);
    let err = protocols::teleport(&mut session, "statevector", true).await.unwrap_err();
    assert!(err.is_server(), "{err:?}");
    assert!(session.live_systems().is_empty());
    assert_eq!(d.registry().system_count().await, 0);
}

/// Forwards to a dispatcher, records method names, and refuses `measure_state`.
struct FailingMeasure {
    dispatcher: Dispatcher,
    methods: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transport for FailingMeasure {
    async fn round_trip(&mut self, request: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let body = request.strip_suffix(&[0]).unwrap_or(&request);
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        let method = value["method"].as_str().unwrap_or_default().to_string();
        self.methods.lock().unwrap().push(method.clone());

        if method == "measure_state" {
            let mut reply = br#"{"error":"boom"}"#.to_vec();
            reply.push(0);
            return Ok(reply);
        }
        Ok(self.dispatcher.handle(&request).await)
    }

    fn describe(&self) -> String {
        "failing-measure".to_string()
    }
}

#[tokio::test]
async fn test_failed_measurement_still_cleans_up() {
    let d = dispatcher(6);
    let methods = Arc::new(Mutex::new(Vec::new()));
    let mut session = Session::new(FailingMeasure {
        dispatcher: d.clone(),
        methods: Arc::clone(&methods),
    });

    let err = protocols::teleport(&mut session, KIND, true).await.unwrap_err();
    assert!(matches!(err, CallError::Server(_)), "{err:?}");
    assert!(err.to_string().contains("boom"));

    let methods = methods.lock().unwrap().clone();
    assert_eq!(
        methods,
        ["create_system", "create_state", "measure_state", "delete_state", "delete_system"]
    );
    assert!(session.live_systems().is_empty());
    assert!(session.live_states().is_empty());
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_no_dangling_ids() {
    let d = dispatcher(3);
    let mut session = loopback(&d);

    let system = session.create_system(KIND).await.unwrap();
    let mut init = Circuit::with_qubits(1);
    init.x(0);
    let state = session.create_state(&system, &init).await.unwrap();
    let mut measure = Circuit::new();
    measure.measure(0);
    assert_eq!(
        session.measure_state(&system, &state, &measure).await.unwrap().to_string(),
        "1"
    );

    session.delete_state(&system, &state).await.unwrap();
    let err = session.delete_state(&system, &state).await.unwrap_err();
    assert!(err.is_server());
    assert!(err.to_string().contains("State not found"));
    let err = session.measure_state(&system, &state, &measure).await.unwrap_err();
    assert!(err.is_server());

    session.delete_system(&system).await.unwrap();
    let err = session.delete_system(&system).await.unwrap_err();
    assert!(err.to_string().contains("System not found"));
    assert!(session.live_systems().is_empty());
}

#[tokio::test]
async fn test_close_releases_everything() {
    let d = dispatcher(4);
    let mut session = loopback(&d);

    for _ in 0..3 {
        let system = session.create_system(KIND).await.unwrap();
        for n in 1..=2 {
            session
                .create_state(&system, &Circuit::with_qubits(n))
                .await
                .unwrap();
        }
    }
    assert_eq!(session.live_systems().len(), 3);
    assert_eq!(session.live_states().len(), 6);
    assert_eq!(d.registry().system_count().await, 3);

    session.close().await.unwrap();
    assert!(session.live_systems().is_empty());
    assert_eq!(d.registry().system_count().await, 0);
}

#[tokio::test]
async fn test_protocols_over_tcp() {
    let (config, stop, handle) = start_server(21).await;
    let mut session = Session::connect(&config).await.unwrap();

    for payload in [false, true] {
        let report = protocols::teleport(&mut session, &config.kind, payload).await.unwrap();
        assert!(report.succeeded());
    }
    let decoded = protocols::superdense(&mut session, &config.kind, TwoBits::new(2).unwrap())
        .await
        .unwrap();
    assert_eq!(decoded.to_string(), "10");
    session.close().await.unwrap();
    drop(session);

    stop.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_channels() {
    let (config, stop, handle) = start_server(22).await;

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let config = config.clone();
            tokio::spawn(async move {
                let mut session = Session::connect(&config).await.unwrap();
                for round in 0..10 {
                    let payload = (i + round) % 2 == 0;
                    let report = protocols::teleport(&mut session, &config.kind, payload)
                        .await
                        .unwrap();
                    assert!(report.succeeded());
                }
                session.close().await.unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    stop.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_transport_failure_poisons_session() {
    let (config, stop, handle) = start_server(23).await;
    let mut session = Session::connect(&config).await.unwrap();
    let system = session.create_system(KIND).await.unwrap();

    stop.send(()).unwrap();
    handle.await.unwrap();

    let mut circuit = Circuit::with_qubits(1);
    circuit.measure(0);
    let err = session.compute_result(&system, &circuit).await.unwrap_err();
    assert!(err.is_transport(), "{err:?}");
    let err = session.compute_result(&system, &circuit).await.unwrap_err();
    assert!(err.is_transport());

    // The ledger survives a transport failure; close reports it.
    assert_eq!(session.live_systems().len(), 1);
    assert!(session.close().await.unwrap_err().is_transport());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_teleport_any_seed(payload in any::<bool>(), seed in any::<u64>()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let report = runtime.block_on(async {
            let d = dispatcher(seed);
            let mut session = loopback(&d);
            protocols::teleport(&mut session, KIND, payload).await
        });
        let report = report.unwrap();
        prop_assert_eq!(report.received, payload);
    }

    #[test]
    fn test_superdense_any_seed(value in 0u8..4, seed in any::<u64>()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let message = TwoBits::new(value).unwrap();
        let decoded = runtime.block_on(async {
            let d = dispatcher(seed);
            let mut session = loopback(&d);
            protocols::superdense(&mut session, KIND, message).await
        });
        prop_assert_eq!(decoded.unwrap(), message.to_outcomes());
    }
}
