#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use registrar_core::error::{RegistrarError, Result};
use registrar_core::metrics::MetricsRegistry;
use registrar_server::bootstrap::{
    ConnectionRetrySupervisor, Connector, Escalation, Phase, RetryPolicy,
};
use registrar_server::obs::metrics::register_connect_attempts;

/// Fails the first `failures` attempts, then hands out the attempt number.
struct FlakyConnector {
    failures: u32,
    attempts: AtomicU32,
    at: Mutex<Vec<Instant>>,
}

impl FlakyConnector {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
            at: Mutex::new(Vec::new()),
        }
    }

    fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FlakyConnector {
    type Connection = u32;

    fn target(&self) -> String {
        "flaky".into()
    }

    async fn connect(&self) -> Result<u32> {
        self.at.lock().unwrap().push(Instant::now());
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            Err(RegistrarError::Dependency(format!("refused (attempt {n})")))
        } else {
            Ok(n)
        }
    }
}

#[derive(Default)]
struct CountingEscalation {
    calls: AtomicU32,
}

impl Escalation for CountingEscalation {
    fn escalate(&self, _err: &RegistrarError) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts `error`-level events.
#[derive(Clone, Default)]
struct ErrorEvents(Arc<AtomicU32>);

impl<S: tracing::Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn policy(retries: u32) -> RetryPolicy {
    RetryPolicy {
        retries,
        delay: Duration::from_secs(3),
    }
}

#[tokio::test(start_paused = true)]
async fn exhausts_after_initial_plus_retries() {
    let connector = FlakyConnector::always_failing();
    let mut sup = ConnectionRetrySupervisor::with_escalation(policy(3), CountingEscalation::default());
    let started = Instant::now();
    let continued = AtomicU32::new(0);

    let err = sup
        .run(&connector, |_conn| {
            continued.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        })
        .await
        .expect_err("must exhaust");

    assert!(matches!(err, RegistrarError::DependencyExhausted { attempts: 4, .. }));
    assert_eq!(connector.attempts(), 4);
    assert_eq!(continued.load(Ordering::SeqCst), 0);
    assert_eq!(sup.escalation().calls.load(Ordering::SeqCst), 1);
    assert_eq!(sup.phase(), Phase::Exhausted);
    assert_eq!(sup.state().attempts_remaining, 0);

    // fixed delay between consecutive attempts, none after the last
    let at = connector.at.lock().unwrap().clone();
    for w in at.windows(2) {
        assert_eq!(w[1] - w[0], Duration::from_secs(3));
    }
    assert_eq!(started.elapsed(), Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn connects_on_third_attempt_and_continues_once() {
    let connector = FlakyConnector::new(2);
    let mut sup = ConnectionRetrySupervisor::with_escalation(policy(5), CountingEscalation::default());
    let continued = AtomicU32::new(0);

    let got = sup
        .run(&connector, |conn| {
            continued.fetch_add(1, Ordering::SeqCst);
            std::future::ready(conn * 10)
        })
        .await
        .unwrap();

    assert_eq!(got, 30);
    assert_eq!(connector.attempts(), 3);
    assert_eq!(continued.load(Ordering::SeqCst), 1);
    assert_eq!(sup.escalation().calls.load(Ordering::SeqCst), 0);
    assert_eq!(sup.phase(), Phase::Connected);
    assert_eq!(sup.state().attempts_remaining, 3);
    assert_eq!(
        sup.history(),
        [
            Phase::Idle,
            Phase::Connecting,
            Phase::Retrying,
            Phase::Connecting,
            Phase::Retrying,
            Phase::Connecting,
            Phase::Connected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_retries_means_one_attempt() {
    let connector = FlakyConnector::always_failing();
    let mut sup = ConnectionRetrySupervisor::with_escalation(policy(0), CountingEscalation::default());
    let started = Instant::now();

    assert!(sup.run(&connector, |_c| async {}).await.is_err());
    assert_eq!(connector.attempts(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(sup.history(), [Phase::Idle, Phase::Connecting, Phase::Exhausted]);
}

#[tokio::test(start_paused = true)]
async fn terminal_supervisor_does_not_run_again() {
    let connector = FlakyConnector::new(0);
    let mut sup = ConnectionRetrySupervisor::with_escalation(policy(1), CountingEscalation::default());
    sup.run(&connector, |_c| async {}).await.unwrap();

    let err = sup.run(&connector, |_c| async {}).await.expect_err("already connected");
    assert_eq!(err.class().as_str(), "INTERNAL");
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn attempts_are_counted_by_outcome() {
    let registry = MetricsRegistry::new();
    let counter = register_connect_attempts(&registry).unwrap();
    let connector = FlakyConnector::new(2);
    let mut sup = ConnectionRetrySupervisor::with_escalation(policy(5), CountingEscalation::default())
        .with_attempt_counter(Arc::clone(&counter));

    sup.run(&connector, |_c| async {}).await.unwrap();

    assert_eq!(counter.get(&[("outcome", "failure")]).unwrap(), Some(2));
    assert_eq!(counter.get(&[("outcome", "success")]).unwrap(), Some(1));
    assert!(registry
        .collect()
        .unwrap()
        .contains("dependency_connect_attempts_total{outcome=\"failure\"} 2"));
}

#[tokio::test(start_paused = true)]
async fn exhaustion_is_logged_at_error_once() {
    let errors = ErrorEvents::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(errors.clone()));

    let connector = FlakyConnector::always_failing();
    let mut sup = ConnectionRetrySupervisor::with_escalation(policy(2), CountingEscalation::default());
    let res = sup.run(&connector, |_conn| std::future::ready(())).await;

    assert!(res.is_err());
    assert_eq!(errors.0.load(Ordering::SeqCst), 1);
}
