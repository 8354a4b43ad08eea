use amqp_router::{Router, RouterConfig, RouterHandle, RouterResult};
use in_memory_broker::InMemoryBroker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

#[allow(dead_code)]
pub(crate) const RESULT_WAIT: Duration = Duration::from_secs(3);

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub(crate) fn test_config() -> RouterConfig {
    let mut config = RouterConfig::new("amqp://in-memory");
    config.send_timeout_ms = 500;
    config.broadcast_timeout_ms = 200;
    config
}

pub(crate) fn start_router(name: &str, broker: &Arc<InMemoryBroker>) -> RouterHandle {
    init_logging();
    start_router_with(name, broker, test_config())
}

#[allow(dead_code)]
pub(crate) fn start_router_with(
    name: &str,
    broker: &Arc<InMemoryBroker>,
    config: RouterConfig,
) -> RouterHandle {
    Router::new(name, config, broker.clone()).start()
}

#[allow(dead_code)]
pub(crate) async fn next_result(results: &mut Receiver<RouterResult>) -> RouterResult {
    tokio::time::timeout(RESULT_WAIT, results.recv())
        .await
        .expect("a result should arrive in time")
        .expect("result bus should stay open")
}

#[allow(dead_code)]
pub(crate) async fn assert_no_result(results: &mut Receiver<RouterResult>, within: Duration) {
    if let Ok(result) = tokio::time::timeout(within, results.recv()).await {
        panic!("unexpected result: {result:?}");
    }
}

#[allow(dead_code)]
pub(crate) async fn wait_for_subscribers(broker: &InMemoryBroker, address: &str, count: usize) {
    tokio::time::timeout(RESULT_WAIT, async {
        while broker.subscriber_count(address).await != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("subscriber count should settle");
}
