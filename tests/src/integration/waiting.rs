//! # Wait Semantics Over The Bus
//!
//! The wait guarantees of the state store, driven by actions a remote
//! controller publishes rather than by direct `store` calls.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use node_runtime::{NodeConfig, NodeRuntime};
    use rand::Rng;
    use smarthome_bus::{InMemoryTransport, Message, Transport};
    use state_store::{Condition, StateStore, WaitOutcome};

    async fn started() -> NodeRuntime {
        let mut config = NodeConfig::default();
        config.broker.top_level_topic = "home".to_string();
        let runtime = NodeRuntime::new(config);
        runtime.start().await.unwrap();
        runtime
    }

    async fn controller(runtime: &NodeRuntime) -> Arc<InMemoryTransport> {
        let client = Arc::new(InMemoryTransport::with_hub(runtime.hub()));
        client.connect().await.unwrap();
        client
    }

    fn publish_later(
        client: &Arc<InMemoryTransport>,
        after: Duration,
        item: &'static str,
        value: &'static str,
    ) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(client);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            client
                .publish(Message::new(format!("home/set/{item}"), value))
                .await
                .unwrap();
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waits_through_intermediate_value() {
        let runtime = started().await;
        let client = controller(&runtime).await;
        let store = runtime.store();

        client.publish(Message::new("home/set/conn", "0")).await.unwrap();
        assert!(store.wait_for("conn", "0", Duration::from_secs(1)).await);

        let start = Instant::now();
        let first = publish_later(&client, Duration::from_millis(200), "conn", "1");
        let second = publish_later(&client, Duration::from_millis(400), "conn", "2");

        assert!(store.wait_for("conn", "2", Duration::from_secs(2)).await);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(380), "matched early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "matched late: {elapsed:?}");

        first.await.unwrap();
        second.await.unwrap();
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_for_not_times_out() {
        let runtime = started().await;
        let client = controller(&runtime).await;
        let store = runtime.store();

        client.publish(Message::new("home/set/light", "off")).await.unwrap();
        assert!(store.wait_for("light", "off", Duration::from_secs(1)).await);

        let start = Instant::now();
        assert!(!store.wait_for_not("light", "off", Duration::from_millis(500)).await);
        assert!(start.elapsed() >= Duration::from_millis(490));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_for_not_ignores_republish() {
        let runtime = started().await;
        let client = controller(&runtime).await;
        let store = runtime.store();

        client.publish(Message::new("home/set/light", "off")).await.unwrap();
        assert!(store.wait_for("light", "off", Duration::from_secs(1)).await);

        let republish = publish_later(&client, Duration::from_millis(50), "light", "off");
        let change = publish_later(&client, Duration::from_millis(150), "light", "on");

        let start = Instant::now();
        assert!(store.wait_for_not("light", "off", Duration::from_secs(2)).await);
        assert!(start.elapsed() >= Duration::from_millis(140));

        republish.await.unwrap();
        change.await.unwrap();
        runtime.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_waiters_different_targets() {
        let runtime = started().await;
        let client = controller(&runtime).await;
        let store = runtime.store();

        let wait = |target: &'static str, timeout: Duration| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .wait_until("mode", Condition::Equals(target.to_string()), timeout)
                    .await
            })
        };
        let heat = wait("heat", Duration::from_secs(2));
        let cool = wait("cool", Duration::from_millis(600));
        let auto = wait("auto", Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(50)).await;
        for value in ["heat", "off", "auto"] {
            client
                .publish(Message::new("home/set/mode", value))
                .await
                .unwrap();
        }

        assert_eq!(heat.await.unwrap(), WaitOutcome::Matched);
        assert_eq!(cool.await.unwrap(), WaitOutcome::TimedOut);
        assert_eq!(auto.await.unwrap(), WaitOutcome::Matched);
        assert_eq!(store.waiter_count("mode"), 0);

        runtime.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_producers_last_value_wins() {
        let store = Arc::new(StateStore::new());
        let producers: Vec<_> = (0..8)
            .map(|p| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for i in 0..50 {
                        let jitter = rand::thread_rng().gen_range(0..3);
                        tokio::time::sleep(Duration::from_millis(jitter)).await;
                        store.store(&format!("sensor/{p}"), &i.to_string());
                    }
                })
            })
            .collect();

        let waiters: Vec<_> = (0..8)
            .map(|p| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .wait_for(&format!("sensor/{p}"), "49", Duration::from_secs(5))
                        .await
                })
            })
            .collect();

        for producer in producers {
            producer.await.unwrap();
        }
        for waiter in waiters {
            assert!(waiter.await.unwrap());
        }
        assert_eq!(store.len(), 8);
        assert_eq!(store.total_waiters(), 0);
    }
}
