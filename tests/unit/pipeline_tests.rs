use rand::Rng;
use sliding_sequencer::{
    CancellationToken, CommitHandle, Sequencer, SequencerConfig, SequencerError, SequencerState,
    SequencerStats,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(test)]
mod tests {
    use super::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// A unit of work routed to a worker together with its commit handle.
    struct Job {
        input: u64,
        output: Arc<Mutex<Option<u64>>>,
        handle: CommitHandle,
    }

    /// Runs `inputs` through `workers` tasks fed round-robin, squaring each
    /// value, and returns the results in the order they were committed.
    async fn run_pipeline(sequencer: &Sequencer, workers: usize, inputs: Vec<u64>) -> Vec<u64> {
        let committed = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let mut senders = Vec::new();
        let mut tasks = Vec::new();
        for _ in 0..workers {
            let (tx, mut rx) = mpsc::channel::<Job>(4);
            senders.push(tx);
            tasks.push(tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    let delay = rand::rng().random_range(0..5);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    *job.output.lock().unwrap() = Some(job.input * job.input);
                    job.handle.commit();
                }
            }));
        }

        for (i, input) in inputs.into_iter().enumerate() {
            let output = Arc::new(Mutex::new(None));
            let action = {
                let output = Arc::clone(&output);
                let committed = Arc::clone(&committed);
                move || {
                    if let Some(value) = output.lock().unwrap().take() {
                        committed.lock().unwrap().push(value);
                    }
                }
            };
            let handle = sequencer.acquire(&cancel, action).await.unwrap();
            senders[i % workers]
                .send(Job {
                    input,
                    output,
                    handle,
                })
                .await
                .ok();
        }

        // Close-then-wait: dropping the senders ends every worker loop.
        drop(senders);
        for task in tasks {
            task.await.unwrap();
        }

        Arc::try_unwrap(committed).unwrap().into_inner().unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_results_are_ordered() {
        init_tracing();
        let sequencer = Sequencer::new(16).unwrap();

        let inputs: Vec<u64> = (0..500).collect();
        let expected: Vec<u64> = inputs.iter().map(|x| x * x).collect();

        let results = run_pipeline(&sequencer, 8, inputs).await;
        assert_eq!(results, expected);

        let stats = sequencer.stats();
        assert_eq!(stats.last_committed, Some(499));
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.available, 16);
        sequencer.close();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_window_smaller_than_worker_count() {
        init_tracing();
        let sequencer = Sequencer::new(2).unwrap();

        let inputs: Vec<u64> = (0..100).collect();
        let expected: Vec<u64> = inputs.iter().map(|x| x * x).collect();

        let results = run_pipeline(&sequencer, 6, inputs).await;
        assert_eq!(results, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bounded_backlog_pipeline() {
        init_tracing();
        let config: SequencerConfig =
            serde_json::from_str(r#"{"capacity": 8, "max_backlog": 4}"#).unwrap();
        assert_eq!(config.max_backlog, Some(4));
        let sequencer = Sequencer::with_config(config).unwrap();

        let inputs: Vec<u64> = (0..200).collect();
        let expected: Vec<u64> = inputs.iter().map(|x| x * x).collect();

        let results = run_pipeline(&sequencer, 8, inputs).await;
        assert_eq!(results, expected);
        assert_eq!(sequencer.stats().withheld, 0);
    }

    #[tokio::test]
    async fn test_producer_stops_on_close() {
        init_tracing();
        let sequencer = Sequencer::new(4).unwrap();
        let cancel = CancellationToken::new();

        let producer = {
            let sequencer = sequencer.clone();
            tokio::spawn(async move {
                let mut held = Vec::new();
                loop {
                    match sequencer.acquire(&cancel, || {}).await {
                        Ok(handle) => held.push(handle),
                        Err(err) => return (held.len(), err),
                    }
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        sequencer.close();

        let (acquired, err) = producer.await.unwrap();
        assert_eq!(acquired, 4);
        assert_eq!(err, SequencerError::Closed);
        assert!(err.is_terminal());
    }

    #[test]
    fn test_stats_serialize_to_json() {
        let sequencer = Sequencer::new(3).unwrap();
        let handle = sequencer.try_acquire(|| {}).unwrap();
        handle.commit();

        let json = serde_json::to_value(sequencer.stats()).unwrap();
        assert_eq!(json["capacity"], 3);
        assert_eq!(json["available"], 3);
        assert_eq!(json["last_committed"], 0);
        assert_eq!(json["state"], "open");

        sequencer.close();
        let stats: SequencerStats =
            serde_json::from_value(serde_json::to_value(sequencer.stats()).unwrap()).unwrap();
        assert_eq!(stats.state, SequencerState::Closed);
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let config: SequencerConfig = serde_json::from_str(r#"{"capacity": 0}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SequencerError::InvalidCapacity { capacity: 0, .. })
        ));
    }
}
