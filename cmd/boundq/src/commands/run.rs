//! Producer/consumer run with integrity check.

use std::time::{Duration, Instant};

use anyhow::Result;
use boundq_buffer::{BoundedBuffer, Consumer, Producer, Worker, WorkerError};
use clap::Args;
use serde::Serialize;
use tracing::{error, info};

use super::output_for;
use crate::config::{load_config, RunConfig};
use crate::Cli;

/// Run one producer against N consumers and verify the transfer.
#[derive(Args)]
pub struct RunCommand {
    /// Buffer capacity
    #[arg(long)]
    capacity: Option<usize>,
    /// Number of source items (1..=N)
    #[arg(short = 'n', long)]
    items: Option<u32>,
    /// Number of consumers sharing the buffer
    #[arg(long)]
    consumers: Option<usize>,
    /// Simulated work per produced item (ms)
    #[arg(long)]
    producer_delay_ms: Option<u64>,
    /// Simulated work per consumed item (ms)
    #[arg(long)]
    consumer_delay_ms: Option<u64>,
    /// Join timeout per worker (seconds)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

/// Outcome of a run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub capacity: usize,
    pub source_items: usize,
    pub consumed_items: usize,
    /// Items received by each consumer, in spawn order.
    pub per_consumer: Vec<usize>,
    /// Workers that did not finish within the timeout.
    pub unfinished: Vec<String>,
    /// Worker failures other than timeouts.
    pub errors: Vec<String>,
    pub integrity: bool,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.integrity && self.unfinished.is_empty() && self.errors.is_empty()
    }
}

impl RunCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let mut cfg = load_config(cli.config.as_deref())?;
        self.apply(&mut cfg);
        cfg.validate()?;

        let summary = execute(&cfg)?;
        let output = output_for(cli);
        if cli.json {
            output.write(&summary)?;
        } else {
            output.write_text(&format_summary(&summary, cfg.timeout()))?;
        }

        if !summary.success() {
            anyhow::bail!("run failed verification");
        }
        Ok(())
    }

    fn apply(&self, cfg: &mut RunConfig) {
        if let Some(v) = self.capacity {
            cfg.capacity = v;
        }
        if let Some(v) = self.items {
            cfg.items = v;
        }
        if let Some(v) = self.consumers {
            cfg.consumers = v;
        }
        if let Some(v) = self.producer_delay_ms {
            cfg.producer_delay_ms = v;
        }
        if let Some(v) = self.consumer_delay_ms {
            cfg.consumer_delay_ms = v;
        }
        if let Some(v) = self.timeout_secs {
            cfg.timeout_secs = v;
        }
    }
}

/// Wires one producer and `cfg.consumers` consumers to a fresh buffer,
/// waits for them and compares what arrived against the source.
pub fn execute(cfg: &RunConfig) -> Result<RunSummary> {
    let source: Vec<u32> = (1..=cfg.items).collect();
    let buffer = BoundedBuffer::new(cfg.capacity)?;
    info!(
        capacity = cfg.capacity,
        items = source.len(),
        consumers = cfg.consumers,
        "starting run"
    );
    let start = Instant::now();

    let mut producer = Producer::new(source.clone(), buffer.clone());
    if let Some(delay) = cfg.producer_delay() {
        producer = producer.with_delay(delay);
    }
    let producer = producer.spawn()?;

    let mut consumers = Vec::with_capacity(cfg.consumers);
    for i in 1..=cfg.consumers {
        let mut consumer =
            Consumer::new(buffer.clone(), Vec::new()).with_name(format!("consumer-{}", i));
        if let Some(delay) = cfg.consumer_delay() {
            consumer = consumer.with_delay(delay);
        }
        consumers.push(consumer.spawn()?);
    }

    let mut unfinished = Vec::new();
    let mut errors = Vec::new();

    if let Some(report) = settle(producer, cfg.timeout(), &mut unfinished, &mut errors) {
        info!(produced = report.produced, "producer joined");
    }

    let mut outputs = Vec::with_capacity(consumers.len());
    for consumer in consumers {
        let received = settle(consumer, cfg.timeout(), &mut unfinished, &mut errors)
            .map(|mut report| {
                if let Some(err) = report.sink_error.take() {
                    error!(error = %err, undelivered = report.undelivered.len(), "consumer sink failed");
                    errors.push(err.to_string());
                }
                report.into_sink()
            })
            .unwrap_or_default();
        outputs.push(received);
    }

    Ok(RunSummary {
        capacity: cfg.capacity,
        source_items: source.len(),
        consumed_items: outputs.iter().map(Vec::len).sum(),
        per_consumer: outputs.iter().map(Vec::len).collect(),
        integrity: verify(source.as_slice(), outputs.as_slice()),
        unfinished,
        errors,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Joins a worker, recording a timeout or failure instead of returning it.
fn settle<R>(
    worker: Worker<R>,
    timeout: Duration,
    unfinished: &mut Vec<String>,
    errors: &mut Vec<String>,
) -> Option<R> {
    match worker.join_timeout(timeout) {
        Ok(report) => Some(report),
        Err(WorkerError::JoinTimeout { name, .. }) => {
            error!(worker = %name, "worker failed to terminate");
            unfinished.push(name);
            None
        }
        Err(err) => {
            error!(error = %err, "worker failed");
            errors.push(err.to_string());
            None
        }
    }
}

/// A single consumer must reproduce the source exactly. Several consumers
/// split the items between them, so only the sorted union is compared.
pub fn verify<T: Ord + Clone>(source: &[T], outputs: &[Vec<T>]) -> bool {
    match outputs {
        [single] => single.as_slice() == source,
        _ => {
            let mut all: Vec<T> = outputs.concat();
            all.sort();
            let mut expected = source.to_vec();
            expected.sort();
            all == expected
        }
    }
}

/// Renders the human-readable report printed when `--json` is not set.
fn format_summary(summary: &RunSummary, timeout: Duration) -> String {
    let mut lines = vec![
        "--- Processing Complete ---".to_string(),
        format!("Source Items: {}", summary.source_items),
        format!("Consumed Items: {}", summary.consumed_items),
    ];
    if summary.per_consumer.len() > 1 {
        for (i, n) in summary.per_consumer.iter().enumerate() {
            lines.push(format!("  consumer-{}: {}", i + 1, n));
        }
    }
    lines.push(format!("Elapsed: {}ms", summary.elapsed_ms));

    for name in &summary.unfinished {
        lines.push(format!(
            "FAILURE: {} did not terminate within {:?}.",
            name, timeout
        ));
    }
    for err in &summary.errors {
        lines.push(format!("FAILURE: {}", err));
    }
    lines.push(if summary.integrity {
        "SUCCESS: Data integrity maintained.".to_string()
    } else {
        "FAILURE: Data mismatch.".to_string()
    });

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Output, OutputFormat};

    fn fast(capacity: usize, items: u32, consumers: usize) -> RunConfig {
        RunConfig {
            capacity,
            items,
            consumers,
            producer_delay_ms: 0,
            consumer_delay_ms: 0,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_verify_single_consumer_requires_order() {
        assert!(verify(&[1, 2, 3], &[vec![1, 2, 3]]));
        assert!(!verify(&[1, 2, 3], &[vec![1, 3, 2]]));
        assert!(!verify(&[1, 2, 3], &[vec![1, 2]]));
    }

    #[test]
    fn test_verify_many_consumers_compares_union() {
        assert!(verify(&[1, 2, 3, 4], &[vec![1, 4], vec![2, 3]]));
        assert!(!verify(&[1, 2, 3, 4], &[vec![1, 4], vec![2, 2]]));
        assert!(!verify(&[1, 2], &[vec![1, 2], vec![2]]));
    }

    #[test]
    fn test_execute_single_consumer() {
        let summary = execute(&fast(3, 199, 1)).unwrap();
        assert!(summary.success(), "{:?}", summary);
        assert_eq!(summary.consumed_items, 199);
        assert_eq!(summary.per_consumer, vec![199]);
    }

    #[test]
    fn test_execute_many_consumers() {
        let summary = execute(&fast(5, 40, 3)).unwrap();
        assert!(summary.success(), "{:?}", summary);
        assert_eq!(summary.per_consumer.len(), 3);
        assert_eq!(summary.consumed_items, 40);
    }

    #[test]
    fn test_execute_empty_source() {
        let summary = execute(&fast(1, 0, 2)).unwrap();
        assert!(summary.success(), "{:?}", summary);
        assert_eq!(summary.consumed_items, 0);
    }

    #[test]
    fn test_format_summary_reports_failures() {
        let summary = RunSummary {
            capacity: 2,
            source_items: 3,
            consumed_items: 2,
            per_consumer: vec![1, 1],
            unfinished: vec!["consumer-2".to_string()],
            errors: vec!["worker consumer-1: sink failed: sink: closed".to_string()],
            integrity: false,
            elapsed_ms: 7,
        };
        let text = format_summary(&summary, Duration::from_secs(5));

        assert!(text.starts_with("--- Processing Complete ---\n"));
        assert!(text.contains("  consumer-2: 1\n"));
        assert!(text.contains("FAILURE: consumer-2 did not terminate within 5s."));
        assert!(text.contains("FAILURE: worker consumer-1: sink failed: sink: closed"));
        assert!(text.ends_with("FAILURE: Data mismatch.\n"));
    }

    #[test]
    fn test_text_summary_goes_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        let summary = execute(&fast(2, 10, 1)).unwrap();

        let output = Output::new(OutputFormat::Yaml, Some(path.to_string_lossy().into_owned()));
        output
            .write_text(&format_summary(&summary, Duration::from_secs(5)))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Source Items: 10"));
        assert!(content.contains("SUCCESS: Data integrity maintained."));
    }

    #[test]
    fn test_flags_override_config() {
        let cmd = RunCommand {
            capacity: Some(1),
            items: None,
            consumers: Some(4),
            producer_delay_ms: Some(0),
            consumer_delay_ms: None,
            timeout_secs: None,
        };
        let mut cfg = RunConfig::default();
        cmd.apply(&mut cfg);

        assert_eq!(cfg.capacity, 1);
        assert_eq!(cfg.consumers, 4);
        assert_eq!(cfg.producer_delay(), None);
        assert_eq!(cfg.items, 20);
    }
}
