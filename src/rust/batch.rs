//! Offline batch prediction over JSON Lines files.
//!
//! Each input line is one instance (`{"text": "..."}`); each output line pairs the
//! original instance with its prediction:
//!
//! ```text
//! {"instance": {"text": "great product"}, "prediction": {"sentiment": "positive", "confidence": 0.97}}
//! ```

use std::io::{BufRead, Write};
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::adapter::{AdapterError, LabeledPrediction, RawRequest, SentimentAdapter};

/// Totals of a finished batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub instances: usize,
    pub chunks: usize,
}

#[derive(Serialize)]
struct OutputLine<'a> {
    instance: &'a Value,
    prediction: &'a LabeledPrediction,
}

/// Runs every instance in `reader` through the adapter, `batch_size` at a time.
///
/// Blank lines are skipped. The first unparsable line or failing chunk aborts the
/// job; lines already written for earlier chunks stay written.
pub fn run_jsonl<R: BufRead, W: Write>(
    adapter: &SentimentAdapter,
    reader: R,
    mut writer: W,
    batch_size: usize,
) -> Result<BatchSummary, AdapterError> {
    let batch_size = batch_size.max(1);
    let start = Instant::now();
    let mut summary = BatchSummary::default();
    let mut pending: Vec<Value> = Vec::with_capacity(batch_size);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let instance: Value = serde_json::from_str(&line).map_err(|e| {
            AdapterError::InvalidRequest(format!("line {}: {}", line_no + 1, e))
        })?;
        pending.push(instance);

        if pending.len() == batch_size {
            flush_chunk(adapter, &mut pending, &mut writer, &mut summary)?;
        }
    }
    if !pending.is_empty() {
        flush_chunk(adapter, &mut pending, &mut writer, &mut summary)?;
    }
    writer.flush()?;

    info!(
        "Batch job finished: {} instances in {} chunks ({:.2?})",
        summary.instances,
        summary.chunks,
        start.elapsed()
    );
    Ok(summary)
}

fn flush_chunk<W: Write>(
    adapter: &SentimentAdapter,
    pending: &mut Vec<Value>,
    writer: &mut W,
    summary: &mut BatchSummary,
) -> Result<(), AdapterError> {
    let offset = summary.instances;
    let mut envelope = serde_json::Map::new();
    envelope.insert("instances".to_string(), Value::Array(pending.clone()));
    let request =
        RawRequest::from_json(&Value::Object(envelope)).map_err(|e| shift_index(e, offset))?;
    let response = adapter.predict(&request).map_err(|e| shift_index(e, offset))?;

    for (instance, prediction) in pending.iter().zip(&response.predictions) {
        serde_json::to_writer(&mut *writer, &OutputLine { instance, prediction })?;
        writer.write_all(b"\n")?;
    }

    debug!("Chunk {} done ({} instances)", summary.chunks, pending.len());
    summary.instances += pending.len();
    summary.chunks += 1;
    pending.clear();
    Ok(())
}

/// Rebases per-chunk instance indices onto the whole job.
fn shift_index(err: AdapterError, offset: usize) -> AdapterError {
    match err {
        AdapterError::MalformedInput { index, reason } => AdapterError::MalformedInput {
            index: index + offset,
            reason,
        },
        AdapterError::UnknownClassIndex {
            index,
            class_index,
            num_labels,
        } => AdapterError::UnknownClassIndex {
            index: index + offset,
            class_index,
            num_labels,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::lexicon_artifact;
    use crate::adapter::PaddingPolicy;

    fn adapter() -> SentimentAdapter {
        let mut adapter = SentimentAdapter::builder()
            .with_padding(PaddingPolicy::BatchLongest)
            .with_confidence(false)
            .with_probabilities(false)
            .build()
            .unwrap();
        adapter.load_artifact(lexicon_artifact(3)).unwrap();
        adapter
    }

    #[test]
    fn test_chunked_run() {
        let input = "{\"text\": \"great\"}\n\n{\"text\": \"bad\", \"id\": 7}\n{\"text\": \"okay\"}\n";
        let mut output = Vec::new();
        let summary = run_jsonl(&adapter(), input.as_bytes(), &mut output, 2).unwrap();
        assert_eq!(summary, BatchSummary { instances: 3, chunks: 2 });

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["prediction"]["sentiment"], "positive");
        assert_eq!(lines[1]["instance"]["id"], 7);
        assert_eq!(lines[1]["prediction"]["sentiment"], "negative");
        assert_eq!(lines[2]["prediction"]["sentiment"], "neutral");
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let input = "{\"text\": \"great\"}\nnot json\n";
        let err = run_jsonl(&adapter(), input.as_bytes(), Vec::new(), 4).unwrap_err();
        match err {
            AdapterError::InvalidRequest(msg) => assert!(msg.starts_with("line 2")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_text_index_is_job_wide() {
        let input = "{\"text\": \"great\"}\n{\"text\": \"bad\"}\n{\"body\": \"x\"}\n";
        let err = run_jsonl(&adapter(), input.as_bytes(), Vec::new(), 2).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedInput { index: 2, .. }));
    }

    #[test]
    fn test_empty_input() {
        let summary = run_jsonl(&adapter(), "".as_bytes(), Vec::new(), 8).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }
}
