//! Result delivery: batch accumulation plus optional streaming callback
//!
//! One sink lives for a whole run. Records are handed to the streaming
//! callback (if any) before being accumulated, with a single monotonically
//! increasing index, so the streamed sequence always equals the batch
//! sequence.

use futures::future::BoxFuture;
use serde_json::Value;

/// One output unit of the engine: a completed collector snapshot (an
/// object, or an array when a nested foreach was flattened).
pub type Record = Value;

/// Streaming callback invoked with `(record, index)` as each record is
/// produced. May suspend.
pub type OnResult<'a> = Box<dyn FnMut(Record, usize) -> BoxFuture<'a, ()> + Send + 'a>;

/// Wrap a synchronous closure as a streaming callback.
pub fn on_result_fn<'a, F>(mut f: F) -> OnResult<'a>
where
    F: FnMut(Record, usize) + Send + 'a,
{
    Box::new(move |record, index| {
        f(record, index);
        Box::pin(futures::future::ready(()))
    })
}

pub(crate) struct ResultSink<'a> {
    records: Vec<Record>,
    on_result: Option<OnResult<'a>>,
}

impl<'a> ResultSink<'a> {
    pub fn new(on_result: Option<OnResult<'a>>) -> Self {
        Self {
            records: Vec::new(),
            on_result,
        }
    }

    /// Deliver one record: stream first, then accumulate.
    pub async fn emit(&mut self, record: Record) {
        let index = self.records.len();
        if let Some(on_result) = self.on_result.as_mut() {
            on_result(record.clone(), index).await;
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_emit_streams_before_accumulating() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let mut sink = ResultSink::new(Some(on_result_fn(move |record, index| {
            seen_cb.lock().unwrap().push((record, index));
        })));
        sink.emit(json!({"a": 1})).await;
        sink.emit(json!({"b": 2})).await;
        let streamed = seen.lock().unwrap().clone();
        assert_eq!(streamed[0], (json!({"a": 1}), 0));
        assert_eq!(streamed[1], (json!({"b": 2}), 1));
        assert_eq!(sink.into_records(), vec![json!({"a": 1}), json!({"b": 2})]);
    }
}
