#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rowmap::prelude::*;
use tokio::sync::OwnedMutexGuard;

/// Backend that records every call instead of running it.
///
/// Like a single connection, a lease blocks every other call until dropped.
#[derive(Debug, Default)]
pub struct MockBackend {
    batch: bool,
    recorder: Arc<Recorder>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Sql(String, Vec<Value>),
    Batch(Vec<CompiledStatement>),
    /// A lease was dropped inside a transaction.
    Abandoned,
}

#[derive(Debug, Default)]
struct Recorder {
    fail_on: Option<usize>,
    calls: AtomicUsize,
    log: Mutex<Vec<Call>>,
}

impl Recorder {
    fn record(&self, call: Call) -> RowmapResult<()> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(call);
        if self.fail_on == Some(index) {
            return Err(RowmapError::database(format!("call {} failed", index)));
        }
        Ok(())
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch() -> Self {
        Self {
            batch: true,
            ..Self::default()
        }
    }

    /// Fail the n-th call, counting from zero.
    pub fn failing_on(call: usize) -> Self {
        Self {
            recorder: Arc::new(Recorder {
                fail_on: Some(call),
                ..Recorder::default()
            }),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorder.log.lock().unwrap().clone()
    }

    /// Sql text of every plain call.
    pub fn sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Sql(sql, _) => Some(sql),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult> {
        let _gate = self.gate.lock().await;
        self.recorder.record(Call::Sql(sql.to_string(), params.to_vec()))?;
        // yield so concurrent transactions interleave
        tokio::task::yield_now().await;
        Ok(QueryResult::default())
    }

    async fn lease(&self) -> RowmapResult<Box<dyn ConnectionLease>> {
        let gate = Arc::clone(&self.gate).lock_owned().await;
        Ok(Box::new(MockLease {
            _gate: gate,
            recorder: Arc::clone(&self.recorder),
        }))
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn sql_batch(&self, statements: &[CompiledStatement]) -> RowmapResult<Vec<QueryResult>> {
        let _gate = self.gate.lock().await;
        self.recorder.record(Call::Batch(statements.to_vec()))?;
        Ok(vec![QueryResult::default(); statements.len()])
    }
}

struct MockLease {
    _gate: OwnedMutexGuard<()>,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl ConnectionLease for MockLease {
    async fn execute_sql(&mut self, sql: &str, params: &[Value]) -> RowmapResult<QueryResult> {
        self.recorder.record(Call::Sql(sql.to_string(), params.to_vec()))?;
        tokio::task::yield_now().await;
        Ok(QueryResult::default())
    }

    fn abandon(&mut self) {
        self.recorder.log.lock().unwrap().push(Call::Abandoned);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub tags: Vec<String>,
}
rowmap::model!(Brand { id, name, tags });

#[derive(Debug, Clone, Default)]
pub struct Memo {
    pub id: i64,
    pub text: String,
}
rowmap::model!(Memo { id, text });

#[derive(Debug, Clone, Default)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub tags: Vec<String>,
}
rowmap::model!(Post { id, title, tags });

pub fn registry() -> MapperRegistry {
    MapperRegistry::builder()
        .map::<Brand>(|m| {
            m.key("id", PrimaryKeyType::Assigned)?
                .has_many("tags", FieldType::STRING, "Brand_tags")?
                .auto_mapper()?;
            Ok(())
        })
        .and_then(|b| {
            b.map::<Memo>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?.auto_mapper()?;
                Ok(())
            })
        })
        .and_then(|b| {
            b.map::<Post>(|m| {
                m.key("id", PrimaryKeyType::AutoIncrement)?
                    .has_many("tags", FieldType::STRING, "Post_tags")?
                    .auto_mapper()?;
                Ok(())
            })
        })
        .expect("fixture mappers")
        .build()
}

pub fn brand(id: i64, name: &str, tags: &[&str]) -> Brand {
    Brand {
        id,
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn post(title: &str, tags: &[&str]) -> Post {
    Post {
        id: 0,
        title: title.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}
