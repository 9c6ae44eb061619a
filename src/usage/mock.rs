use super::UsageStore;
use crate::models::UsageRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockUsageStore {
    records: Arc<Mutex<Vec<UsageRecord>>>,
    attempt_count: Arc<Mutex<usize>>,
    failing: bool,
}

impl MockUsageStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            attempt_count: Arc::new(Mutex::new(0)),
            failing: false,
        }
    }

    /// Every write and ping fails.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn get_records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn get_attempt_count(&self) -> usize {
        *self.attempt_count.lock().unwrap()
    }
}

impl Default for MockUsageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageStore for MockUsageStore {
    async fn record(&self, record: &UsageRecord) -> Result<String> {
        *self.attempt_count.lock().unwrap() += 1;

        if self.failing {
            return Err(Error::Storage("Mock store unreachable".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(format!("mock/{}.json", records.len()))
    }

    async fn ping(&self) -> Result<String> {
        if self.failing {
            Err(Error::Storage("Mock store unreachable".to_string()))
        } else {
            Ok("Connected to mock usage store".to_string())
        }
    }
}
