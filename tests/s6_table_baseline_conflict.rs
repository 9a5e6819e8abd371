//! Two table-backed actors over the same row: the second writer's stale
//! baseline is rejected, and it only succeeds after reloading.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::Arc;

use async_trait::async_trait;
use virtacor::{PersistenceError, PersistenceService, StoredRow, StoredValue, TablePersistable};

struct FirstWriteWinsStore {
    rows: StdMutex<HashMap<String, StoredRow>>,
    next_baseline: StdMutex<u64>,
}

fn key(partition: &[String], sort: &[String]) -> String {
    format!("{}/{}", partition.join(","), sort.join(","))
}

#[async_trait]
impl PersistenceService for FirstWriteWinsStore {
    async fn load(&self, _: &str, _: &[String], _: &[String]) -> Result<Option<StoredValue>, PersistenceError> {
        unimplemented!("not exercised by this scenario")
    }

    async fn store(&self, _: &str, _: &[String], _: &[String], _: Vec<u8>, _: String, _: Option<u64>) -> Result<(), PersistenceError> {
        unimplemented!("not exercised by this scenario")
    }

    async fn table_get(&self, _specifier: &str, partition_key: &[String], sort_key: &[String]) -> Result<Option<StoredRow>, PersistenceError> {
        Ok(self.rows.lock().unwrap().get(&key(partition_key, sort_key)).cloned())
    }

    async fn table_put(
        &self,
        _specifier: &str,
        partition_key: &[String],
        sort_key: &[String],
        value: Vec<u8>,
        baseline: Option<String>,
    ) -> Result<String, PersistenceError> {
        let mut rows = self.rows.lock().unwrap();
        let current = rows.get(&key(partition_key, sort_key)).map(|row| row.baseline.clone());
        if current != baseline {
            return Err(PersistenceError::BaselineConflict);
        }
        let mut next_baseline = self.next_baseline.lock().unwrap();
        *next_baseline += 1;
        let new_baseline = next_baseline.to_string();
        rows.insert(key(partition_key, sort_key), StoredRow { value, baseline: new_baseline.clone() });
        Ok(new_baseline)
    }
}

#[tokio::test]
async fn second_writer_reloads_and_retries_after_conflict() {
    let store = Arc::new(FirstWriteWinsStore {
        rows: StdMutex::new(HashMap::new()),
        next_baseline: StdMutex::new(0),
    });

    let mut writer_a: TablePersistable<String> = TablePersistable::new(store.clone(), "cell", vec!["row".into()], vec![]);
    let mut writer_b: TablePersistable<String> = TablePersistable::new(store.clone(), "cell", vec!["row".into()], vec![]);
    writer_a.get().await.unwrap();
    writer_b.get().await.unwrap();
    assert_eq!(writer_a.baseline(), writer_b.baseline());

    writer_a.put("from-a".to_string()).await.unwrap();
    let baseline_prime = writer_a.baseline().unwrap().to_string();

    let conflict = writer_b.put("from-b".to_string()).await.unwrap_err();
    assert!(matches!(conflict, PersistenceError::BaselineConflict));

    writer_b.get().await.unwrap();
    assert_eq!(writer_b.baseline(), Some(baseline_prime.as_str()));

    writer_b.put("from-b-retry".to_string()).await.unwrap();
    assert_ne!(writer_b.baseline(), Some(baseline_prime.as_str()));
    assert_eq!(writer_b.value(), Some(&"from-b-retry".to_string()));
}
