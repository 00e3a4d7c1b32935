//! In-process session store

use super::{resolve_index, resolve_range, SessionStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(Vec<String>),
    Hash(HashMap<String, String>),
}

/// Session store kept in memory.
///
/// Suitable for tests and single-process bots that can afford to lose
/// sessions on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Value>>> {
        self.entries.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of keys currently held
    pub fn key_count(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Backend(format!("WRONGTYPE operation against key {key}"))
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(resolve_range(list.len(), start, stop)
                .map(|(from, to)| list[from..=to].to_vec())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn list_index(&self, key: &str, index: isize) -> StoreResult<Option<String>> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Value::List(list)) => {
                Ok(resolve_index(list.len(), index).map(|i| list[i].clone()))
            }
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> StoreResult<usize> {
        let mut entries = self.lock()?;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(list) => {
                list.push(value.to_string());
                Ok(list.len())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn list_pop_tail(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.lock()?;
        let (popped, now_empty) = match entries.get_mut(key) {
            None => return Ok(None),
            Some(Value::List(list)) => {
                let popped = list.pop();
                (popped, list.is_empty())
            }
            Some(_) => return Err(wrong_type(key)),
        };
        // Redis drops empty lists
        if now_empty {
            entries.remove(key);
        }
        Ok(popped)
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.lock()?;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()))
        {
            Value::Hash(hash) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn hash_delete_field(&self, key: &str, field: &str) -> StoreResult<bool> {
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            None => Ok(false),
            Some(Value::Hash(hash)) => Ok(hash.remove(field).is_some()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn string_get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn string_set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?
            .insert(key.to_string(), Value::Str(value.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }
}
