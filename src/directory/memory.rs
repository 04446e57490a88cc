//! In-memory directory.
//!
//! Behaves like the remote service for the operations the engine uses and
//! records every call, so tests can assert exactly what was sent.

use super::{CreateOutcome, DirectoryClient};
use crate::error::DirectoryError;
use crate::models::{Record, RemoteSegment, SegmentId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// One call made against a [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    FindByName(String),
    Update(String),
    Delete(SegmentId),
    ListAll,
}

#[derive(Debug, Default)]
struct State {
    segments: BTreeMap<SegmentId, RemoteSegment>,
    next_id: u64,
    calls: Vec<Call>,
    fail_on: Option<String>,
    vanished: HashSet<String>,
    undeletable: HashSet<SegmentId>,
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment directly, without recording a call.
    pub fn insert(&self, name: &str, starting: &str, ending: &str) -> SegmentId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = SegmentId(state.next_id);
        state.segments.insert(
            id,
            RemoteSegment {
                id,
                name: name.to_string(),
                starting_address: starting.to_string(),
                ending_address: ending.to_string(),
            },
        );
        id
    }

    /// Make every call that touches `name` fail with a transport error.
    pub fn fail_on(&self, name: &str) {
        self.lock().fail_on = Some(name.to_string());
    }

    /// Make `create` report a collision for `name` although no segment by
    /// that name is stored, as if it was removed right after the create.
    pub fn vanish_after_collision(&self, name: &str) {
        self.lock().vanished.insert(name.to_string());
    }

    /// Make deleting `id` fail with a rejection.
    pub fn refuse_delete(&self, id: SegmentId) {
        self.lock().undeletable.insert(id);
    }

    pub fn segments(&self) -> Vec<RemoteSegment> {
        self.lock().segments.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<RemoteSegment> {
        self.lock()
            .segments
            .values()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that change the directory.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create(_) | Call::Update(_) | Call::Delete(_)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // a panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl State {
    fn check(&self, name: &str) -> Result<(), DirectoryError> {
        match &self.fail_on {
            Some(fail) if fail == name => Err(DirectoryError::Transport {
                message: format!("simulated failure for '{name}'"),
                source: None,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn create(&self, record: &Record) -> Result<CreateOutcome, DirectoryError> {
        let mut state = self.lock();
        state.calls.push(Call::Create(record.name.clone()));
        state.check(&record.name)?;
        if state.vanished.contains(&record.name)
            || state.segments.values().any(|s| s.name == record.name)
        {
            return Ok(CreateOutcome::Collided);
        }
        let ending = record.ending_address()?;
        state.next_id += 1;
        let segment = RemoteSegment {
            id: SegmentId(state.next_id),
            name: record.name.clone(),
            starting_address: record.starting.clone(),
            ending_address: ending,
        };
        state.segments.insert(segment.id, segment.clone());
        Ok(CreateOutcome::Created(segment))
    }

    async fn find_by_name(&self, name: &str) -> Result<RemoteSegment, DirectoryError> {
        let mut state = self.lock();
        state.calls.push(Call::FindByName(name.to_string()));
        state.check(name)?;
        let found: Vec<&RemoteSegment> =
            state.segments.values().filter(|s| s.name == name).collect();
        match found.as_slice() {
            [] => Err(DirectoryError::NotFound {
                name: name.to_string(),
            }),
            [segment] => Ok((*segment).clone()),
            many => Err(DirectoryError::Ambiguous {
                name: name.to_string(),
                count: many.len(),
            }),
        }
    }

    async fn update(&self, segment: &RemoteSegment) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        state.calls.push(Call::Update(segment.name.clone()));
        state.check(&segment.name)?;
        match state.segments.get_mut(&segment.id) {
            Some(stored) => {
                *stored = segment.clone();
                Ok(())
            }
            None => Err(DirectoryError::NotFound {
                name: segment.name.clone(),
            }),
        }
    }

    async fn delete(&self, id: SegmentId) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        state.calls.push(Call::Delete(id));
        let name = match state.segments.get(&id) {
            Some(s) => s.name.clone(),
            None => {
                return Err(DirectoryError::NotFound {
                    name: format!("id {id}"),
                })
            }
        };
        state.check(&name)?;
        if state.undeletable.contains(&id) {
            return Err(DirectoryError::Rejected {
                status: 409,
                message: format!("'{name}' is still in use"),
            });
        }
        state.segments.remove(&id);
        Ok(())
    }

    async fn list_all(&self) -> Result<BTreeMap<SegmentId, String>, DirectoryError> {
        let mut state = self.lock();
        state.calls.push(Call::ListAll);
        Ok(state
            .segments
            .iter()
            .map(|(id, s)| (*id, s.name.clone()))
            .collect())
    }
}
