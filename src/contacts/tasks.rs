// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Task mirror.
//!
//! Tasks are created and advanced on chain; the indexer replays those events
//! here so the gate can resolve creator and helper without an RPC round trip.

use chrono::{DateTime, Utc};

use super::ContactError;
use crate::models::{Task, TaskKey, TaskStatus, WalletAddress};
use crate::storage::{ContactDatabase, DbError};

/// Fields of a newly published task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_id: u64,
    pub title: String,
    pub description: String,
    pub creator: WalletAddress,
    pub reward: String,
    pub category: Option<String>,
}

pub struct TaskMirror<'a> {
    db: &'a ContactDatabase,
    chain_id: u64,
}

impl<'a> TaskMirror<'a> {
    pub fn new(db: &'a ContactDatabase, chain_id: u64) -> Self {
        Self { db, chain_id }
    }

    pub fn publish_task(&self, new: NewTask, now: DateTime<Utc>) -> Result<Task, ContactError> {
        if new.title.trim().is_empty() {
            return Err(ContactError::InvalidInput("title must not be empty".into()));
        }
        if new.reward.is_empty() || !new.reward.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ContactError::InvalidInput(
                "reward must be a non-negative integer in the token's smallest unit".into(),
            ));
        }

        let task = Task {
            chain_id: self.chain_id,
            task_id: new.task_id,
            title: new.title,
            description: new.description,
            creator: new.creator,
            helper: None,
            reward: new.reward,
            status: TaskStatus::Open,
            category: new.category.filter(|c| !c.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };

        self.db.insert_task(&task).map_err(|e| match e {
            DbError::AlreadyExists(_) => ContactError::TaskExists(task.key()),
            other => other.into(),
        })?;

        tracing::info!(task = %task.key(), creator = %task.creator, "Task published");
        Ok(task)
    }

    pub fn get_task(&self, task_id: u64) -> Result<Task, ContactError> {
        let key = TaskKey::new(self.chain_id, task_id);
        self.db.get_task(&key)?.ok_or(ContactError::TaskNotFound(key))
    }

    /// Record `helper` accepting the task.
    pub fn accept_task(
        &self,
        task_id: u64,
        helper: WalletAddress,
        now: DateTime<Utc>,
    ) -> Result<Task, ContactError> {
        let key = TaskKey::new(self.chain_id, task_id);
        let task = self.update(key, |task| Ok(task.accept(helper, now)?))?;
        tracing::info!(task = %key, helper = ?task.helper, "Task accepted");
        Ok(task)
    }

    /// Apply an externally observed status.
    pub fn update_status(
        &self,
        task_id: u64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Task, ContactError> {
        let key = TaskKey::new(self.chain_id, task_id);
        let task = self.update(key, |task| Ok(task.apply_status(status, now)?))?;
        tracing::info!(task = %key, status = %task.status, "Task status updated");
        Ok(task)
    }

    fn update(
        &self,
        key: TaskKey,
        f: impl FnOnce(&mut Task) -> Result<(), ContactError>,
    ) -> Result<Task, ContactError> {
        self.db.update_task(&key, f).map_err(|e| match e {
            ContactError::Storage(DbError::NotFound(_)) => ContactError::TaskNotFound(key),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::testing::Fixture;
    use crate::models::TaskStateError;

    fn new_task(fx: &Fixture, task_id: u64) -> NewTask {
        NewTask {
            task_id,
            title: "Walk my dog".into(),
            description: "Twice a day".into(),
            creator: fx.alice.clone(),
            reward: "250000".into(),
            category: Some("pets".into()),
        }
    }

    #[test]
    fn publish_creates_open_task() {
        let fx = Fixture::new();
        let task = fx.mirror().publish_task(new_task(&fx, 3), Utc::now()).unwrap();
        assert_eq!(task.status, TaskStatus::Open);
        assert!(task.helper.is_none());
        assert_eq!(fx.mirror().get_task(3).unwrap(), task);
    }

    #[test]
    fn duplicate_publish_is_rejected() {
        let fx = Fixture::new();
        fx.mirror().publish_task(new_task(&fx, 3), Utc::now()).unwrap();
        assert!(matches!(
            fx.mirror().publish_task(new_task(&fx, 3), Utc::now()),
            Err(ContactError::TaskExists(_))
        ));
    }

    #[test]
    fn publish_validates_input() {
        let fx = Fixture::new();
        let mut bad = new_task(&fx, 3);
        bad.reward = "1.5".into();
        assert!(matches!(
            fx.mirror().publish_task(bad, Utc::now()),
            Err(ContactError::InvalidInput(_))
        ));

        let mut bad = new_task(&fx, 3);
        bad.title = " ".into();
        assert!(matches!(
            fx.mirror().publish_task(bad, Utc::now()),
            Err(ContactError::InvalidInput(_))
        ));
    }

    #[test]
    fn accept_is_persisted_and_exclusive() {
        let fx = Fixture::new();
        fx.mirror().publish_task(new_task(&fx, 3), Utc::now()).unwrap();

        let task = fx.mirror().accept_task(3, fx.bob.clone(), Utc::now()).unwrap();
        assert_eq!(task.helper.as_ref(), Some(&fx.bob));
        assert_eq!(fx.mirror().get_task(3).unwrap().status, TaskStatus::InProgress);

        assert!(matches!(
            fx.mirror().accept_task(3, fx.eve.clone(), Utc::now()),
            Err(ContactError::InvalidTaskState(TaskStateError::HelperAlreadySet))
        ));
        assert_eq!(fx.mirror().get_task(3).unwrap().helper.as_ref(), Some(&fx.bob));
    }

    #[test]
    fn unknown_tasks_are_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.mirror().accept_task(77, fx.bob.clone(), Utc::now()),
            Err(ContactError::TaskNotFound(_))
        ));
        assert!(matches!(
            fx.mirror().update_status(77, TaskStatus::Cancelled, Utc::now()),
            Err(ContactError::TaskNotFound(_))
        ));
    }

    #[test]
    fn status_updates_follow_lifecycle() {
        let fx = Fixture::new();
        fx.mirror().publish_task(new_task(&fx, 3), Utc::now()).unwrap();
        assert!(matches!(
            fx.mirror().update_status(3, TaskStatus::Completed, Utc::now()),
            Err(ContactError::InvalidTaskState(_))
        ));

        fx.mirror().accept_task(3, fx.bob.clone(), Utc::now()).unwrap();
        fx.mirror().update_status(3, TaskStatus::Submitted, Utc::now()).unwrap();
        let done = fx.mirror().update_status(3, TaskStatus::Completed, Utc::now()).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
    }
}
