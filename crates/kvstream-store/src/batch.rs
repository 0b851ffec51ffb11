use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

/// A single command queued in a [`Batch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchCommand {
    Set { key: String, value: Bytes },
    Append { key: String, value: Bytes },
    Rename { from: String, to: String },
    Expire { key: String, ttl: Duration },
    Delete { key: String },
}

impl BatchCommand {
    /// Command name as the store protocol spells it, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "SET",
            Self::Append { .. } => "APPEND",
            Self::Rename { .. } => "RENAME",
            Self::Expire { .. } => "EXPIRE",
            Self::Delete { .. } => "DEL",
        }
    }
}

/// Outcome of one executed batch command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchReply {
    /// Command completed without a value (`SET`, `RENAME`).
    Done,
    /// New total length returned by `APPEND`.
    Length(u64),
    /// Whether the key existed (`EXPIRE`, `DEL`).
    Existed(bool),
}

/// Caller-owned group of deferred store commands.
///
/// Commands are only queued here; nothing touches the store until the owner
/// passes the batch to [`KvStore::exec`](crate::KvStore::exec). Clones share
/// the same queue, so a batch handed to a write session can still be executed
/// by the caller that created it.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    commands: Arc<Mutex<Vec<BatchCommand>>>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Bytes>) -> &Self {
        self.push(BatchCommand::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn append(&self, key: impl Into<String>, value: impl Into<Bytes>) -> &Self {
        self.push(BatchCommand::Append {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn rename(&self, from: impl Into<String>, to: impl Into<String>) -> &Self {
        self.push(BatchCommand::Rename {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn expire(&self, key: impl Into<String>, ttl: Duration) -> &Self {
        self.push(BatchCommand::Expire {
            key: key.into(),
            ttl,
        })
    }

    pub fn delete(&self, key: impl Into<String>) -> &Self {
        self.push(BatchCommand::Delete { key: key.into() })
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.lock().expect("batch lock poisoned").len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the queued commands, in queue order.
    pub fn commands(&self) -> Vec<BatchCommand> {
        self.commands.lock().expect("batch lock poisoned").clone()
    }

    /// Drain the queue. Used by store backends when executing.
    pub fn take(&self) -> Vec<BatchCommand> {
        std::mem::take(&mut *self.commands.lock().expect("batch lock poisoned"))
    }

    fn push(&self, command: BatchCommand) -> &Self {
        self.commands
            .lock()
            .expect("batch lock poisoned")
            .push(command);
        self
    }
}
