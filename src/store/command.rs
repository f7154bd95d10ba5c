//! Redis command/reply model shared by every [`super::RemoteStore`].

use serde_json::Value;

use super::error::{StoreError, StoreResult};

/// Condition flag for `EXPIRE` (Redis 7+).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    /// Only set an expiry when the key has none (`NX`).
    IfNone,
    /// Only set an expiry when it is later than the current one (`GT`).
    IfGreater,
}

impl ExpireCondition {
    fn as_arg(&self) -> &'static str {
        match self {
            ExpireCondition::IfNone => "NX",
            ExpireCondition::IfGreater => "GT",
        }
    }
}

/// The subset of Redis commands the cache issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get {
        key: String,
    },
    /// `SET key value EX ttl_secs`
    Set {
        key: String,
        value: String,
        ttl_secs: u64,
    },
    Del {
        keys: Vec<String>,
    },
    Exists {
        key: String,
    },
    SAdd {
        key: String,
        members: Vec<String>,
    },
    SMembers {
        key: String,
    },
    Expire {
        key: String,
        secs: u64,
        condition: Option<ExpireCondition>,
    },
    /// `SCAN cursor MATCH pattern COUNT count`
    Scan {
        cursor: u64,
        pattern: String,
        count: u64,
    },
    Ping,
}

impl Command {
    /// Returns the command name as sent on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::Del { .. } => "DEL",
            Command::Exists { .. } => "EXISTS",
            Command::SAdd { .. } => "SADD",
            Command::SMembers { .. } => "SMEMBERS",
            Command::Expire { .. } => "EXPIRE",
            Command::Scan { .. } => "SCAN",
            Command::Ping => "PING",
        }
    }

    /// Builds the Redis argument vector (command name first).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        match self {
            Command::Get { key } | Command::Exists { key } | Command::SMembers { key } => {
                args.push(key.clone());
            }
            Command::Set {
                key,
                value,
                ttl_secs,
            } => {
                args.push(key.clone());
                args.push(value.clone());
                args.push("EX".to_string());
                args.push(ttl_secs.to_string());
            }
            Command::Del { keys } => args.extend(keys.iter().cloned()),
            Command::SAdd { key, members } => {
                args.push(key.clone());
                args.extend(members.iter().cloned());
            }
            Command::Expire {
                key,
                secs,
                condition,
            } => {
                args.push(key.clone());
                args.push(secs.to_string());
                if let Some(condition) = condition {
                    args.push(condition.as_arg().to_string());
                }
            }
            Command::Scan {
                cursor,
                pattern,
                count,
            } => {
                args.push(cursor.to_string());
                args.push("MATCH".to_string());
                args.push(pattern.clone());
                args.push("COUNT".to_string());
                args.push(count.to_string());
            }
            Command::Ping => {}
        }
        args
    }
}

/// A decoded Redis reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Status(String),
    Int(i64),
    Bulk(String),
    Array(Vec<Reply>),
}

impl Reply {
    /// Converts an Upstash REST `result` value into a reply.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Reply::Nil,
            Value::Bool(b) => Reply::Int(i64::from(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Reply::Int(i),
                None => Reply::Bulk(n.to_string()),
            },
            Value::String(s) if s == "OK" || s == "PONG" => Reply::Status(s),
            Value::String(s) => Reply::Bulk(s),
            Value::Array(items) => Reply::Array(items.into_iter().map(Reply::from_json).collect()),
            Value::Object(_) => Reply::Bulk(value.to_string()),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Returns the bulk string, `None` for nil.
    pub fn into_opt_string(self) -> StoreResult<Option<String>> {
        match self {
            Reply::Nil => Ok(None),
            Reply::Bulk(s) | Reply::Status(s) => Ok(Some(s)),
            Reply::Int(i) => Ok(Some(i.to_string())),
            other => Err(StoreError::UnexpectedReply {
                expected: "string",
                actual: format!("{other:?}"),
            }),
        }
    }

    pub fn into_int(self) -> StoreResult<i64> {
        match self {
            Reply::Int(i) => Ok(i),
            Reply::Nil => Ok(0),
            Reply::Bulk(ref s) => s.parse().map_err(|_| StoreError::UnexpectedReply {
                expected: "integer",
                actual: format!("{self:?}"),
            }),
            other => Err(StoreError::UnexpectedReply {
                expected: "integer",
                actual: format!("{other:?}"),
            }),
        }
    }

    /// Returns the array as strings, treating nil as empty.
    pub fn into_string_vec(self) -> StoreResult<Vec<String>> {
        match self {
            Reply::Nil => Ok(Vec::new()),
            Reply::Array(items) => items
                .into_iter()
                .filter_map(|item| item.into_opt_string().transpose())
                .collect(),
            other => Err(StoreError::UnexpectedReply {
                expected: "array",
                actual: format!("{other:?}"),
            }),
        }
    }

    /// Splits a `SCAN` reply into `(next_cursor, keys)`.
    pub fn into_scan_page(self) -> StoreResult<(u64, Vec<String>)> {
        match self {
            Reply::Array(mut items) if items.len() == 2 => {
                let keys = items.pop().map(Reply::into_string_vec).transpose()?;
                let cursor = items
                    .pop()
                    .map(Reply::into_int)
                    .transpose()?
                    .unwrap_or_default();
                Ok((cursor.max(0) as u64, keys.unwrap_or_default()))
            }
            other => Err(StoreError::UnexpectedReply {
                expected: "scan page",
                actual: format!("{other:?}"),
            }),
        }
    }
}
