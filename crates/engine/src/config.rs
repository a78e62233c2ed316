use serde::Deserialize;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bound of the commit request queue. `None` queues without limit;
    /// with a bound, `submit` blocks while the queue is full.
    pub queue_capacity: Option<usize>,
    /// Thread name of the commit worker.
    pub worker_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            worker_name: "colloboque-commit".into(),
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.queue_capacity == Some(0) {
            return Err(EngineError::Config(
                "queue_capacity must be positive; omit it for an unbounded queue".into(),
            ));
        }
        if self.worker_name.is_empty() {
            return Err(EngineError::Config("worker_name must not be empty".into()));
        }
        Ok(())
    }
}
