//! Environment-document loading.
//!
//! The memory bank is described by a small JSON document, handed to the
//! machine only after passing the same validation the constructor applies:
//!
//! ```json
//! {
//!   "memory": {
//!     "cell_count": 8,
//!     "cell_max_value": 16,
//!     "cell_default_value": 0,
//!     "cell_initial_values": [1, 2]
//!   }
//! }
//! ```
//!
//! `cell_count` and `cell_max_value` are required; the default value falls
//! back to 0 and the initial values to an empty list.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::interpreter::{InitError, Interpreter};

/// Faults raised while loading or validating an environment document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment file: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    #[error("malformed environment file: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    #[error("value 'cell_count' must be an integer greater than 0")]
    CellCount,

    #[error("value 'cell_max_value' must be an integer greater than 0")]
    CellMaxValue,

    #[error("value 'cell_default_value' must be an integer in the range 0..={max}")]
    CellDefaultValue { max: u32 },

    #[error("list 'cell_initial_values' cannot have more entries than the number of cells")]
    TooManyInitialValues,

    #[error("values in list 'cell_initial_values' must be integers in the range 0..={max}")]
    InitialValueOutOfRange { max: u32 },
}

/// A validated environment document.
#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    pub memory: MemorySettings,
}

/// The `memory` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySettings {
    pub cell_count: usize,
    pub cell_max_value: u32,
    #[serde(default)]
    pub cell_default_value: u32,
    #[serde(default)]
    pub cell_initial_values: Vec<u32>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            memory: MemorySettings {
                cell_count: 8,
                cell_max_value: 16,
                cell_default_value: 0,
                cell_initial_values: Vec::new(),
            },
        }
    }
}

impl Environment {
    /// Read, parse, and validate an environment file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("loading environment file from {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read { source })?;
        let environment: Environment =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse { source })?;
        environment.validate()?;
        Ok(environment)
    }

    /// Apply the constructor's rules without building a machine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let memory = &self.memory;

        if memory.cell_count < 1 {
            return Err(ConfigError::CellCount);
        }
        if memory.cell_max_value < 1 {
            return Err(ConfigError::CellMaxValue);
        }
        if memory.cell_default_value > memory.cell_max_value {
            return Err(ConfigError::CellDefaultValue {
                max: memory.cell_max_value,
            });
        }
        if memory.cell_initial_values.len() > memory.cell_count {
            return Err(ConfigError::TooManyInitialValues);
        }
        if memory
            .cell_initial_values
            .iter()
            .any(|&value| value > memory.cell_max_value)
        {
            return Err(ConfigError::InitialValueOutOfRange {
                max: memory.cell_max_value,
            });
        }

        Ok(())
    }

    /// Build a machine with this document's dimensions and seed values.
    pub fn build_interpreter(&self) -> Result<Interpreter, InitError> {
        let mut machine = Interpreter::new(self.memory.cell_count, self.memory.cell_max_value)?;
        machine.set_memory(
            &self.memory.cell_initial_values,
            self.memory.cell_default_value,
        )?;
        Ok(machine)
    }
}
