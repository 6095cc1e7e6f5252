use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyCadError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Layout Parse Error (row {row}, token {token}): {message}")]
    Parse {
        row: usize,
        token: usize,
        message: String,
    },

    #[error(
        "Capacity Error: {mode} matrix needs {rows} rows + {cols} cols = {} pins, but only {available} GPIOs are available",
        .rows + .cols
    )]
    Capacity {
        mode: String,
        rows: usize,
        cols: usize,
        available: usize,
    },

    #[error("Resource Exhausted: no GPIO left in the pool while claiming a pin for {role}")]
    ResourceExhausted { role: String },

    #[error("Template Error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("External Tool Error ({program}): {reason}")]
    ExternalTool { program: String, reason: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl KeyCadError {
    pub fn parse(row: usize, token: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            row,
            token,
            message: message.into(),
        }
    }
}

pub type KcResult<T> = Result<T, KeyCadError>;
