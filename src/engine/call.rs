use serde::Serialize;

/// One positional argument of an engine call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngineArg {
    Text(String),
    Float(f64),
    Flag(bool),
}

impl EngineArg {
    /// Literal as written in an engine script statement.
    pub fn to_literal(&self) -> String {
        match self {
            EngineArg::Text(text) => format!("'{}'", text.replace('\'', "''")),
            EngineArg::Float(value) if value.is_nan() => "NaN".to_string(),
            EngineArg::Float(value) if value.is_infinite() => {
                if *value > 0.0 { "Inf" } else { "-Inf" }.to_string()
            }
            EngineArg::Float(value) => format!("{:e}", value),
            EngineArg::Flag(flag) => flag.to_string(),
        }
    }
}

/// A fully-resolved call: entry point plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineCall {
    pub function: String,
    pub args: Vec<EngineArg>,
}

impl EngineCall {
    /// Script statement invoking the call without requesting outputs.
    pub fn render(&self) -> String {
        let args: Vec<String> = self.args.iter().map(EngineArg::to_literal).collect();
        format!("{}({})", self.function, args.join(", "))
    }
}

/// Standard output and standard error captured for a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallOutput {
    pub stdout: String,
    pub stderr: String,
}
