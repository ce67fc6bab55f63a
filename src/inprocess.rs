//! Run modules without HTTP: embed a context in your own process and go
//! straight at the executor registry.

use crate::context::RuntimeContext;
use crate::error::Error;
use crate::value::{Parameters, Row};

/// Execute a module by its flattened context name against a context
/// snapshot. Runs the full handler chain, exactly like the HTTP path.
pub async fn execute(
    context: &RuntimeContext,
    context_name: &str,
    parameters: Parameters,
) -> Result<Vec<Row>, Error> {
    let executor = context
        .executor(context_name)
        .ok_or_else(|| Error::ModuleNotFound(context_name.to_string()))?;
    executor.run(parameters).await
}
