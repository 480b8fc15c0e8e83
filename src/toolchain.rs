//! Toolchain resolution: turning a canonical tool name into a resolved
//! executable path plus capability bits, following an environment-variable
//! override convention (e.g. `SWIFT_DRIVER_SWIFT_FRONTEND_EXEC`) before
//! falling back to a `$PATH` search.

use crate::{error::DriverError, frontend::ToolCapabilities};
use std::path::PathBuf;

/// A tool resolved to a concrete path with known capabilities.
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    pub name: String,
    pub path: PathBuf,
    pub capabilities: ToolCapabilities,
}

/// Resolves the canonical executable for `tool_name`. Checks
/// `<ENV_PREFIX>_<TOOL_NAME>_EXEC` first (uppercased, `-` replaced with
/// `_`), then searches `$PATH` for `tool_name`, then for `legacy_name` if
/// given.
pub fn resolve(
    env_prefix: &str,
    tool_name: &str,
    legacy_name: Option<&str>,
    capabilities: ToolCapabilities,
) -> Result<ResolvedTool, DriverError> {
    let env_var = format!("{env_prefix}_{}_EXEC", tool_name.to_uppercase().replace('-', "_"));
    if let Ok(path) = std::env::var(&env_var) {
        return Ok(ResolvedTool { name: tool_name.to_string(), path: PathBuf::from(path), capabilities });
    }

    if let Some(path) = which(tool_name) {
        return Ok(ResolvedTool { name: tool_name.to_string(), path, capabilities });
    }

    if let Some(legacy) = legacy_name {
        if let Some(path) = which(legacy) {
            return Ok(ResolvedTool { name: tool_name.to_string(), path, capabilities });
        }
    }

    Err(DriverError::ToolNotFound(tool_name.to_string()))
}

fn which(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        candidate.is_file().then_some(candidate)
    })
}
