use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

const TEMPLATE: &str = include_str!("../templates/tool.rs.tmpl");
const DEFAULT_DESCRIPTION: &str = "Describe what this tool does";

/// Tool sources, relative to the workspace root.
pub const TOOLS_DIR: &str = "crates/toolbox-mcp/src/tools";

const MODULES_START: &str = "// TOOL_MODULES_START";
const MODULES_END: &str = "// TOOL_MODULES_END";
const REGISTER_START: &str = "// TOOL_REGISTER_START";
const REGISTER_END: &str = "// TOOL_REGISTER_END";

/// The names a tool goes by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNames {
    /// Registry name, e.g. `get-weather`.
    pub kebab: String,
    /// Module name, e.g. `get_weather`.
    pub snake: String,
    /// Handler type, e.g. `GetWeatherTool`.
    pub handler: String,
}

impl ToolNames {
    /// Derive all names from user input such as `getWeather`, `get weather` or `get_weather`.
    pub fn from_input(raw: &str) -> anyhow::Result<Self> {
        let words = split_words(raw);
        let valid = words
            .first()
            .and_then(|w| w.chars().next())
            .is_some_and(|c| c.is_ascii_alphabetic());
        if !valid {
            anyhow::bail!("Tool name must start with a letter: {raw:?}");
        }

        let pascal: String = words
            .iter()
            .map(|w| {
                let mut chars = w.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_ascii_uppercase().to_string() + chars.as_str()
                })
            })
            .collect();

        Ok(Self {
            kebab: words.join("-"),
            snake: words.join("_"),
            handler: format!("{pascal}Tool"),
        })
    }
}

/// Lowercase words, split on separators and lower-to-upper case changes.
fn split_words(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;

    for c in raw.trim().chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower_or_digit && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Source of a new tool module.
pub fn render_tool(names: &ToolNames, description: &str) -> String {
    TEMPLATE
        .replace("__TOOL_NAME__", &names.kebab)
        .replace("__TOOL_DESCRIPTION__", &format!("{description:?}"))
        .replace("__TOOL_STRUCT__", &names.handler)
}

/// Insert `line` just before `end`, unless the `start..end` region already holds it.
pub fn insert_between(source: &str, start: &str, end: &str, line: &str) -> anyhow::Result<String> {
    let (Some(start_at), Some(end_at)) = (source.find(start), source.find(end)) else {
        anyhow::bail!("Missing marker {start} / {end}");
    };
    if end_at < start_at {
        anyhow::bail!("Markers out of order: {start} / {end}");
    }

    if source[start_at..end_at].lines().any(|l| l.trim() == line.trim()) {
        return Ok(source.to_string());
    }

    let line_start = source[..end_at].rfind('\n').map_or(0, |i| i + 1);
    let mut out = String::with_capacity(source.len() + line.len() + 1);
    out.push_str(&source[..line_start]);
    out.push_str(line);
    out.push('\n');
    out.push_str(&source[line_start..]);
    Ok(out)
}

/// Generate a tool under `root` and register it. Returns the new file's path.
pub fn run(root: &Path, raw_name: &str, description: &str) -> anyhow::Result<PathBuf> {
    let names = ToolNames::from_input(raw_name)?;
    let description = match description.trim() {
        "" => DEFAULT_DESCRIPTION,
        d => d,
    };

    let tools_dir = root.join(TOOLS_DIR);
    let registry_path = tools_dir.join("mod.rs");
    let tool_path = tools_dir.join(format!("{}.rs", names.snake));

    if tool_path.exists() {
        anyhow::bail!("Tool already exists: {}", tool_path.display());
    }

    let registry = fs::read_to_string(&registry_path)
        .with_context(|| format!("failed to read {}", registry_path.display()))?;
    let registry = insert_between(
        &registry,
        MODULES_START,
        MODULES_END,
        &format!("pub mod {};", names.snake),
    )?;
    let registry = insert_between(
        &registry,
        REGISTER_START,
        REGISTER_END,
        &format!(
            "    registry.register({0}::definition(), Arc::new({0}::{1}))?;",
            names.snake, names.handler
        ),
    )?;

    fs::write(&tool_path, render_tool(&names, description))
        .with_context(|| format!("failed to write {}", tool_path.display()))?;
    fs::write(&registry_path, registry)
        .with_context(|| format!("failed to update {}", registry_path.display()))?;

    tracing::info!(tool = %names.kebab, path = %tool_path.display(), "tool scaffolded");
    Ok(tool_path)
}
