//! Output formatting for CLI
//!
//! Status lines go to stdout, one per created/patched/deleted artifact.
//! Diagnostics are left to the tracing subscriber on stderr.

use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Table,
        }
    }

    /// Status lines and tables are only printed in table mode
    pub fn is_table(&self) -> bool {
        *self == OutputFormat::Table
    }
}

/// Print data in the specified format (table, JSON, or YAML)
pub fn print_output<T: Tabled + Serialize>(data: Vec<T>, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(data),
        OutputFormat::Json => print_json(&data)?,
        OutputFormat::Yaml => print_yaml(&data)?,
    }
    Ok(())
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            // No table layout for nested reports
            print_json(data)?;
        }
        OutputFormat::Json => print_json(data)?,
        OutputFormat::Yaml => print_yaml(data)?,
    }
    Ok(())
}

/// Print data as a table using the tabled crate
pub fn print_table<T: Tabled>(data: Vec<T>) {
    if data.is_empty() {
        println!("{}", "No results found".yellow());
        return;
    }

    let table = Table::new(data);
    println!("{}", table);
}

/// Print data as pretty-printed JSON
pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    print!("{}", yaml);
    Ok(())
}

/// Print a success message with green checkmark
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a status line for a written artifact
pub fn print_created(resource_type: &str, path: &Path) {
    println!(
        "{} {} '{}' created",
        "✓".green().bold(),
        resource_type.green(),
        path.display().to_string().green().bold()
    );
}

/// Print a status line for a rewritten artifact
pub fn print_patched(resource_type: &str, path: &Path) {
    println!(
        "{} {} '{}' patched",
        "✓".green().bold(),
        resource_type.green(),
        path.display().to_string().green().bold()
    );
}

/// Print a status line for a removed artifact
pub fn print_deleted(resource_type: &str, path: &Path) {
    println!(
        "{} {} '{}' deleted",
        "✓".green().bold(),
        resource_type.green(),
        path.display().to_string().green().bold()
    );
}

/// Print a status line for an artifact a dry run would touch
pub fn print_planned(action: &str, resource_type: &str, path: &Path) {
    println!(
        "{} would {} {} '{}'",
        "○".cyan().bold(),
        action,
        resource_type,
        path.display().to_string().bold()
    );
}

/// Print an error message with red X
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print an info message with blue i
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message with yellow triangle
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Final file name component, or the whole path if there is none
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("yml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_str("anything"), OutputFormat::Table);
        assert!(OutputFormat::Table.is_table());
    }

    #[test]
    fn test_file_label() {
        assert_eq!(file_label(Path::new("/srv/k8s/web-pod.yaml")), "web-pod.yaml");
        assert_eq!(file_label(Path::new("/")), "/");
    }
}
