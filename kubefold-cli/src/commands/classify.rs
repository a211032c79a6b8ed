//! File name classification

use crate::output::{self, OutputFormat};
use anyhow::Result;
use kubefold_common::ClassificationRules;
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct ClassifyRow {
    file: String,
    kind: String,
    volume: String,
}

impl ClassifyRow {
    fn new(name: &str, rules: &ClassificationRules) -> Self {
        match rules.classify(name) {
            Some(target) => Self {
                file: name.to_string(),
                kind: target.kind.to_string(),
                volume: target.name,
            },
            None => Self {
                file: name.to_string(),
                kind: "-".to_string(),
                volume: "-".to_string(),
            },
        }
    }
}

pub fn handle_classify_command(
    names: &[String],
    rules: &ClassificationRules,
    format: OutputFormat,
) -> Result<()> {
    let rows: Vec<ClassifyRow> = names.iter().map(|n| ClassifyRow::new(n, rules)).collect();
    output::print_output(rows, format)
}
