//! `weft check`: parse a pointcut and print its normalised form.

use serde::Serialize;
use tracing::instrument;

use weft_adapters::Journal;

use crate::{
    cli::CheckArgs,
    commands::{capture_pairs, load_weaver},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[derive(Debug, Serialize)]
struct CheckReport {
    expression: String,
    normalized: String,
    captures: Vec<CaptureReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<String>,
}

#[derive(Debug, Serialize)]
struct CaptureReport {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[instrument(skip_all, fields(expression = %args.expression))]
pub fn execute(args: CheckArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let weaver = load_weaver(&args.sources, &config, &Journal::new())?;
    let pointcut = weaver.parse_with(&args.expression, &capture_pairs(&args.captures))?;

    let report = CheckReport {
        expression: args.expression.clone(),
        normalized: pointcut.to_string(),
        captures: pointcut
            .captures()
            .iter()
            .map(|(name, ty)| CaptureReport {
                name: name.clone(),
                type_name: ty.to_string(),
            })
            .collect(),
        tree: args.tree.then(|| pointcut.tree()),
    };

    if output.is_json() {
        output.json(&report)?;
        return Ok(());
    }

    output.success("Pointcut is valid")?;
    output.print(&format!("  normalized: {}", report.normalized))?;
    for capture in &report.captures {
        output.print(&format!("  capture:    {} : {}", capture.name, capture.type_name))?;
    }
    if let Some(tree) = &report.tree {
        output.print("")?;
        output.print(tree.trim_end())?;
    }
    Ok(())
}
