//! `weft match`: list the join points a pointcut can select.
//!
//! Every method of every concrete catalog type is a candidate join point.
//! The target type is known per candidate, so `target` and `@target` are
//! decided here; `this` and `args` values may still leave a match dynamic.

use serde::Serialize;
use tracing::{debug, instrument};

use weft_adapters::Journal;
use weft_core::domain::{RuntimeContext, TypeKind, Verdict};

use crate::{
    cli::MatchArgs,
    commands::{capture_pairs, load_weaver},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[derive(Debug, Serialize)]
struct MatchReport {
    expression: String,
    join_points: Vec<JoinPointReport>,
}

#[derive(Debug, Serialize)]
struct JoinPointReport {
    #[serde(rename = "type")]
    type_name: String,
    signature: String,
    verdict: Verdict,
}

#[instrument(skip_all, fields(expression = %args.expression))]
pub fn execute(args: MatchArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let weaver = load_weaver(&args.sources, &config, &Journal::new())?;
    let pointcut = weaver.parse_with(&args.expression, &capture_pairs(&args.captures))?;
    let catalog = weaver.catalog();

    let mut join_points = Vec::new();
    let mut candidates = 0usize;
    for descriptor in catalog.types() {
        if descriptor.kind() != TypeKind::Concrete {
            continue;
        }
        for method in catalog.methods_of(descriptor.name()) {
            candidates += 1;
            let verdict = pointcut.evaluate(
                catalog,
                &method,
                RuntimeContext::new().with_target(descriptor.name()),
            );
            if verdict != Verdict::Never || args.all {
                join_points.push(JoinPointReport {
                    type_name: descriptor.name().to_string(),
                    signature: method.to_string(),
                    verdict,
                });
            }
        }
    }
    debug!(candidates, listed = join_points.len(), "Join points evaluated");

    if output.is_json() {
        output.json(&MatchReport {
            expression: args.expression,
            join_points,
        })?;
        return Ok(());
    }

    let matched = join_points
        .iter()
        .filter(|jp| jp.verdict != Verdict::Never)
        .count();
    let dynamic = join_points
        .iter()
        .filter(|jp| jp.verdict == Verdict::Dynamic)
        .count();

    output.header(&format!("Join points for {pointcut}"))?;
    for jp in &join_points {
        let line = match jp.verdict {
            Verdict::Always => format!("  \u{2713} {}", jp.signature),
            Verdict::Dynamic => format!(
                "  ? {} {}",
                jp.signature,
                output.dim("[dynamic: checked per call]")
            ),
            Verdict::Never => output.dim(&format!("  \u{2717} {}", jp.signature)),
        };
        output.print(&line)?;
    }
    output.print("")?;
    output.info(&format!(
        "{matched} of {candidates} join points can match ({dynamic} dynamic)"
    ))?;
    Ok(())
}
