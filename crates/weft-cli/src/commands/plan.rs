//! `weft plan`: show the advice chain a proxied call would run.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use weft_adapters::Journal;
use weft_core::{
    application::{Chain, Weaver},
    domain::{Phase, ProxyMode, ProxyShape, Signature, TypeName, Verdict},
};

use crate::{
    cli::PlanArgs,
    commands::load_weaver,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

#[derive(Debug, Serialize)]
struct PlanReport {
    join_point: String,
    proxy: String,
    mode: ProxyMode,
    registry_version: u64,
    /// How the call reaches the target.
    dispatch: Dispatch,
    advices: Vec<AdviceReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Dispatch {
    /// Runs the chain, then the target.
    Intercepted,
    /// Final method on a subclass proxy: straight to the target.
    Direct,
    /// Not part of any visible contract; the proxy rejects the call.
    NotExposed,
}

#[derive(Debug, Serialize)]
struct AdviceReport {
    aspect: String,
    order: i32,
    advice: String,
    phase: Phase,
    pointcut: String,
    verdict: Verdict,
}

#[instrument(skip_all, fields(join_point = %args.join_point))]
pub fn execute(args: PlanArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let (type_name, method) = split_join_point(&args.join_point)?;
    let weaver = load_weaver(&args.sources, &config, &Journal::new())?;

    let signatures = resolve(&weaver, &type_name, method, &args.params)?;
    let mode = args.mode.map(ProxyMode::from).unwrap_or(config.proxy.mode);
    let visible: Vec<TypeName> = args.visible.iter().map(TypeName::new).collect();
    let shape = weaver.shape_for(&type_name, mode, &visible)?;

    let reports: Vec<PlanReport> = signatures
        .iter()
        .map(|sig| {
            let chain = weaver.plan(sig, &shape);
            report(&weaver, &shape, sig, &chain)
        })
        .collect();

    if output.is_json() {
        output.json(&reports)?;
        return Ok(());
    }
    for report in &reports {
        render(report, &output)?;
    }
    Ok(())
}

/// `a.b.OrderServiceImpl.orderItem` into type and method.
fn split_join_point(spec: &str) -> CliResult<(TypeName, &str)> {
    match spec.rsplit_once('.') {
        Some((ty, method)) if !ty.is_empty() && !method.is_empty() => {
            Ok((TypeName::new(ty), method))
        }
        _ => Err(CliError::InvalidJoinPoint {
            spec: spec.to_owned(),
        }),
    }
}

fn resolve(
    weaver: &Weaver,
    type_name: &TypeName,
    method: &str,
    params: &[String],
) -> CliResult<Vec<Arc<Signature>>> {
    let catalog = weaver.catalog();
    if !catalog.contains(type_name) {
        return Err(CliError::TypeNotFound {
            type_name: type_name.to_string(),
        });
    }

    let all = catalog.methods_of(type_name);
    let wanted: Vec<TypeName> = params.iter().map(TypeName::new).collect();
    let found: Vec<Arc<Signature>> = all
        .iter()
        .filter(|sig| sig.name() == method)
        .filter(|sig| wanted.is_empty() || sig.parameter_types() == wanted.as_slice())
        .cloned()
        .collect();

    if found.is_empty() {
        return Err(CliError::MethodNotFound {
            type_name: type_name.to_string(),
            method: method.to_owned(),
            candidates: all.iter().map(ToString::to_string).collect(),
        });
    }
    Ok(found)
}

fn report(weaver: &Weaver, shape: &ProxyShape, sig: &Signature, chain: &Chain) -> PlanReport {
    let catalog = weaver.catalog();
    let dispatch = match shape.mode() {
        ProxyMode::Subclass if sig.is_final() => Dispatch::Direct,
        ProxyMode::Interface
            if !shape
                .contracts()
                .iter()
                .any(|contract| catalog.methods_of(contract).iter().any(|m| m.same_shape(sig))) =>
        {
            Dispatch::NotExposed
        }
        _ => Dispatch::Intercepted,
    };

    PlanReport {
        join_point: format!("execution({sig})"),
        proxy: shape.display_name(),
        mode: shape.mode(),
        registry_version: chain.version(),
        dispatch,
        advices: chain
            .links()
            .iter()
            .map(|link| AdviceReport {
                aspect: link.aspect.name().to_owned(),
                order: link.aspect.order(),
                advice: link.advice.name().to_owned(),
                phase: link.advice.phase(),
                pointcut: link.advice.pointcut().to_string(),
                verdict: link.verdict,
            })
            .collect(),
    }
}

fn render(report: &PlanReport, output: &OutputManager) -> CliResult<()> {
    output.header(&report.join_point)?;
    output.print(&format!("  proxy: {} ({})", report.proxy, report.mode))?;

    match report.dispatch {
        Dispatch::Direct => {
            output.warning("final method: the proxy calls the target directly, no advice runs")?;
            return Ok(());
        }
        Dispatch::NotExposed => {
            output.warning("not declared by any visible contract: the proxy rejects this call")?;
            return Ok(());
        }
        Dispatch::Intercepted => {}
    }

    if report.advices.is_empty() {
        output.info("No advice applies; calls go straight to the target")?;
        return Ok(());
    }

    let aspect_width = report.advices.iter().map(|a| a.aspect.len()).max().unwrap_or(0);
    let advice_width = report.advices.iter().map(|a| a.advice.len()).max().unwrap_or(0);
    for (i, advice) in report.advices.iter().enumerate() {
        let mut line = format!(
            "  {:>2}. {:<aspect_width$}  order {:<3} {:<16} {:<advice_width$}  {}",
            i + 1,
            advice.aspect,
            advice.order,
            advice.phase.to_string(),
            advice.advice,
            advice.pointcut,
        );
        if advice.verdict == Verdict::Dynamic {
            line.push(' ');
            line.push_str(&output.dim("[dynamic: checked per call]"));
        }
        output.print(&line)?;
    }
    output.print(&output.dim(&format!(
        "  registry version {}",
        report.registry_version
    )))?;
    Ok(())
}
