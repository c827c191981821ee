//! Command handlers, one module per subcommand.

pub mod check;
pub mod completions;
pub mod config;
pub mod init;
pub mod matching;
pub mod plan;

use std::path::PathBuf;

use tracing::{debug, instrument};

use weft_adapters::{FilesystemAspectLoader, FilesystemCatalogLoader, Journal};
use weft_core::{
    application::Weaver,
    domain::{TypeCatalog, TypeName},
};

use crate::{
    cli::{Capture, SourceArgs},
    config::AppConfig,
    error::CliResult,
};

/// A weaver over the configured catalog with the configured aspects
/// installed. CLI paths are read after the config file's.
#[instrument(skip_all)]
pub(crate) fn load_weaver(
    sources: &SourceArgs,
    config: &AppConfig,
    journal: &Journal,
) -> CliResult<Weaver> {
    let include_builtins = config.catalog.include_builtins && !sources.no_builtins;
    let catalog_roots = merged(&config.catalog.paths, &sources.catalog);
    let catalog = if catalog_roots.is_empty() {
        if include_builtins {
            TypeCatalog::with_builtins()
        } else {
            TypeCatalog::new()
        }
    } else {
        FilesystemCatalogLoader::with_roots(catalog_roots).build_catalog(include_builtins)?
    };

    let weaver = Weaver::new(catalog);
    let aspect_roots = merged(&config.aspects.paths, &sources.aspects);
    if !aspect_roots.is_empty() {
        let installed = weaver.install(&FilesystemAspectLoader::with_roots(
            aspect_roots,
            journal.clone(),
        ))?;
        debug!(aspects = installed.len(), "Aspects installed");
    }
    Ok(weaver)
}

fn merged(configured: &[PathBuf], given: &[PathBuf]) -> Vec<PathBuf> {
    configured.iter().chain(given).cloned().collect()
}

pub(crate) fn capture_pairs(captures: &[Capture]) -> Vec<(String, TypeName)> {
    captures
        .iter()
        .map(|c| (c.name.clone(), TypeName::new(&c.type_name)))
        .collect()
}
