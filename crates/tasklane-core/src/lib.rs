pub mod cli;
pub mod commands;
pub mod config;
pub mod ids;
pub mod kv;
pub mod lifecycle;
pub mod prefs;
pub mod render;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasklane"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let kv = kv::FileKv::open(&data_dir)
    .with_context(|| {
      format!(
        "failed to open store at {}",
        data_dir.display()
      )
    })?;
  let mut sync =
    view::ViewSync::open(kv)?;

  let renderer =
    render::Renderer::new(&cfg)?;

  commands::dispatch(
    &mut sync,
    &cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
