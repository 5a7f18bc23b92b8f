use super::CliError;
use super::commands::RunArgs;
use anyhow::Context;
use gwout_core::common::config::{RunConfig, RunSetup};
use gwout_core::domain::FieldKind;
use gwout_core::output::{OutputReader, RecordLayout};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

pub(super) fn parse_field(token: &str) -> Result<FieldKind, String> {
    FieldKind::from_token(token).ok_or_else(|| {
        format!("unknown field '{token}'; expected one of head, drawdown, flow, budget")
    })
}

pub(super) fn load_setup(args: &RunArgs) -> Result<RunSetup, CliError> {
    let config = RunConfig::load(&args.config)?;
    Ok(config.build()?)
}

pub(super) fn load_reader(args: &RunArgs) -> Result<OutputReader, CliError> {
    let setup = load_setup(args)?;
    debug!(
        config = %args.config.display(),
        output_dir = %args.output_dir.display(),
        "prepared output reader"
    );
    Ok(setup.into_reader(&args.output_dir))
}

pub(super) fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to render command output as JSON")?;
    println!("{rendered}");
    Ok(())
}

pub(super) fn schema_summary(setup: &RunSetup) -> Result<Value, CliError> {
    let schema = &setup.schema;
    let mut fields = Vec::with_capacity(FieldKind::ALL.len());
    for field in FieldKind::ALL {
        let layout = RecordLayout::for_field(field, schema);
        let instance_bytes = layout.instance_bytes(&setup.geometry)?;
        fields.push(json!({
            "field": field,
            "frequency": schema.frequency(field),
            "instances": schema.total_instances(field),
            "instanceBytes": instance_bytes,
            "perPeriod": (0..schema.period_count())
                .map(|period| schema.instance_count(field, period))
                .collect::<Vec<_>>(),
        }));
    }

    Ok(json!({
        "grid": setup.geometry,
        "simulation": schema.simulation(),
        "periods": schema.periods(),
        "headerBytes": setup.header_bytes,
        "fields": fields,
        "budgetTerms": schema.budget_term_catalog(),
    }))
}
