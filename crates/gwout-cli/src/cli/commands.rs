use super::CliError;
use super::helpers::*;
use gwout_core::domain::{FieldKind, OutputCoordinate};
use serde_json::json;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Run configuration (JSON)
    #[arg(long, short = 'c', default_value = "gwout.json")]
    pub(super) config: PathBuf,

    /// Directory holding the engine's output files
    #[arg(long, short = 'o', default_value = ".")]
    pub(super) output_dir: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct CoordinateArgs {
    /// Stress period (zero-based)
    #[arg(long, default_value_t = 0)]
    period: usize,

    /// Time step within the period (zero-based)
    #[arg(long, default_value_t = 0)]
    step: usize,

    /// Layer (zero-based)
    #[arg(long, default_value_t = 0)]
    layer: usize,
}

impl CoordinateArgs {
    fn coordinate(&self) -> OutputCoordinate {
        OutputCoordinate::new(self.period, self.step, self.layer)
    }
}

#[derive(clap::Args)]
pub(super) struct DecodeArgs {
    /// Field to decode: head, drawdown, flow or budget
    #[arg(value_parser = parse_field)]
    field: FieldKind,

    #[command(flatten)]
    at: CoordinateArgs,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(clap::Args)]
pub(super) struct RowArgs {
    /// Field to read: head or drawdown
    #[arg(value_parser = parse_field)]
    field: FieldKind,

    #[command(flatten)]
    at: CoordinateArgs,

    /// Row within the layer (zero-based)
    #[arg(long)]
    row: usize,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(clap::Args)]
pub(super) struct SeriesArgs {
    /// Field to read: head or drawdown
    #[arg(value_parser = parse_field)]
    field: FieldKind,

    /// Layer (zero-based)
    #[arg(long)]
    layer: usize,

    /// Row (zero-based)
    #[arg(long)]
    row: usize,

    /// Column (zero-based)
    #[arg(long)]
    col: usize,

    #[command(flatten)]
    run: RunArgs,
}

pub(super) fn run_decode_command(args: DecodeArgs) -> Result<i32, CliError> {
    let reader = load_reader(&args.run)?;
    let coordinate = args.at.coordinate();
    let decoded = reader.read(args.field, coordinate)?;
    print_json(&json!({
        "field": args.field,
        "coordinate": coordinate,
        "data": decoded,
    }))?;
    Ok(0)
}

pub(super) fn run_row_command(args: RowArgs) -> Result<i32, CliError> {
    let reader = load_reader(&args.run)?;
    let coordinate = args.at.coordinate();
    let values = reader.row(args.field, coordinate, args.row)?;
    print_json(&json!({
        "field": args.field,
        "coordinate": coordinate,
        "row": args.row,
        "values": values,
    }))?;
    Ok(0)
}

pub(super) fn run_series_command(args: SeriesArgs) -> Result<i32, CliError> {
    let reader = load_reader(&args.run)?;
    let series = reader.cell_series(args.field, args.layer, args.row, args.col)?;
    print_json(&json!({
        "field": args.field,
        "cell": {"layer": args.layer, "row": args.row, "col": args.col},
        "series": series,
    }))?;
    Ok(0)
}

pub(super) fn run_catalog_command(args: RunArgs) -> Result<i32, CliError> {
    let setup = load_setup(&args)?;
    let catalog = setup.schema.budget_term_catalog();
    print_json(&json!({
        "simulation": setup.schema.simulation(),
        "constantHeadRows": setup.schema.constant_head().rows_with_constant_head(),
        "terms": catalog,
    }))?;
    Ok(0)
}

pub(super) fn run_schema_command(args: RunArgs) -> Result<i32, CliError> {
    let setup = load_setup(&args)?;
    print_json(&schema_summary(&setup)?)?;
    Ok(0)
}
