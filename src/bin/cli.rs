use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use csv::{Position, ReaderBuilder, Trim};
use log::{debug, info};

use bayunjoin::catalog::{Column, DataType, Schema, SchemaRef};
use bayunjoin::query::executor::type_conversion::parse_value;
use bayunjoin::{
    collect_all, operator_ref, CompareOp, HashJoinConfig, JoinOperator, JoinPredicate, JoinStrategy, Operator,
    QueryResultSet, TupleScan,
};

#[derive(Parser)]
#[command(author, version, about = "bnjoin - join two typed CSV files")]
struct Cli {
    /// Left (outer / build) input file
    #[arg(long)]
    left: PathBuf,

    /// Right (inner / probe) input file
    #[arg(long)]
    right: PathBuf,

    /// Alias qualifying the left fields (defaults to the file stem)
    #[arg(long)]
    left_alias: Option<String>,

    /// Alias qualifying the right fields (defaults to the file stem)
    #[arg(long)]
    right_alias: Option<String>,

    /// Left join field: position or field name
    #[arg(long, default_value = "0")]
    left_field: String,

    /// Right join field: position or field name
    #[arg(long, default_value = "0")]
    right_field: String,

    /// Comparison operator (=, <>, <, <=, >, >=, like)
    #[arg(long, default_value = "=")]
    op: String,

    /// Join algorithm: nested-loop or hash
    #[arg(long, default_value = "nested-loop")]
    strategy: String,

    /// Initial hash index capacity (hash strategy only)
    #[arg(long, default_value_t = HashJoinConfig::default().initial_capacity)]
    hash_capacity: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Load a CSV file whose first record is the header `name:type,...`
fn load_csv(path: &Path, alias: &str) -> Result<TupleScan> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let header = reader
        .headers()
        .with_context(|| format!("Failed to read the header of {}", path.display()))?
        .clone();
    if header.is_empty() {
        bail!("{} is empty, expected a header record", path.display());
    }
    let columns = header
        .iter()
        .map(|field| {
            let (name, ty) = field
                .split_once(':')
                .ok_or_else(|| anyhow!("Header field '{}' must be written as name:type", field))?;
            let data_type = DataType::from_str(ty).map_err(|e| anyhow!(e))?;
            Ok(Column::new(name.trim().to_string(), data_type))
        })
        .collect::<Result<Vec<_>>>()?;
    let schema: SchemaRef = Arc::new(Schema::new(columns).qualified(alias));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| record_error(path, e))?;
        let row = record
            .iter()
            .zip(schema.columns())
            .map(|(cell, column)| parse_value(cell, column.data_type()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("{}: {}", path.display(), describe_position(record.position())))?;
        rows.push(row);
    }

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(TupleScan::from_rows(schema, rows)?)
}

// Data rows are numbered from 1; the header is record 0
fn describe_position(pos: Option<&Position>) -> String {
    match pos {
        Some(pos) => format!("row {} (line {})", pos.record(), pos.line()),
        None => "row ?".to_string(),
    }
}

fn record_error(path: &Path, err: csv::Error) -> anyhow::Error {
    if let csv::ErrorKind::UnequalLengths { pos, expected_len, len } = err.kind() {
        return anyhow!(
            "{}: {} has {} cells, header has {}",
            path.display(),
            describe_position(pos.as_ref()),
            len,
            expected_len
        );
    }
    anyhow::Error::new(err).context(format!("Failed to read {}", path.display()))
}

/// Resolve a field given as a position or a (possibly unqualified) name
fn resolve_field(schema: &Schema, field: &str) -> Result<usize> {
    match field.parse::<usize>() {
        Ok(position) => {
            schema.field_name(position)?;
            Ok(position)
        }
        Err(_) => Ok(schema.index_of(field)?),
    }
}

fn alias_for(path: &Path, alias: Option<String>) -> String {
    alias.unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "t".to_string())
    })
}

fn run(cli: Cli) -> Result<QueryResultSet> {
    let left_scan = load_csv(&cli.left, &alias_for(&cli.left, cli.left_alias.clone()))?;
    let right_scan = load_csv(&cli.right, &alias_for(&cli.right, cli.right_alias.clone()))?;

    let left_field = resolve_field(&left_scan.schema(), &cli.left_field)?;
    let right_field = resolve_field(&right_scan.schema(), &cli.right_field)?;
    let op = CompareOp::from_str(&cli.op)?;
    let strategy = JoinStrategy::from_str(&cli.strategy)?;
    let predicate = JoinPredicate::new(left_field, op, right_field);

    let left = operator_ref(left_scan);
    let right = operator_ref(right_scan);
    let config = HashJoinConfig { initial_capacity: cli.hash_capacity };
    let mut join = JoinOperator::with_config(strategy, predicate, left, right, config)?;

    let (left_name, right_name) = join.join_field_names()?;
    info!("Running {} join on {} {} {}", strategy, left_name, op, right_name);

    join.open()?;
    let mut result_set = QueryResultSet::new(join.schema());
    for tuple in collect_all(&mut join)? {
        result_set.add_tuple(tuple);
    }
    join.close()?;

    Ok(result_set)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();

    let result_set = run(cli)?;
    print!("{}", result_set.to_string_table());
    println!("({} rows)", result_set.row_count());
    Ok(())
}
