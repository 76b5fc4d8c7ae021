use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;

use rowjoin::{
    DataValue, HasherKind, Join, JoinAlgorithm, JoinConfig, JoinKey, LeftJoinStrategy, Row,
    RowBuilder, RowList, Var,
};

#[derive(Parser)]
#[command(author, version, about = "rowjoin - join JSON row files")]
struct Cli {
    /// JSON file with a join configuration; flags override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join two row files
    Join {
        /// Left input (JSON array of objects; null means unbound)
        left: PathBuf,

        /// Right input
        right: PathBuf,

        /// Keep left rows with no match
        #[arg(long)]
        left_join: bool,

        /// Explicit join key, comma separated; empty for a cross product
        #[arg(long, value_delimiter = ',')]
        key: Option<Vec<String>>,

        /// hash or nested-loop
        #[arg(long)]
        algorithm: Option<JoinAlgorithm>,

        /// materialize-right or materialize-left
        #[arg(long)]
        strategy: Option<LeftJoinStrategy>,

        /// leading or composite
        #[arg(long)]
        hasher: Option<HasherKind>,

        /// Log join statistics on completion
        #[arg(long)]
        explain: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show the variables of a row file
    Vars {
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let base_config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            JoinConfig::from_json(&text)?
        }
        None => JoinConfig::default(),
    };

    match cli.command {
        Commands::Join { left, right, left_join, key, algorithm, strategy, hasher, explain, format } => {
            let mut config = base_config;
            if let Some(algorithm) = algorithm {
                config.algorithm = algorithm;
            }
            if let Some(strategy) = strategy {
                config.left_join_strategy = strategy;
            }
            if let Some(hasher) = hasher {
                config.hasher = hasher;
            }
            config.explain |= explain;
            debug!("Join config: {:?}", config);

            let left = load_rows(&left)?;
            let right = load_rows(&right)?;
            let key = key.map(|vars| JoinKey::new(vars.into_iter().filter(|v| !v.is_empty())));

            let join = Join::new(config);
            let output = match (left_join, key) {
                (false, None) => join.inner_join(left, right)?,
                (false, Some(key)) => join.inner_join_with_key(left, right, key)?,
                (true, None) => join.left_join(left, right, None)?,
                (true, Some(key)) => join.left_join_with_key(left, right, key, None)?,
            };
            let vars = output.vars().to_vec();
            let rows = output.materialize()?;

            match format {
                OutputFormat::Table => print!("{}", to_string_table(&vars, &rows)),
                OutputFormat::Json => println!("{}", to_json(&rows)?),
            }
        }
        Commands::Vars { file } => {
            let rows = load_rows(&file)?;
            let names: Vec<&str> = rows.vars().iter().map(|v| v.name()).collect();
            println!("{}", names.join(" "));
        }
    }

    Ok(())
}

/// Read a JSON array of objects into a row list
fn load_rows(path: &Path) -> Result<RowList<DataValue>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows from {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    let serde_json::Value::Array(items) = json else {
        bail!("{}: expected a JSON array of objects", path.display());
    };

    let mut vars: Vec<Var> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = item else {
            bail!("{}: row {} is not an object", path.display(), i);
        };
        let mut builder = RowBuilder::new();
        for (name, value) in fields {
            let var = Var::from(name);
            if !vars.contains(&var) {
                vars.push(var.clone());
            }
            if value.is_null() {
                continue;
            }
            let value: DataValue = serde_json::from_value(value)
                .map_err(|e| anyhow!("{}: row {} variable {}: {}", path.display(), i, var, e))?;
            builder.add(var, value)?;
        }
        rows.push(builder.build());
    }
    Ok(RowList::with_vars(vars, rows))
}

fn to_json(rows: &[Row<DataValue>]) -> Result<String> {
    let objects: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for (var, value) in row.iter() {
                object.insert(var.name().to_string(), serde_json::to_value(value)?);
            }
            Ok(serde_json::Value::Object(object))
        })
        .collect::<Result<_, serde_json::Error>>()?;
    Ok(serde_json::to_string_pretty(&objects)?)
}

/// Format rows as a string table; unbound cells are left blank
fn to_string_table(vars: &[Var], rows: &[Row<DataValue>]) -> String {
    if vars.is_empty() {
        return "Empty result\n".to_string();
    }

    let mut result = String::new();
    result.push_str("| ");
    for var in vars {
        result.push_str(&format!("{} | ", var));
    }
    result.push('\n');

    result.push('|');
    for var in vars {
        result.push_str(&format!("{}|", "-".repeat(var.to_string().len() + 2)));
    }
    result.push('\n');

    for row in rows {
        result.push_str("| ");
        for var in vars {
            match row.get(var) {
                Some(value) => result.push_str(&format!("{} | ", value)),
                None => result.push_str("  | "),
            }
        }
        result.push('\n');
    }
    result.push_str(&format!("{} rows\n", rows.len()));
    result
}
