//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fieldpulse_common::{load_dataset, PulseConfig, SqliteVisitStore};
use fieldpulse_shared::{Clock, FixedClock, NodeRollup, PerformanceEngine, SystemClock};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::output;

/// Per-invocation settings shared by every subcommand.
pub struct Session {
    pub config: PulseConfig,
    pub today: Option<NaiveDate>,
    pub db: Option<PathBuf>,
    pub json: bool,
}

impl Session {
    pub fn new(cli: &Cli, config: PulseConfig) -> Self {
        Self {
            config,
            today: cli.today,
            db: cli.db.clone(),
            json: cli.json,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .unwrap_or_else(|| self.config.storage.db_path.clone())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        match self.today {
            Some(date) => Arc::new(FixedClock(date)),
            None => Arc::new(SystemClock),
        }
    }

    /// Load the dataset, open the visit database and build the engine.
    pub fn engine(&self, data: &Path) -> Result<PerformanceEngine> {
        let dataset = load_dataset(data)?;
        let db_path = self.db_path();
        let store = SqliteVisitStore::open_at(&db_path)?;
        let policy = self.config.policy().context("Invalid metrics policy")?;
        debug!(db = %db_path.display(), ?policy, "building engine");

        PerformanceEngine::new(dataset, Arc::new(store), self.clock(), policy)
            .with_context(|| format!("Failed to load {}", data.display()))
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(value).context("Failed to serialize output")?
            );
        } else {
            print!("{}", text());
        }
        Ok(())
    }
}

pub fn run(cli: &Cli, session: &Session) -> Result<()> {
    match &cli.command {
        Commands::Report { data, node } => report(session, data, *node),
        Commands::Assignment { data, id } => assignment(session, data, *id),
        Commands::Sales { data, id } => sales(session, data, *id),
        Commands::Attention { data, node } => attention(session, data, *node),
        Commands::Record {
            data,
            assignment,
            delegate,
            date,
        } => record(session, data, *assignment, *delegate, *date),
        Commands::Config => config(session),
    }
}

pub fn report(session: &Session, data: &Path, node: Option<u64>) -> Result<()> {
    let engine = session.engine(data)?;
    let nodes = match node {
        Some(id) => vec![id],
        None => engine.hierarchy().roots(),
    };

    let mut rollups = Vec::with_capacity(nodes.len());
    for id in nodes {
        rollups.push(engine.node_rollup(id).with_context(|| format!("Failed to roll up node {}", id))?);
    }

    if session.json {
        // A single requested node prints as an object; the roots listing as an array.
        if node.is_some() {
            return session.emit(&*rollups[0], String::new);
        }
        let all: Vec<&NodeRollup> = rollups.iter().map(|r| &**r).collect();
        return session.emit(&all, String::new);
    }

    let text: Vec<String> = rollups
        .iter()
        .map(|r| output::render_rollup(r, engine.dataset()))
        .collect();
    print!("{}", text.join(&format!("\n{}\n\n", output::THIN_SEPARATOR)));
    Ok(())
}

pub fn assignment(session: &Session, data: &Path, id: u64) -> Result<()> {
    let engine = session.engine(data)?;
    let assignment = engine.dataset().visit_assignment(id)?;
    let activity = engine.assignment_activity(id)?;
    session.emit(
        &json!({ "assignment": assignment, "activity": &*activity }),
        || output::render_assignment(assignment, &activity, engine.dataset()),
    )
}

pub fn sales(session: &Session, data: &Path, id: u64) -> Result<()> {
    let engine = session.engine(data)?;
    let assignment = engine.dataset().sales_assignment(id)?;
    let rhythm = engine.sales_rhythm(id)?;
    let product = engine
        .dataset()
        .products
        .iter()
        .find(|p| p.id == assignment.product_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("product {}", assignment.product_id));

    let ramp: Vec<_> = rhythm
        .ramp_schedule()
        .into_iter()
        .map(|(month, amount)| json!({ "month": month, "amount": amount }))
        .collect();
    session.emit(
        &json!({
            "assignment_id": id,
            "product_id": assignment.product_id,
            "year": assignment.year,
            "rhythm": &rhythm,
            "ramp": ramp,
        }),
        || output::render_sales(id, &product, &rhythm),
    )
}

pub fn attention(session: &Session, data: &Path, node: u64) -> Result<()> {
    let engine = session.engine(data)?;
    let name = engine.hierarchy().node(node)?.name.clone();
    let items = engine.needs_attention(node)?;
    session.emit(&items, || output::render_attention(&name, &items))
}

pub fn record(
    session: &Session,
    data: &Path,
    assignment: u64,
    delegate: u64,
    date: Option<NaiveDate>,
) -> Result<()> {
    let engine = session.engine(data)?;
    let event = engine.record_visit(assignment, delegate, date)?;
    let activity = engine.assignment_activity(assignment)?;
    session.emit(
        &json!({ "event": &event, "activity": &*activity }),
        || output::render_recorded(&event, &activity),
    )
}

pub fn config(session: &Session) -> Result<()> {
    print!("{}", session.config.to_toml()?);
    Ok(())
}
