//! plan-runner: headless runner for the watershed planning engine.
//!
//! Usage:
//!   plan-runner --input demos/sample_input.json --data-dir ./data --db plan.db
//!   plan-runner --input in.json --feed-url https://example.org/assessments --json report.json
//!
//! The runner is the engine's caller: it fetches feeds (falling back to the
//! last cached snapshot), runs the pipeline, prints a summary, and persists
//! the run.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::env;
use watershed_core::{
    config::EngineConfig,
    engine::{PlanningEngine, PlanningInput, PlanningReport},
    feed::{AssessmentFeed, AssessmentFeedClient, FeedStatus},
    store::{new_run_id, PlanStore},
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input_path = arg_str(&args, "--input").unwrap_or("./demos/sample_input.json");
    let data_dir = arg_str(&args, "--data-dir").unwrap_or("./data");
    let db = arg_str(&args, "--db").unwrap_or(":memory:");
    let json_out = arg_str(&args, "--json");

    let config = EngineConfig::load(data_dir)?;
    let feed_url = arg_str(&args, "--feed-url")
        .map(str::to_string)
        .or_else(|| config.feed.url.clone());

    println!("Watershed plan-runner");
    println!("  input:     {input_path}");
    println!("  data_dir:  {data_dir}");
    println!("  db:        {db}");
    println!("  feed:      {}", feed_url.as_deref().unwrap_or("(from input)"));
    println!();

    let raw = std::fs::read_to_string(input_path)
        .with_context(|| format!("Cannot read {input_path}"))?;
    let mut input: PlanningInput =
        serde_json::from_str(&raw).with_context(|| format!("Cannot parse {input_path}"))?;

    let mut store = PlanStore::open(db)?;
    store.migrate()?;

    if let Some(url) = feed_url.as_deref() {
        input.feeds = fetch_feeds(url, &input, &config, &store)?;
    }
    input.feeds = input
        .feeds
        .into_iter()
        .map(|feed| fall_back_to_cache(feed, &store))
        .collect::<Result<Vec<_>>>()?;

    let started_at = chrono::Utc::now();
    let engine = PlanningEngine::new(config);
    let report = engine.run(&input);

    print_summary(&report);

    let run_id = new_run_id();
    store.save_plan_run(&run_id, started_at, &report)?;
    println!();
    println!("  run_id:    {run_id}");

    if let Some(path) = json_out {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Cannot write {path}"))?;
        println!("  report:    {path}");
    }
    Ok(())
}

/// One fetch per state named by the registry or the jurisdictions.
fn fetch_feeds(
    url: &str,
    input: &PlanningInput,
    config: &EngineConfig,
    store: &PlanStore,
) -> Result<Vec<AssessmentFeed>> {
    let states: BTreeSet<String> = input
        .waterbodies
        .iter()
        .map(|wb| wb.state.to_uppercase())
        .chain(input.jurisdictions.iter().map(|j| j.state_prefix.to_uppercase()))
        .collect();

    let client = AssessmentFeedClient::new(url, &config.feed)?;
    let mut feeds = Vec::new();
    for state in states {
        let feed = client.fetch(&state);
        if store.save_feed_snapshot(&feed, chrono::Utc::now())? {
            log::debug!("runner: snapshot saved for {state}");
        }
        feeds.push(feed);
    }
    Ok(feeds)
}

/// Swap an unavailable feed for the last good snapshot, when there is one.
fn fall_back_to_cache(feed: AssessmentFeed, store: &PlanStore) -> Result<AssessmentFeed> {
    if feed.status.is_available() {
        return Ok(feed);
    }
    match store.load_feed_snapshot(&feed.state)? {
        Some(cached) => {
            log::warn!(
                "runner: feed for {} unavailable, using cached snapshot ({} records)",
                feed.state,
                cached.records.len()
            );
            Ok(cached)
        }
        None => Ok(feed),
    }
}

fn print_summary(report: &PlanningReport) {
    println!("=== Planning Summary ({}) ===", report.as_of);
    for f in &report.feeds {
        let status = match &f.status {
            FeedStatus::Live => "live".to_string(),
            FeedStatus::Cached { fetched_at } => format!("cached {}", fetched_at.format("%Y-%m-%d")),
            FeedStatus::Unavailable { reason, attempts } => {
                format!("UNAVAILABLE after {attempts} attempt(s): {reason}")
            }
        };
        println!("  feed {:<4} {:>5} records  {status}", f.state, f.records);
    }
    println!("  registry changes: {}", report.changes.len());
    println!();

    for j in &report.jurisdictions {
        println!("  {} ({}, {})", j.name, j.jurisdiction_id, j.tier.as_str());
        println!("    waterbodies:        {}", j.waterbodies.len());
        match j.priority() {
            Some(p) => {
                println!(
                    "    priority:           {} at {:.1} ({})",
                    p.name,
                    p.assessment.score,
                    p.assessment.label.as_str()
                );
                println!(
                    "    deployment:         {} quads / {} units / {:.0} GPM in {} phase(s)",
                    p.plan.total_quads,
                    p.plan.total_units,
                    p.plan.capacity_gpm,
                    p.plan.phases.len()
                );
                for phase in &p.plan.phases {
                    println!(
                        "      {}. {:<28} {:>2} units  {}",
                        phase.number,
                        phase.mission.text(),
                        phase.units,
                        phase.trigger
                    );
                }
            }
            None => println!("    priority:           (none)"),
        }
        println!("    status quo:         ${:>12.0}", j.cost.status_quo.total);
        println!("    continuous:         ${:>12.0}", j.cost.engine.total);
        println!("    annual savings:     ${:>12.0}", j.cost.savings);
        println!(
            "    grant offset:       ${:.0} – ${:.0}",
            j.cost.grant_offset_low, j.cost.grant_offset_high
        );
        println!("    credit value:       ${:>12.0}", j.cost.credit_value_total);
        println!();
    }

    if !report.unassigned.is_empty() {
        println!("  state-wide (unassigned): {}", report.unassigned.len());
        for w in &report.unassigned {
            println!(
                "    {:<32} {:>5.1} {}",
                w.name,
                w.assessment.score,
                w.assessment.label.as_str()
            );
        }
    }
}

fn arg_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
