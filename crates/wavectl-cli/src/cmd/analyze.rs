use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use wavectl_core::config::SchedulerConfig;
use wavectl_core::scheduler::analyze_for_parallelization;
use wavectl_core::task::TaskSet;

pub fn analyze(root: &Path, source: &Path, json: bool) -> anyhow::Result<()> {
    let (set, config) = load(root, source)?;
    let analysis = analyze_for_parallelization(&set, &config)?;

    if json {
        print_json(&analysis)?;
        return Ok(());
    }

    println!(
        "{} wave(s), max {} concurrent worker(s), estimated speedup {:.2}x",
        analysis.waves.len(),
        analysis.max_concurrent_workers,
        analysis.estimated_speedup
    );
    println!();
    for wave in &analysis.waves {
        println!("Wave {}: {}", wave.wave_id, wave.tasks.join(", "));
        println!("  {}", wave.rationale);
        println!("  estimated {:.0} min", wave.estimated_minutes);
    }
    if !analysis.stuck.is_empty() {
        println!();
        println!(
            "Unschedulable (dependency cycle): {}",
            analysis.stuck.join(", ")
        );
    }
    Ok(())
}

pub fn waves(root: &Path, source: &Path, json: bool) -> anyhow::Result<()> {
    let (set, config) = load(root, source)?;
    let analysis = analyze_for_parallelization(&set, &config)?;

    if json {
        let compact: Vec<serde_json::Value> = analysis
            .waves
            .iter()
            .map(|w| {
                serde_json::json!({
                    "wave_id": w.wave_id,
                    "tasks": w.tasks,
                    "can_parallel": w.can_parallel,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "waves": compact,
            "stuck": analysis.stuck,
        }))?;
        return Ok(());
    }

    if analysis.waves.is_empty() {
        println!("No schedulable tasks.");
    } else {
        let rows: Vec<Vec<String>> = analysis
            .waves
            .iter()
            .map(|w| {
                vec![
                    w.wave_id.to_string(),
                    w.tasks.join(", "),
                    if w.can_parallel { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        print_table(&["WAVE", "TASKS", "PARALLEL"], rows);
    }
    if !analysis.stuck.is_empty() {
        println!();
        println!(
            "Unschedulable (dependency cycle): {}",
            analysis.stuck.join(", ")
        );
    }
    Ok(())
}

fn load(root: &Path, source: &Path) -> anyhow::Result<(TaskSet, SchedulerConfig)> {
    let config = SchedulerConfig::load(root).context("failed to load scheduler config")?;
    let set = TaskSet::load(source)
        .with_context(|| format!("failed to load task set from {}", source.display()))?;
    Ok((set, config))
}
