use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::task::{Task, TaskSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Wave
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    /// 1-based, sequential.
    pub wave_id: usize,
    pub tasks: Vec<String>,
    pub can_parallel: bool,
    pub isolation_score: f64,
    pub rationale: String,
    pub estimated_minutes: f64,
}

// ---------------------------------------------------------------------------
// WavePlan
// ---------------------------------------------------------------------------

/// Ordered waves plus any tasks the loop could not place. A non-empty
/// `stuck` list means a dependency cycle (or mutual block) halted the
/// loop; the waves emitted before the halt are still valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavePlan {
    pub waves: Vec<Wave>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stuck: Vec<String>,
}

// ---------------------------------------------------------------------------
// ParallelAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelAnalysis {
    pub waves: Vec<Wave>,
    pub dependency_graph: BTreeMap<String, BTreeSet<String>>,
    pub max_concurrent_workers: usize,
    pub estimated_speedup: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stuck: Vec<String>,
}

// ---------------------------------------------------------------------------
// build_dependency_graph()
// ---------------------------------------------------------------------------

/// Project each parent task's `blocked_by` into a plain adjacency map.
/// Subtasks are not schedulable units and are excluded entirely.
pub fn build_dependency_graph(tasks: &[Task]) -> BTreeMap<String, BTreeSet<String>> {
    tasks
        .iter()
        .filter(|t| t.kind == crate::types::TaskKind::Parent)
        .map(|t| {
            let deps: BTreeSet<String> = t.blocked_by().iter().cloned().collect();
            (t.id.clone(), deps)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// identify_parallel_waves()
// ---------------------------------------------------------------------------

/// Group schedulable tasks into dependency-ordered waves.
///
/// Each round emits every remaining task whose dependencies are all either
/// already emitted or unknown to this task set (unknown ids are treated as
/// satisfied — partial graphs are not an error here). An empty ready set
/// with tasks still remaining is a cycle: the loop halts and reports the
/// remaining ids as stuck instead of spinning or dropping them silently.
pub fn identify_parallel_waves(tasks: &[Task], config: &SchedulerConfig) -> WavePlan {
    let eligible: HashMap<&str, &Task> = tasks
        .iter()
        .filter(|t| t.is_schedulable())
        .map(|t| (t.id.as_str(), t))
        .collect();

    let mut completed: BTreeSet<&str> = BTreeSet::new();
    let mut remaining: BTreeSet<&str> = eligible.keys().copied().collect();
    let mut waves: Vec<Wave> = Vec::new();

    while !remaining.is_empty() {
        // BTreeSet iteration keeps wave membership deterministic.
        let ready: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|id| {
                eligible[id]
                    .blocked_by()
                    .iter()
                    .all(|dep| completed.contains(dep.as_str()) || !remaining.contains(dep.as_str()))
            })
            .collect();

        if ready.is_empty() {
            return WavePlan {
                waves,
                stuck: remaining.iter().map(|s| s.to_string()).collect(),
            };
        }

        let members: Vec<&Task> = ready.iter().map(|id| eligible[id]).collect();
        let isolation = calculate_wave_isolation(&members, config);
        let can_parallel = ready.len() > 1 && isolation >= config.parallel_threshold;
        let wave_id = waves.len() + 1;

        waves.push(Wave {
            wave_id,
            tasks: ready.iter().map(|s| s.to_string()).collect(),
            can_parallel,
            isolation_score: isolation,
            rationale: wave_rationale(wave_id, ready.len(), can_parallel, isolation),
            estimated_minutes: estimate_wave_minutes(ready.len(), can_parallel, config),
        });

        for id in ready {
            remaining.remove(id);
            completed.insert(id);
        }
    }

    WavePlan {
        waves,
        stuck: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// calculate_wave_isolation()
// ---------------------------------------------------------------------------

/// Aggregate isolation for a candidate wave.
///
/// A single task has nothing to conflict with and scores 1.0. Multi-task
/// waves average the declared per-task scores, then lose
/// `overlap_penalty` for every file path claimed by more than one member.
pub fn calculate_wave_isolation(members: &[&Task], config: &SchedulerConfig) -> f64 {
    if members.len() <= 1 {
        return 1.0;
    }

    let mean: f64 =
        members.iter().map(|t| t.isolation_score()).sum::<f64>() / members.len() as f64;

    let mut claims: BTreeMap<&str, usize> = BTreeMap::new();
    for task in members {
        for file in task.shared_files() {
            *claims.entry(file.as_str()).or_insert(0) += 1;
        }
    }
    let contested = claims.values().filter(|&&n| n > 1).count();

    (mean - contested as f64 * config.overlap_penalty).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// estimate_wave_minutes()
// ---------------------------------------------------------------------------

/// Planning heuristic only. Sequential waves cost the full per-task
/// baseline; parallel waves cost baseline * sqrt(n), which stays strictly
/// below the sequential sum for n > 1.
pub fn estimate_wave_minutes(task_count: usize, can_parallel: bool, config: &SchedulerConfig) -> f64 {
    let n = task_count as f64;
    if can_parallel {
        config.task_minutes * n.sqrt()
    } else {
        config.task_minutes * n
    }
}

// ---------------------------------------------------------------------------
// has_dependency_on_group()
// ---------------------------------------------------------------------------

/// True iff any task in `group_a` has a dependency edge into `group_b`.
/// Lets callers check that a partitioning proposal respects ordering.
pub fn has_dependency_on_group(
    group_a: &[String],
    group_b: &[String],
    graph: &BTreeMap<String, BTreeSet<String>>,
) -> bool {
    group_a.iter().any(|id| {
        graph
            .get(id)
            .is_some_and(|deps| group_b.iter().any(|other| deps.contains(other)))
    })
}

// ---------------------------------------------------------------------------
// analyze_for_parallelization()
// ---------------------------------------------------------------------------

/// Top-level entry point: graph, waves, worker ceiling, and speedup ratio
/// for a task set.
pub fn analyze_for_parallelization(
    set: &TaskSet,
    config: &SchedulerConfig,
) -> Result<ParallelAnalysis> {
    if config.strict_deps {
        set.validate_deps()?;
    }

    let dependency_graph = build_dependency_graph(&set.tasks);
    let plan = identify_parallel_waves(&set.tasks, config);

    let max_concurrent_workers = plan
        .waves
        .iter()
        .filter(|w| w.can_parallel)
        .map(|w| w.tasks.len())
        .max()
        .unwrap_or(1);

    let scheduled: usize = plan.waves.iter().map(|w| w.tasks.len()).sum();
    let sequential = config.task_minutes * scheduled as f64;
    let planned: f64 = plan.waves.iter().map(|w| w.estimated_minutes).sum();
    let estimated_speedup = if planned > 0.0 { sequential / planned } else { 1.0 };

    Ok(ParallelAnalysis {
        waves: plan.waves,
        dependency_graph,
        max_concurrent_workers,
        estimated_speedup,
        stuck: plan.stuck,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn wave_rationale(wave_id: usize, count: usize, can_parallel: bool, isolation: f64) -> String {
    let safety = if can_parallel {
        format!("parallel-safe (isolation {isolation:.2})")
    } else if count > 1 {
        format!("sequential (isolation {isolation:.2} below threshold)")
    } else {
        "single task".to_string()
    };
    if wave_id == 1 {
        format!("Foundation wave: {count} task(s) with no unresolved dependencies, {safety}")
    } else {
        format!("Wave {wave_id}: {count} task(s) unblocked by earlier waves, {safety}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DependencyInfo;
    use crate::types::{TaskKind, TaskStatus};

    fn task(id: &str, blocked_by: &[&str]) -> Task {
        let mut t = Task::new(id);
        if !blocked_by.is_empty() {
            t.dependency_info = Some(DependencyInfo {
                blocked_by: blocked_by.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            });
        }
        t
    }

    fn task_with_files(id: &str, isolation: f64, files: &[&str]) -> Task {
        let mut t = Task::new(id);
        t.dependency_info = Some(DependencyInfo {
            isolation_score: isolation,
            shared_files: files.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        t
    }

    fn set(tasks: Vec<Task>) -> TaskSet {
        TaskSet {
            tasks,
            execution_strategy: None,
        }
    }

    #[test]
    fn independent_tasks_share_one_parallel_wave() {
        let tasks = vec![task("1", &[]), task("2", &[])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert!(plan.stuck.is_empty());
        assert_eq!(plan.waves.len(), 1);
        assert_eq!(plan.waves[0].wave_id, 1);
        assert_eq!(plan.waves[0].tasks, vec!["1", "2"]);
        assert!(plan.waves[0].can_parallel);
        assert_eq!(plan.waves[0].isolation_score, 1.0);
    }

    #[test]
    fn linear_chain_yields_one_wave_per_task() {
        let tasks = vec![task("1", &[]), task("2", &["1"]), task("3", &["2"])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert_eq!(plan.waves.len(), 3);
        assert_eq!(plan.waves[0].tasks, vec!["1"]);
        assert_eq!(plan.waves[1].tasks, vec!["2"]);
        assert_eq!(plan.waves[2].tasks, vec!["3"]);
        for wave in &plan.waves {
            assert!(!wave.can_parallel);
        }
    }

    #[test]
    fn join_task_waits_for_both_dependencies() {
        let tasks = vec![task("1", &[]), task("2", &[]), task("3", &["1", "2"])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert_eq!(plan.waves.len(), 2);
        assert_eq!(plan.waves[0].tasks, vec!["1", "2"]);
        assert_eq!(plan.waves[1].tasks, vec!["3"]);
    }

    #[test]
    fn passed_tasks_are_excluded() {
        let mut done = task("1", &[]);
        done.status = TaskStatus::Pass;
        let tasks = vec![done, task("2", &["1"])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        // Task 1 is complete before scheduling; task 2's dependency on it
        // is satisfied because 1 never enters the remaining set.
        assert_eq!(plan.waves.len(), 1);
        assert_eq!(plan.waves[0].tasks, vec!["2"]);
    }

    #[test]
    fn subtasks_are_excluded() {
        let mut sub = task("sub", &[]);
        sub.kind = TaskKind::Subtask;
        let tasks = vec![task("1", &[]), sub];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert_eq!(plan.waves.len(), 1);
        assert_eq!(plan.waves[0].tasks, vec!["1"]);
    }

    #[test]
    fn unknown_dependency_is_treated_as_satisfied() {
        let tasks = vec![task("1", &["not-in-set"])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert!(plan.stuck.is_empty());
        assert_eq!(plan.waves.len(), 1);
        assert_eq!(plan.waves[0].tasks, vec!["1"]);
    }

    #[test]
    fn cycle_halts_with_stuck_tasks() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"]), task("c", &[])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        // The acyclic portion still schedules.
        assert_eq!(plan.waves.len(), 1);
        assert_eq!(plan.waves[0].tasks, vec!["c"]);
        assert_eq!(plan.stuck, vec!["a", "b"]);
    }

    #[test]
    fn waves_partition_eligible_tasks_exactly_once() {
        let tasks = vec![
            task("1", &[]),
            task("2", &[]),
            task("3", &["1"]),
            task("4", &["1", "2"]),
            task("5", &["3", "4"]),
        ];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        let mut seen: Vec<&str> = plan
            .waves
            .iter()
            .flat_map(|w| w.tasks.iter().map(|s| s.as_str()))
            .collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total, "no task may appear in two waves");
        assert_eq!(seen, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn dependencies_land_in_strictly_earlier_waves() {
        let tasks = vec![
            task("1", &[]),
            task("2", &["1"]),
            task("3", &["1"]),
            task("4", &["2", "3"]),
        ];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        let wave_of = |id: &str| {
            plan.waves
                .iter()
                .position(|w| w.tasks.iter().any(|t| t == id))
                .unwrap()
        };
        for t in &tasks {
            for dep in t.blocked_by() {
                assert!(wave_of(dep) < wave_of(&t.id), "{dep} must precede {}", t.id);
            }
        }
    }

    #[test]
    fn disjoint_files_clear_threshold() {
        let tasks = vec![
            task_with_files("1", 1.0, &["src/a.ts"]),
            task_with_files("2", 1.0, &["src/b.ts"]),
        ];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert!(plan.waves[0].can_parallel);
        assert_eq!(plan.waves[0].isolation_score, 1.0);
    }

    #[test]
    fn shared_file_and_low_isolation_block_parallelism() {
        let tasks = vec![
            task_with_files("1", 0.5, &["src/shared.ts"]),
            task_with_files("2", 0.5, &["src/shared.ts"]),
        ];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());

        assert!(!plan.waves[0].can_parallel);
        // mean 0.5 minus one contested-path penalty
        assert!((plan.waves[0].isolation_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn isolation_clamps_to_zero() {
        let config = SchedulerConfig::default();
        let a = task_with_files("1", 0.05, &["x", "y"]);
        let b = task_with_files("2", 0.05, &["x", "y"]);
        let score = calculate_wave_isolation(&[&a, &b], &config);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn single_task_wave_is_fully_isolated() {
        let config = SchedulerConfig::default();
        let a = task_with_files("1", 0.2, &["x"]);
        assert_eq!(calculate_wave_isolation(&[&a], &config), 1.0);
    }

    #[test]
    fn parallel_estimate_is_sublinear() {
        let config = SchedulerConfig::default();
        for n in 2..10 {
            let parallel = estimate_wave_minutes(n, true, &config);
            let sequential = estimate_wave_minutes(n, false, &config);
            assert!(parallel < sequential, "n={n}");
        }
        assert_eq!(estimate_wave_minutes(1, false, &config), 15.0);
    }

    #[test]
    fn rationale_phrasing() {
        let tasks = vec![task("1", &[]), task("2", &["1"])];
        let plan = identify_parallel_waves(&tasks, &SchedulerConfig::default());
        assert!(plan.waves[0].rationale.contains("Foundation wave"));
        assert!(plan.waves[1].rationale.contains("Wave 2"));
    }

    #[test]
    fn dependency_graph_projection() {
        let mut sub = task("sub", &["1"]);
        sub.kind = TaskKind::Subtask;
        let tasks = vec![task("1", &[]), task("2", &["1"]), sub];
        let graph = build_dependency_graph(&tasks);

        assert_eq!(graph.len(), 2);
        assert!(graph["1"].is_empty());
        assert!(graph["2"].contains("1"));
        assert!(!graph.contains_key("sub"));
    }

    #[test]
    fn group_dependency_check() {
        let tasks = vec![task("1", &[]), task("2", &["1"]), task("3", &[])];
        let graph = build_dependency_graph(&tasks);

        assert!(has_dependency_on_group(
            &["2".to_string()],
            &["1".to_string()],
            &graph
        ));
        assert!(!has_dependency_on_group(
            &["1".to_string(), "3".to_string()],
            &["2".to_string()],
            &graph
        ));
    }

    #[test]
    fn analysis_workers_and_speedup() {
        let tasks = vec![task("1", &[]), task("2", &[]), task("3", &["1", "2"])];
        let analysis =
            analyze_for_parallelization(&set(tasks), &SchedulerConfig::default()).unwrap();

        assert_eq!(analysis.max_concurrent_workers, 2);
        // 3 tasks sequential = 45 min; planned = 15*sqrt(2) + 15 ≈ 36.2
        assert!(analysis.estimated_speedup > 1.0);
        assert_eq!(analysis.dependency_graph.len(), 3);
        assert!(analysis.stuck.is_empty());
    }

    #[test]
    fn analysis_without_parallel_waves_reports_one_worker() {
        let tasks = vec![task("1", &[]), task("2", &["1"])];
        let analysis =
            analyze_for_parallelization(&set(tasks), &SchedulerConfig::default()).unwrap();

        assert_eq!(analysis.max_concurrent_workers, 1);
        assert!((analysis.estimated_speedup - 1.0).abs() < 1e-9);
    }

    #[test]
    fn analysis_strict_mode_rejects_unknown_deps() {
        let tasks = vec![task("1", &["ghost"])];
        let config = SchedulerConfig {
            strict_deps: true,
            ..Default::default()
        };
        assert!(analyze_for_parallelization(&set(tasks), &config).is_err());
    }

    #[test]
    fn empty_task_set_yields_no_waves() {
        let analysis =
            analyze_for_parallelization(&set(Vec::new()), &SchedulerConfig::default()).unwrap();
        assert!(analysis.waves.is_empty());
        assert_eq!(analysis.max_concurrent_workers, 1);
        assert_eq!(analysis.estimated_speedup, 1.0);
    }
}
