//! Workflow Compiler
//!
//! Turns a validated plan into an ordered, dependency-annotated task list.
//!
//! Tasks come from the plan's `tasks` list. When that is absent they are
//! derived from `executionOrder`, typing each step by best-effort inference,
//! and failing that from the planned packages and files. Every task gets a
//! stage; tasks without declared dependencies depend on their predecessor in
//! stage order. The result is topologically sorted with stage, then original
//! position, as the tie-break. A dependency cycle is a compile error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::plan::{GeneratedPlan, Task, TaskStatus, TaskType};
use crate::models::workflow::WorkflowContext;
use crate::services::inference::BestEffortInference;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::normalize_path;

/// Compiles plans into workflows
pub struct WorkflowCompiler {
    inference: Arc<dyn BestEffortInference>,
}

impl WorkflowCompiler {
    pub fn new(inference: Arc<dyn BestEffortInference>) -> Self {
        Self { inference }
    }

    /// Compile a plan into a fresh workflow context
    pub fn compile(&self, plan: &GeneratedPlan, raw_response: &str) -> AppResult<WorkflowContext> {
        let tasks = self.compile_tasks(plan)?;
        Ok(WorkflowContext::new(plan.clone(), raw_response, tasks))
    }

    /// Compile a plan into tasks in execution order
    pub fn compile_tasks(&self, plan: &GeneratedPlan) -> AppResult<Vec<Task>> {
        let mut tasks = self.source_tasks(plan);
        if tasks.is_empty() {
            return Err(AppError::compile(
                "Plan has no tasks, execution order, packages or files to act on",
            ));
        }

        dedupe_ids(&mut tasks);
        for task in &mut tasks {
            task.stage = Some(task.stage.unwrap_or_else(|| task.task_type.default_stage()));
            task.status = TaskStatus::Pending;
            task.result = None;
        }

        // Stable: equal stages keep plan order
        tasks.sort_by_key(|t| t.stage);
        assign_dependencies(&mut tasks);

        let ordered = topological_order(tasks)?;
        debug!(
            tasks = ordered.len(),
            order = ?ordered.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "Compiled workflow"
        );
        Ok(ordered)
    }

    fn source_tasks(&self, plan: &GeneratedPlan) -> Vec<Task> {
        if let Some(tasks) = plan.tasks.as_ref().filter(|t| !t.is_empty()) {
            return tasks.clone();
        }

        let steps = plan
            .plan
            .as_ref()
            .and_then(|p| p.execution_order.as_ref())
            .filter(|o| !o.is_empty());
        if let Some(steps) = steps {
            return steps
                .iter()
                .enumerate()
                .map(|(i, step)| self.task_from_step(i, step))
                .collect();
        }

        tasks_from_files(plan)
    }

    fn task_from_step(&self, index: usize, step: &str) -> Task {
        let task_type = self.inference.infer_task_type(step);
        let mut task = Task::new(format!("task-{}", index + 1), task_type, step);
        match task_type {
            TaskType::Create | TaskType::Modify | TaskType::ModifySource => {
                if let Some(path) = self.inference.infer_paths(step).into_iter().next() {
                    task.target = Some(path);
                }
            }
            TaskType::Command => {
                task.command = self.inference.infer_command(step);
            }
            TaskType::Install => {
                let packages = self.inference.infer_packages(step);
                if !packages.is_empty() {
                    task.target = Some(packages.join(" "));
                }
            }
            _ => {}
        }
        task
    }
}

/// Install, then create, then modify, straight from the plan object
fn tasks_from_files(plan: &GeneratedPlan) -> Vec<Task> {
    let Some(details) = &plan.plan else {
        return Vec::new();
    };

    let mut tasks = Vec::new();
    if !plan.packages().is_empty() {
        tasks.push(Task::new(
            "task-1",
            TaskType::Install,
            format!("Install {}", plan.packages().join(", ")),
        ));
    }
    for (task_type, files) in [
        (TaskType::Create, &details.files_to_create),
        (TaskType::Modify, &details.files_to_modify),
    ] {
        for file in files {
            let path = normalize_path(&file.path);
            let verb = if task_type == TaskType::Create { "Create" } else { "Modify" };
            let description = match file.purpose.as_deref().or(file.reason.as_deref()) {
                Some(why) => format!("{} {}: {}", verb, path, why),
                None => format!("{} {}", verb, path),
            };
            tasks.push(
                Task::new(format!("task-{}", tasks.len() + 1), task_type, description).with_target(path),
            );
        }
    }
    tasks
}

fn dedupe_ids(tasks: &mut [Task]) {
    let mut seen: HashSet<String> = HashSet::new();
    for task in tasks.iter_mut() {
        if seen.contains(&task.id) {
            let mut n = 2;
            while seen.contains(&format!("{}-{}", task.id, n)) {
                n += 1;
            }
            let renamed = format!("{}-{}", task.id, n);
            warn!(original = %task.id, renamed = %renamed, "Duplicate task id renamed");
            task.id = renamed;
        }
        seen.insert(task.id.clone());
    }
}

/// Declared dependencies are filtered to known ids; undeclared ones default
/// to the previous task.
fn assign_dependencies(tasks: &mut [Task]) {
    let ids: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let mut previous: Option<String> = None;

    for task in tasks.iter_mut() {
        let deps = match task.dependencies.take() {
            Some(declared) => {
                let mut kept = Vec::new();
                for dep in declared {
                    if dep == task.id {
                        warn!(task_id = %task.id, "Ignoring self-dependency");
                    } else if !ids.contains(&dep) {
                        warn!(task_id = %task.id, dependency = %dep, "Ignoring unknown dependency");
                    } else if !kept.contains(&dep) {
                        kept.push(dep);
                    }
                }
                kept
            }
            None => previous.iter().cloned().collect(),
        };
        task.dependencies = Some(deps);
        previous = Some(task.id.clone());
    }
}

/// Kahn-style ordering: always take the earliest ready task in stage order
fn topological_order(tasks: Vec<Task>) -> AppResult<Vec<Task>> {
    let mut remaining: Vec<Task> = tasks;
    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|t| {
            t.dependencies
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .all(|d| placed.contains(d))
        });

        match ready {
            Some(index) => {
                let task = remaining.remove(index);
                placed.insert(task.id.clone());
                ordered.push(task);
            }
            None => {
                let cycle = find_cycle(&remaining);
                return Err(AppError::compile(format!(
                    "Circular dependency: {}",
                    cycle.join(" -> ")
                )));
            }
        }
    }

    Ok(ordered)
}

/// One dependency cycle among `tasks`, first id repeated at the end
fn find_cycle(tasks: &[Task]) -> Vec<String> {
    let graph: HashMap<&str, &[String]> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.dependencies.as_deref().unwrap_or(&[])))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    for task in tasks {
        let mut path: Vec<&str> = Vec::new();
        if let Some(cycle) = dfs_cycle(task.id.as_str(), &graph, &mut visited, &mut path) {
            return cycle;
        }
    }
    tasks.iter().map(|t| t.id.clone()).collect()
}

fn dfs_cycle<'a>(
    current: &'a str,
    graph: &HashMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    if let Some(pos) = path.iter().position(|id| *id == current) {
        let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
        cycle.push(current.to_string());
        return Some(cycle);
    }
    if visited.contains(current) {
        return None;
    }

    path.push(current);
    if let Some(deps) = graph.get(current).copied() {
        for dep in deps {
            if let Some(cycle) = dfs_cycle(dep.as_str(), graph, visited, path) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    visited.insert(current);
    None
}
