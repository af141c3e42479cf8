//! Execution engine - converges a graph in topological order
//!
//! Each resource is queried, diffed, and only its delta applied. A change
//! travels along notify edges and triggers a refresh of the target. A
//! failure blocks the failed resource's dependents; unrelated branches keep
//! going.

use crate::catalog::EdgeKind;
use crate::context::{ApplyContext, CancelToken, ProgressCallback};
use crate::error::{ApplyError, Operation, SkipReason};
use crate::graph::Graph;
use crate::report::{ResourceReport, RunReport};
use crate::resource::{BoxedResource, Resource};
use crate::types::{ENSURE, ExecuteOptions, ResourceId, ResourceStatus, find_change};
use anyhow::Result;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Converge every resource of a graph
///
/// # Arguments
/// * `graph` - The validated resource graph
/// * `opts` - Execution options (dry_run, jobs, step_timeout, verbose)
/// * `cancel` - Checked between steps; remaining resources are skipped
/// * `progress` - Progress callback
///
/// # Returns
/// Per-resource reports in completion order
pub fn execute<P: ProgressCallback>(
    graph: &Graph,
    opts: &ExecuteOptions,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<RunReport> {
    let n = graph.len();
    let mut run = RunReport {
        dry_run: opts.dry_run,
        ..Default::default()
    };

    progress.on_run_start(n);

    let pool = if opts.jobs > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(opts.jobs)
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?,
        )
    } else {
        None
    };

    let mut done = vec![false; n];
    let mut blocked = vec![false; n];
    let mut notified_by: Vec<Vec<ResourceId>> = vec![Vec::new(); n];
    let mut wave = 0;

    loop {
        let pending: Vec<usize> = graph.order().iter().copied().filter(|&i| !done[i]).collect();
        if pending.is_empty() {
            break;
        }

        if cancel.is_cancelled() {
            log::warn!("Run cancelled, skipping {} resources", pending.len());
            run.cancelled = true;
            for i in pending {
                let report = ResourceReport::new(graph.id(i).clone()).skip(SkipReason::Cancelled);
                progress.on_resource_complete(&report);
                run.resources.push(report);
                done[i] = true;
            }
            break;
        }

        // Block dependents of failures before scheduling anything
        let mut progressed = false;
        for &i in &pending {
            let deps = graph.dependencies(i);
            if !deps.iter().all(|&d| done[d]) {
                continue;
            }
            if let Some(&failed) = deps.iter().find(|&&d| blocked[d]) {
                let dependency = graph.id(failed).clone();
                log::warn!("{}: skipped, dependency {} failed", graph.id(i), dependency);
                let report = ResourceReport::new(graph.id(i).clone())
                    .skip(SkipReason::FailedDependency { dependency });
                progress.on_resource_complete(&report);
                run.resources.push(report);
                done[i] = true;
                blocked[i] = true;
                progressed = true;
            }
        }

        let ready: Vec<usize> = pending
            .iter()
            .copied()
            .filter(|&i| !done[i] && graph.dependencies(i).iter().all(|&d| done[d]))
            .collect();

        if ready.is_empty() {
            if progressed {
                continue;
            }
            break;
        }

        let batch = select_batch(graph, &ready, opts.jobs);
        wave += 1;
        for &i in &batch {
            progress.on_resource_start(graph.id(i));
        }

        let results: Vec<(usize, ResourceReport)> = match &pool {
            Some(pool) if batch.len() > 1 => pool.install(|| {
                batch
                    .par_iter()
                    .map(|&i| (i, converge(graph.resource(i), &notified_by[i], opts)))
                    .collect()
            }),
            _ => batch
                .iter()
                .map(|&i| (i, converge(graph.resource(i), &notified_by[i], opts)))
                .collect(),
        };

        for (i, mut report) in results {
            report.wave = wave;

            // A dry run still propagates, so previews show pending refreshes
            let changed = !report.changes.is_empty()
                && matches!(
                    report.status,
                    ResourceStatus::Applied | ResourceStatus::Skipped
                );
            if changed {
                for &(j, kind) in graph.dependents(i) {
                    if kind == EdgeKind::Notify {
                        notified_by[j].push(report.id.clone());
                    }
                }
            }

            if report.status == ResourceStatus::Failed {
                blocked[i] = true;
            }
            done[i] = true;
            progress.on_resource_complete(&report);
            run.resources.push(report);
        }
    }

    progress.on_run_complete();
    Ok(run)
}

/// Pick the resources converged in the next wave
///
/// Sequential runs take the first ready resource in topological order.
/// Concurrent runs admit at most one resource per lock key; a resource
/// that cannot parallelize runs alone.
fn select_batch(graph: &Graph, ready: &[usize], jobs: usize) -> Vec<usize> {
    if jobs <= 1 {
        return ready.iter().copied().take(1).collect();
    }

    let mut batch = Vec::new();
    let mut locks = HashSet::new();

    for &i in ready {
        let resource = graph.resource(i);
        if !resource.can_parallelize() {
            if batch.is_empty() {
                batch.push(i);
            }
            break;
        }
        if locks.insert(resource.lock_key()) {
            batch.push(i);
        }
        if batch.len() >= jobs {
            break;
        }
    }

    batch
}

/// Converge a single resource: query, diff, apply, refresh
fn converge(
    resource: &BoxedResource,
    notified_by: &[ResourceId],
    opts: &ExecuteOptions,
) -> ResourceReport {
    let started = Instant::now();
    let id = resource.id();
    let mut report = ResourceReport::new(id.clone());
    report.notified_by = notified_by.to_vec();

    let current = match bounded(resource, Operation::Query, opts.step_timeout, |r| {
        r.current_state()
    }) {
        Ok(state) => state,
        Err(e) => {
            log::error!("{}", e);
            report.fail(e);
            report.duration_ms = elapsed_ms(started);
            return report;
        }
    };
    report.transition(ResourceStatus::Checked);

    let changes = resource.desired_state().delta_from(&current);

    if changes.is_empty() {
        log::debug!("{}: in sync", id);
        report.transition(ResourceStatus::NoChange);
    } else if opts.dry_run {
        for change in &changes {
            log::info!("{}: would change {}", id, change);
        }
        report.changes = changes;
        report.transition(ResourceStatus::Skipped);
        report.skipped = Some(SkipReason::DryRun);
    } else {
        report.transition(ResourceStatus::Applying);
        let ctx = ApplyContext::new(opts.verbose);
        let delta = changes.clone();
        match bounded(resource, Operation::Apply, opts.step_timeout, move |r| {
            r.apply(&delta, &ctx)
        }) {
            Ok(()) => {
                for change in &changes {
                    log::info!("{}: {}", id, change);
                }
                report.changes = changes;
                report.transition(ResourceStatus::Applied);
            }
            Err(e) => {
                log::error!("{}", e);
                report.fail(e);
                report.duration_ms = elapsed_ms(started);
                return report;
            }
        }
    }

    if !notified_by.is_empty() {
        refresh(resource, &mut report, notified_by, opts);
    }

    report.duration_ms = elapsed_ms(started);
    report
}

/// Run the refresh action of a notified resource
///
/// Skipped when the resource's own `ensure` just changed: it was created,
/// started or removed in this run and holds no stale state.
fn refresh(
    resource: &BoxedResource,
    report: &mut ResourceReport,
    notified_by: &[ResourceId],
    opts: &ExecuteOptions,
) {
    let sources: Vec<String> = notified_by.iter().map(ToString::to_string).collect();

    if opts.dry_run {
        log::info!("{}: would refresh (notified by {})", report.id, sources.join(", "));
        return;
    }

    if find_change(&report.changes, ENSURE).is_some() {
        log::debug!("{}: refresh not needed, ensure just changed", report.id);
        return;
    }

    let ctx = ApplyContext::with_notifications(opts.verbose, notified_by.to_vec());
    match bounded(resource, Operation::Refresh, opts.step_timeout, move |r| {
        r.refresh(&ctx)
    }) {
        Ok(true) => {
            log::info!("{}: refreshed (notified by {})", report.id, sources.join(", "));
            report.refreshed = true;
        }
        Ok(false) => {}
        Err(e) => {
            log::error!("{}", e);
            report.fail(e);
        }
    }
}

/// Run an external call on a worker thread, bounded by `timeout`
///
/// On timeout the call is left running; it is never interrupted.
pub(crate) fn bounded<T, F>(
    resource: &BoxedResource,
    operation: Operation,
    timeout: Duration,
    call: F,
) -> std::result::Result<T, ApplyError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Resource) -> Result<T> + Send + 'static,
{
    let id = resource.id();
    let worker = Arc::clone(resource);
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name(format!("{}-{}", operation, id.kind.to_lowercase()))
        .spawn(move || {
            let _ = tx.send(call(worker.as_ref()));
        });

    if let Err(e) = spawned {
        return Err(ApplyError::Operation {
            resource: id,
            operation,
            cause: format!("failed to spawn worker: {}", e),
        });
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ApplyError::Operation {
            resource: id,
            operation,
            cause: format!("{:#}", e),
        }),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ApplyError::Timeout {
            resource: id,
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ApplyError::Operation {
            resource: id,
            operation,
            cause: "worker thread panicked".to_string(),
        }),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Execution without progress reporting or cancellation
pub fn execute_simple(graph: &Graph, opts: &ExecuteOptions) -> Result<RunReport> {
    use crate::context::NoProgress;

    execute(graph, opts, &CancelToken::new(), &mut NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Edge};
    use crate::types::{Change, ResourceState};
    use anyhow::bail;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Shared fake system: resource title -> value
    type World = Arc<Mutex<BTreeMap<String, String>>>;

    #[derive(Debug)]
    struct Setting {
        kind: &'static str,
        title: String,
        value: String,
        world: World,
        fail_apply: bool,
        lock: Option<String>,
        refreshes: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
        on_apply: Option<CancelToken>,
    }

    impl Setting {
        fn new(kind: &'static str, title: &str, value: &str, world: &World) -> Self {
            Self {
                kind,
                title: title.to_string(),
                value: value.to_string(),
                world: Arc::clone(world),
                fail_apply: false,
                lock: None,
                refreshes: Arc::new(AtomicUsize::new(0)),
                log: Arc::new(Mutex::new(Vec::new())),
                on_apply: None,
            }
        }

        fn failing(mut self) -> Self {
            self.fail_apply = true;
            self
        }

        fn sharing_log(mut self, log: &Arc<Mutex<Vec<String>>>) -> Self {
            self.log = Arc::clone(log);
            self
        }
    }

    impl Resource for Setting {
        fn id(&self) -> ResourceId {
            ResourceId::new(self.kind, self.title.clone())
        }

        fn lock_key(&self) -> String {
            self.lock.clone().unwrap_or_else(|| self.id().to_string())
        }

        fn current_state(&self) -> Result<ResourceState> {
            let world = self.world.lock().unwrap();
            Ok(match world.get(&self.title) {
                Some(v) => ResourceState::new().with(ENSURE, "present").with("value", v),
                None => ResourceState::absent(),
            })
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::new()
                .with(ENSURE, "present")
                .with("value", self.value.clone())
        }

        fn apply(&self, _changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
            self.log.lock().unwrap().push(self.id().to_string());
            if let Some(token) = &self.on_apply {
                token.cancel();
            }
            if self.fail_apply {
                bail!("simulated failure");
            }
            self.world
                .lock()
                .unwrap()
                .insert(self.title.clone(), self.value.clone());
            Ok(())
        }

        fn refresh(&self, _ctx: &ApplyContext) -> Result<bool> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[derive(Debug)]
    struct Slow(Duration);

    impl Resource for Slow {
        fn id(&self) -> ResourceId {
            ResourceId::new("Slow", "query")
        }

        fn current_state(&self) -> Result<ResourceState> {
            thread::sleep(self.0);
            Ok(ResourceState::new())
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::new()
        }

        fn apply(&self, _changes: &[Change], _ctx: &ApplyContext) -> Result<()> {
            Ok(())
        }
    }

    fn graph_of(resources: Vec<BoxedResource>, edges: Vec<Edge>) -> Graph {
        let mut catalog = Catalog::new();
        for r in resources {
            catalog.add(r).unwrap();
        }
        for e in edges {
            catalog.relate(e);
        }
        catalog.into_graph().unwrap()
    }

    fn id(kind: &str, title: &str) -> ResourceId {
        ResourceId::new(kind, title)
    }

    #[test]
    fn test_execute_empty_graph() {
        let graph = graph_of(Vec::new(), Vec::new());
        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary().total(), 0);
        assert!(report.is_success());
    }

    #[test]
    fn test_second_run_has_no_deltas() {
        let world = World::default();
        let graph = graph_of(
            vec![
                Arc::new(Setting::new("Group", "ops", "100", &world)),
                Arc::new(Setting::new("User", "alice", "1000", &world)),
            ],
            vec![Edge::before(id("Group", "ops"), id("User", "alice"))],
        );

        let first = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(first.summary().applied, 2);
        assert!(first.summary().total_changes() > 0);

        let second = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(second.summary().no_change, 2);
        assert_eq!(second.summary().total_changes(), 0);
    }

    #[test]
    fn test_state_machine_history() {
        let world = World::default();
        world.lock().unwrap().insert("ops".into(), "100".into());
        let graph = graph_of(
            vec![
                Arc::new(Setting::new("Group", "ops", "100", &world)),
                Arc::new(Setting::new("Group", "dev", "200", &world)),
            ],
            Vec::new(),
        );
        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();

        assert_eq!(
            report.get(&id("Group", "ops")).unwrap().history,
            vec![
                ResourceStatus::Pending,
                ResourceStatus::Checked,
                ResourceStatus::NoChange
            ]
        );
        assert_eq!(
            report.get(&id("Group", "dev")).unwrap().history,
            vec![
                ResourceStatus::Pending,
                ResourceStatus::Checked,
                ResourceStatus::Applying,
                ResourceStatus::Applied
            ]
        );
    }

    #[test]
    fn test_applies_in_topological_order() {
        let world = World::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let graph = graph_of(
            vec![
                Arc::new(Setting::new("User", "alice", "1", &world).sharing_log(&log)),
                Arc::new(Setting::new("Group", "ops", "1", &world).sharing_log(&log)),
            ],
            vec![Edge::before(id("Group", "ops"), id("User", "alice"))],
        );
        execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["Group[ops]".to_string(), "User[alice]".to_string()]
        );
    }

    #[test]
    fn test_failure_blocks_dependents_but_not_siblings() {
        let world = World::default();
        let graph = graph_of(
            vec![
                Arc::new(Setting::new("Group", "ops", "1", &world).failing()),
                Arc::new(Setting::new("User", "alice", "1", &world)),
                Arc::new(Setting::new("File", "motd", "hi", &world)),
                Arc::new(Setting::new("Known", "hosts", "k", &world)),
            ],
            vec![
                Edge::before(id("Group", "ops"), id("User", "alice")),
                Edge::before(id("User", "alice"), id("Known", "hosts")),
            ],
        );

        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        let group = report.get(&id("Group", "ops")).unwrap();
        assert_eq!(group.status, ResourceStatus::Failed);
        assert_eq!(
            group.error.as_ref().map(ApplyError::operation),
            Some(Operation::Apply)
        );

        let user = report.get(&id("User", "alice")).unwrap();
        assert_eq!(user.status, ResourceStatus::Skipped);
        assert_eq!(
            user.skipped,
            Some(SkipReason::FailedDependency {
                dependency: id("Group", "ops")
            })
        );

        // Transitive dependents are blocked too
        let known = report.get(&id("Known", "hosts")).unwrap();
        assert_eq!(known.status, ResourceStatus::Skipped);

        assert_eq!(
            report.get(&id("File", "motd")).unwrap().status,
            ResourceStatus::Applied
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_notify_refreshes_target_once() {
        let world = World::default();
        world.lock().unwrap().insert("sshd".into(), "running".into());
        let service = Setting::new("Service", "sshd", "running", &world);
        let refreshes = Arc::clone(&service.refreshes);

        let graph = graph_of(
            vec![
                Arc::new(Setting::new("File", "sshd_config", "v2", &world)),
                Arc::new(Setting::new("Hostkey", "host", "k", &world)),
                Arc::new(service),
            ],
            vec![
                Edge::notify(id("File", "sshd_config"), id("Service", "sshd")),
                Edge::notify(id("Hostkey", "host"), id("Service", "sshd")),
            ],
        );

        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        let service = report.get(&id("Service", "sshd")).unwrap();
        assert_eq!(service.status, ResourceStatus::NoChange);
        assert!(service.refreshed);
        assert_eq!(service.notified_by.len(), 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        // Nothing changed upstream the second time, so no refresh
        let again = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert!(!again.get(&id("Service", "sshd")).unwrap().refreshed);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ordering_edge_never_refreshes() {
        let world = World::default();
        world.lock().unwrap().insert("sshd".into(), "running".into());
        let service = Setting::new("Service", "sshd", "running", &world);
        let refreshes = Arc::clone(&service.refreshes);

        let graph = graph_of(
            vec![
                Arc::new(Setting::new("Package", "openssh", "installed", &world)),
                Arc::new(Setting::new("File", "banner", "v2", &world)),
                Arc::new(service),
            ],
            vec![
                Edge::require(id("Service", "sshd"), id("Package", "openssh")),
                Edge::before(id("File", "banner"), id("Service", "sshd")),
            ],
        );

        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(
            report.get(&id("Package", "openssh")).unwrap().status,
            ResourceStatus::Applied
        );
        assert_eq!(
            report.get(&id("File", "banner")).unwrap().status,
            ResourceStatus::Applied
        );
        let service = report.get(&id("Service", "sshd")).unwrap();
        assert_eq!(service.status, ResourceStatus::NoChange);
        assert!(service.notified_by.is_empty());
        assert!(!service.refreshed);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unchanged_notify_source_sends_nothing() {
        let world = World::default();
        world.lock().unwrap().insert("sshd_config".into(), "v1".into());
        world.lock().unwrap().insert("sshd".into(), "running".into());
        let service = Setting::new("Service", "sshd", "running", &world);
        let refreshes = Arc::clone(&service.refreshes);

        let graph = graph_of(
            vec![
                Arc::new(Setting::new("File", "sshd_config", "v1", &world)),
                Arc::new(service),
            ],
            vec![Edge::notify(id("File", "sshd_config"), id("Service", "sshd"))],
        );

        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(
            report.get(&id("File", "sshd_config")).unwrap().status,
            ResourceStatus::NoChange
        );
        let service = report.get(&id("Service", "sshd")).unwrap();
        assert!(service.notified_by.is_empty());
        assert!(!service.refreshed);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_refresh_when_target_was_just_created() {
        let world = World::default();
        let service = Setting::new("Service", "sshd", "running", &world);
        let refreshes = Arc::clone(&service.refreshes);
        let graph = graph_of(
            vec![
                Arc::new(Setting::new("File", "sshd_config", "v1", &world)),
                Arc::new(service),
            ],
            vec![Edge::notify(id("File", "sshd_config"), id("Service", "sshd"))],
        );

        let report = execute_simple(&graph, &ExecuteOptions::default()).unwrap();
        assert_eq!(
            report.get(&id("Service", "sshd")).unwrap().status,
            ResourceStatus::Applied
        );
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let world = World::default();
        let graph = graph_of(
            vec![Arc::new(Setting::new("Group", "ops", "1", &world))],
            Vec::new(),
        );
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = execute_simple(&graph, &opts).unwrap();
        let group = report.get(&id("Group", "ops")).unwrap();
        assert_eq!(group.status, ResourceStatus::Skipped);
        assert_eq!(group.skipped, Some(SkipReason::DryRun));
        assert_eq!(group.changes.len(), 2);
        assert!(world.lock().unwrap().is_empty());
        assert!(report.dry_run);
    }

    #[test]
    fn test_timeout_marks_failed() {
        let graph = graph_of(
            vec![Arc::new(Slow(Duration::from_millis(500)))],
            Vec::new(),
        );
        let opts = ExecuteOptions {
            step_timeout: Duration::from_millis(20),
            ..Default::default()
        };

        let report = execute_simple(&graph, &opts).unwrap();
        let slow = report.get(&id("Slow", "query")).unwrap();
        assert_eq!(slow.status, ResourceStatus::Failed);
        assert!(matches!(
            slow.error,
            Some(ApplyError::Timeout {
                operation: Operation::Query,
                timeout_ms: 20,
                ..
            })
        ));
    }

    #[test]
    fn test_cancellation_stops_between_steps() {
        let world = World::default();
        let token = CancelToken::new();
        let mut first = Setting::new("Group", "ops", "1", &world);
        first.on_apply = Some(token.clone());

        let graph = graph_of(
            vec![
                Arc::new(first),
                Arc::new(Setting::new("Group", "dev", "1", &world)),
            ],
            Vec::new(),
        );

        let report = execute(
            &graph,
            &ExecuteOptions::default(),
            &token,
            &mut crate::context::NoProgress,
        )
        .unwrap();

        // The in-flight step finished; the next one never started
        assert_eq!(
            report.get(&id("Group", "ops")).unwrap().status,
            ResourceStatus::Applied
        );
        let dev = report.get(&id("Group", "dev")).unwrap();
        assert_eq!(dev.skipped, Some(SkipReason::Cancelled));
        assert!(report.cancelled);
        assert!(!world.lock().unwrap().contains_key("dev"));
    }

    #[test]
    fn test_parallel_waves_respect_lock_keys_and_edges() {
        let world = World::default();
        let mut a = Setting::new("File", "a", "1", &world);
        a.lock = Some("shared".into());
        let mut b = Setting::new("File", "b", "1", &world);
        b.lock = Some("shared".into());

        let graph = graph_of(
            vec![
                Arc::new(a),
                Arc::new(b),
                Arc::new(Setting::new("Group", "ops", "1", &world)),
                Arc::new(Setting::new("User", "alice", "1", &world)),
            ],
            vec![Edge::before(id("Group", "ops"), id("User", "alice"))],
        );
        let opts = ExecuteOptions {
            jobs: 4,
            ..Default::default()
        };

        let report = execute_simple(&graph, &opts).unwrap();
        assert_eq!(report.summary().applied, 4);

        let wave = |kind: &str, title: &str| report.get(&id(kind, title)).unwrap().wave;
        assert_ne!(wave("File", "a"), wave("File", "b"));
        assert!(wave("Group", "ops") < wave("User", "alice"));
        assert_eq!(wave("File", "a"), wave("Group", "ops"));
    }

    #[test]
    fn test_select_batch_sequential_takes_first_ready() {
        let world = World::default();
        let graph = graph_of(
            vec![
                Arc::new(Setting::new("Group", "a", "1", &world)),
                Arc::new(Setting::new("Group", "b", "1", &world)),
            ],
            Vec::new(),
        );
        assert_eq!(select_batch(&graph, &[0, 1], 1), vec![0]);
        assert_eq!(select_batch(&graph, &[0, 1], 8), vec![0, 1]);
    }
}
