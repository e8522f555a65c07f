//! Behaviour-driven tests running real processes through the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::dispatcher::{CommandDispatcher, DispatchSettings};
use crate::host::HostAdapter;
use crate::invoker::SystemInvoker;
use crate::result::Notification;

use super::{RecordingHost, RecordingSpawner, SETTLE, SHELL, fast_settings, write_script, write_target};

type Dispatcher = CommandDispatcher<SystemInvoker<Arc<RecordingSpawner>>>;

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    dir: TempDir,
    target: PathBuf,
    settings: DispatchSettings,
    spawner: Arc<RecordingSpawner>,
    host: Arc<RecordingHost>,
    dispatcher: Option<Dispatcher>,
    cancelled: Option<bool>,
}

#[fixture]
fn world() -> TestWorld {
    let dir = TempDir::new().expect("create temp dir");
    let target = write_target(dir.path(), "sales.csv");
    TestWorld {
        dir,
        target,
        settings: DispatchSettings::new("dataforge"),
        spawner: Arc::default(),
        host: Arc::default(),
        dispatcher: None,
        cancelled: None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn use_script(world: &mut TestWorld, body: &str) {
    let script = write_script(world.dir.path(), "dataforge.sh", body);
    world.settings =
        DispatchSettings::new(SHELL).with_extra_args(vec![script.to_string_lossy().into_owned()]);
}

fn dispatcher(world: &mut TestWorld) -> &Dispatcher {
    let invoker = SystemInvoker::with_spawner(Arc::clone(&world.spawner)).with_settings(fast_settings());
    let host: Arc<dyn HostAdapter> = Arc::clone(&world.host) as Arc<dyn HostAdapter>;
    let settings = world.settings.clone();
    world
        .dispatcher
        .get_or_insert_with(|| CommandDispatcher::new(invoker, host, settings))
}

fn settle(world: &TestWorld) {
    let dispatcher = world.dispatcher.as_ref().expect("command has run");
    assert!(dispatcher.wait_idle(SETTLE), "invocations did not settle");
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a tool that prints {text}")]
fn given_printing_tool(world: &mut TestWorld, text: String) {
    let body = format!("printf '%s' '{}'", text.trim_matches('"'));
    use_script(world, &body);
}

#[given("a tool that writes {text} to stderr and exits with {code}")]
fn given_failing_tool(world: &mut TestWorld, text: String, code: String) {
    let body = format!(
        "printf '%s' '{}' >&2; exit {}",
        text.trim_matches('"'),
        code.trim_matches('"')
    );
    use_script(world, &body);
}

#[given("a slow tool that prints {text}")]
fn given_slow_tool(world: &mut TestWorld, text: String) {
    let body = format!("sleep 1; printf '%s' '{}'", text.trim_matches('"'));
    use_script(world, &body);
}

#[given("no tool is installed")]
fn given_no_tool(world: &mut TestWorld) {
    let missing = world.dir.path().join("bin").join("dataforge");
    world.settings = DispatchSettings::new(missing.to_string_lossy());
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the command runs on the target file")]
fn when_run(world: &mut TestWorld) {
    let target = world.target.clone();
    dispatcher(world).on_trigger(&target);
    settle(world);
}

#[when("the command runs twice on the target file")]
fn when_run_twice(world: &mut TestWorld) {
    let target = world.target.clone();
    let running = dispatcher(world);
    running.on_trigger(&target);
    running.on_trigger(&target);
    settle(world);
}

#[when("the command runs with no file selected")]
fn when_run_without_file(world: &mut TestWorld) {
    dispatcher(world).on_trigger(&PathBuf::new());
    settle(world);
}

#[when("the finished run is cancelled")]
fn when_cancel_finished(world: &mut TestWorld) {
    let target = world.target.clone();
    world.cancelled = Some(dispatcher(world).cancel(&target));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the host shows info {text}")]
fn then_info(world: &mut TestWorld, text: String) {
    assert_eq!(
        world.host.notifications(),
        vec![Notification::Info(text.trim_matches('"').to_owned())]
    );
}

#[then("the host shows warning {text}")]
fn then_warning(world: &mut TestWorld, text: String) {
    assert_eq!(
        world.host.notifications(),
        vec![Notification::Warning(text.trim_matches('"').to_owned())]
    );
}

#[then("the host shows an error mentioning {text}")]
fn then_error(world: &mut TestWorld, text: String) {
    let expected = text.trim_matches('"');
    let notifications = world.host.notifications();
    assert!(
        matches!(notifications.as_slice(), [Notification::Error(message)] if message.contains(expected)),
        "expected one error mentioning '{expected}', got {notifications:?}"
    );
}

#[then("no process was started")]
fn then_no_process(world: &mut TestWorld) {
    assert!(world.spawner.pids().is_empty());
}

#[then("every started process has exited")]
fn then_processes_exited(world: &mut TestWorld) {
    let pids = world.spawner.pids();
    assert!(!pids.is_empty());
    for pid in pids {
        let raw = i32::try_from(pid).expect("pid fits in i32");
        assert_eq!(
            kill(Pid::from_raw(raw), None),
            Err(Errno::ESRCH),
            "process {pid} is still alive"
        );
    }
}

#[then("cancellation reports nothing to cancel")]
fn then_nothing_cancelled(world: &mut TestWorld) {
    assert_eq!(world.cancelled, Some(false));
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/invocation.feature",
    name = "A successful run shows the tool's output"
)]
fn successful_run(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invocation.feature",
    name = "A failing run shows stderr as a warning"
)]
fn failing_run(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invocation.feature",
    name = "A missing tool is an error and starts no process"
)]
fn missing_tool(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invocation.feature",
    name = "An empty selection is rejected"
)]
fn empty_selection(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invocation.feature",
    name = "Retriggering a file replaces the running invocation"
)]
fn retrigger(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invocation.feature",
    name = "Cancelling a finished run has nothing to cancel"
)]
fn cancel_finished(world: TestWorld) {
    let _ = world;
}
