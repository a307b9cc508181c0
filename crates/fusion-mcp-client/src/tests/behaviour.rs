//! BDD step definitions for the `fusion-mcp` CLI.
//!
//! Scenarios in `tests/features/cli_*.feature` run the CLI in-process against
//! a [`FakeServer`](super::support::FakeServer).

use std::cell::RefCell;
use std::process::ExitCode;

use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{CliWorld, world};

const MODEL_INFO_REPLY: &str =
    r#"{"type":"model_info","status":"success","data":{"name":"Example Model","version":"1.0"}}"#;
const FAILED_COMMAND_REPLY: &str = r#"{"type":"command_result","status":"error","error":"command 'explode' failed: host refused"}"#;

#[given("a relay that reports the open model")]
fn given_model_relay(world: &RefCell<CliWorld>) {
    world
        .borrow_mut()
        .start_server(MODEL_INFO_REPLY)
        .expect("failed to start fake relay");
}

#[given("a relay that rejects every command")]
fn given_rejecting_relay(world: &RefCell<CliWorld>) {
    world
        .borrow_mut()
        .start_server(FAILED_COMMAND_REPLY)
        .expect("failed to start fake relay");
}

#[given("no relay is listening")]
fn given_no_relay(world: &RefCell<CliWorld>) {
    world
        .borrow_mut()
        .stop_listening()
        .expect("failed to reserve a closed port");
}

#[when("the operator runs {command}")]
fn when_operator_runs(world: &RefCell<CliWorld>, command: String) {
    let tokens: Vec<&str> = command.trim_matches('"').split_whitespace().collect();
    world.borrow_mut().run(&tokens).expect("CLI run failed");
}

#[then("the relay received a {message_type} request")]
fn then_relay_received(world: &RefCell<CliWorld>, message_type: String) {
    let world = world.borrow();
    let request = world.requests.first().expect("no request recorded");
    assert_eq!(request["type"], message_type.as_str());
}

#[then("stdout shows the model name {name}")]
fn then_stdout_model_name(world: &RefCell<CliWorld>, name: String) {
    let reply = world.borrow().stdout_json().expect("stdout JSON");
    assert_eq!(reply["data"]["name"], name.trim_matches('"'));
}

#[then("stdout shows the error {snippet}")]
fn then_stdout_error(world: &RefCell<CliWorld>, snippet: String) {
    let reply = world.borrow().stdout_json().expect("stdout JSON");
    let error = reply["error"].as_str().expect("error text");
    assert!(
        error.contains(snippet.trim_matches('"')),
        "unexpected error: {error}"
    );
}

#[then("the CLI exits successfully")]
fn then_exits_successfully(world: &RefCell<CliWorld>) {
    world
        .borrow()
        .assert_exit_code(ExitCode::SUCCESS)
        .expect("exit code");
}

#[then("the CLI exits with the error reply status")]
fn then_exits_with_error_status(world: &RefCell<CliWorld>) {
    world
        .borrow()
        .assert_exit_code(ExitCode::from(1))
        .expect("exit code");
}

#[then("the CLI fails with {snippet} on stderr")]
fn then_fails_on_stderr(world: &RefCell<CliWorld>, snippet: String) {
    let world = world.borrow();
    world
        .assert_exit_code(ExitCode::FAILURE)
        .expect("exit code");
    let stderr = world.stderr_text().expect("stderr text");
    assert!(
        stderr.contains(snippet.trim_matches('"')),
        "stderr was {stderr:?}"
    );
}

#[scenario(path = "tests/features/cli_model_info.feature")]
fn cli_model_info(world: RefCell<CliWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/cli_command_error.feature")]
fn cli_command_error(world: RefCell<CliWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/cli_no_relay.feature")]
fn cli_no_relay(world: RefCell<CliWorld>) {
    let _ = world;
}
