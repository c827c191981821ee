//! End-to-end tests for the `weft` binary.

use std::fs;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const CATALOG: &str = r#"
[[types]]
name = "hello.aop.order.OrderService"
kind = "contract"

[[types.methods]]
name = "orderItem"
params = ["String"]
returns = "String"

[[types]]
name = "hello.aop.order.OrderServiceImpl"
supertypes = ["hello.aop.order.OrderService"]

[[types.methods]]
name = "orderItem"
params = ["String"]
returns = "String"

[[types.methods]]
name = "checksum"
returns = "String"
final = true

[[types]]
name = "hello.aop.order.OrderRepository"

[[types.methods]]
name = "save"
params = ["String"]
returns = "String"
"#;

const ASPECTS: &str = r#"
[[pointcuts]]
name = "allOrder"
expression = "execution(* hello.aop.order..*(..))"

[[aspects]]
name = "LogAspect"
order = 2

[[aspects.advice]]
kind = "log"
pointcut = "allOrder()"

[[aspects]]
name = "TxAspect"
order = 1

[[aspects.advice]]
kind = "transaction"
pointcut = "allOrder() && execution(* *..*Service*.*(..))"
"#;

const CONFIG: &str = r#"
[catalog]
paths = ["catalog"]

[aspects]
paths = ["aspects"]
"#;

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("catalog")).unwrap();
    fs::create_dir(temp.path().join("aspects")).unwrap();
    fs::write(temp.path().join("catalog/order.toml"), CATALOG).unwrap();
    fs::write(temp.path().join("aspects/order.toml"), ASPECTS).unwrap();
    fs::write(temp.path().join("weft.toml"), CONFIG).unwrap();
    temp
}

fn weft(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("weft");
    cmd.current_dir(temp.path())
        .env_remove("RUST_LOG")
        .env_remove("WEFT_PROXY__MODE")
        .args(["--no-color", "--output-format", "plain", "-c", "weft.toml"]);
    cmd
}

// ── check ────────────────────────────────────────────────────────────────────

#[test]
fn check_prints_the_normalised_expression() {
    let temp = workspace();
    weft(&temp)
        .args(["check", "execution(* hello.aop.order..*(..)) && args(String)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pointcut is valid"))
        .stdout(predicate::str::contains("normalized:"));
}

#[test]
fn check_reports_the_syntax_error_position() {
    let temp = workspace();
    weft(&temp)
        .args(["check", "execution(* *(..)) && missing()"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing"))
        .stderr(predicate::str::contains("Suggestions:"));
}

#[test]
fn check_sees_named_pointcuts_from_aspect_manifests() {
    let temp = workspace();
    weft(&temp)
        .args(["check", "allOrder() && !within(hello.aop.order.OrderRepository)"])
        .assert()
        .success();
}

#[test]
fn check_emits_json() {
    let temp = workspace();
    weft(&temp)
        .args(["--output-format", "json", "check", "execution(* *(..))"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"normalized\""))
        .stdout(predicate::str::contains("\"captures\": []"));
}

// ── match ────────────────────────────────────────────────────────────────────

#[test]
fn match_lists_selected_join_points() {
    let temp = workspace();
    weft(&temp)
        .args(["match", "execution(* *..*Service*.*(..))"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OrderServiceImpl.orderItem"))
        .stdout(predicate::str::contains("OrderRepository.save").not());
}

#[test]
fn match_marks_runtime_args_checks_as_dynamic() {
    let temp = workspace();
    fs::write(
        temp.path().join("catalog/store.toml"),
        "[[types]]\nname = \"hello.aop.store.Store\"\n\n[[types.methods]]\nname = \"put\"\nparams = [\"Object\"]\n",
    )
    .unwrap();
    weft(&temp)
        .args(["match", "args(String)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Store.put(Object) [dynamic"));
}

// ── plan ─────────────────────────────────────────────────────────────────────

#[test]
fn plan_orders_aspects_by_order_value() {
    let temp = workspace();
    weft(&temp)
        .args(["plan", "hello.aop.order.OrderServiceImpl.orderItem"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("(?s)TxAspect.*LogAspect").unwrap());
}

#[test]
fn plan_reports_final_methods_on_subclass_proxies() {
    let temp = workspace();
    weft(&temp)
        .args([
            "plan",
            "hello.aop.order.OrderServiceImpl.checksum",
            "--mode",
            "subclass",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("final method"));
}

#[test]
fn plan_unknown_method_is_not_found() {
    let temp = workspace();
    weft(&temp)
        .args(["plan", "hello.aop.order.OrderServiceImpl.cancel"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No method 'cancel'"))
        .stderr(predicate::str::contains("orderItem"));
}

#[test]
fn plan_interface_proxy_needs_a_contract() {
    let temp = workspace();
    weft(&temp)
        .args([
            "plan",
            "hello.aop.order.OrderRepository.save",
            "--mode",
            "interface",
        ])
        .assert()
        .failure();
}

// ── config / init ────────────────────────────────────────────────────────────

#[test]
fn config_get_reads_file_and_environment() {
    let temp = workspace();
    weft(&temp)
        .args(["config", "get", "catalog.paths"])
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog"));

    weft(&temp)
        .env("WEFT_PROXY__MODE", "subclass")
        .args(["config", "get", "proxy.mode"])
        .assert()
        .success()
        .stdout(predicate::str::diff("subclass\n"));
}

#[test]
fn config_unknown_key_is_a_user_error() {
    let temp = workspace();
    weft(&temp)
        .args(["config", "get", "proxy.flavour"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn missing_config_file_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    cargo_bin_cmd!("weft")
        .current_dir(temp.path())
        .args(["-c", "absent.toml", "config", "list"])
        .assert()
        .code(4);
}

#[test]
fn init_writes_defaults_once() {
    let temp = TempDir::new().unwrap();
    let run = || {
        let mut cmd = cargo_bin_cmd!("weft");
        cmd.current_dir(temp.path())
            .args(["--no-color", "-c", "fresh/weft.toml", "init"]);
        cmd
    };

    run()
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration created"));
    let written = fs::read_to_string(temp.path().join("fresh/weft.toml")).unwrap();
    assert!(written.contains("include_builtins = true"));

    run()
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// ── misc ─────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    cargo_bin_cmd!("weft")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn completions_mention_the_binary() {
    cargo_bin_cmd!("weft")
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("weft"));
}
