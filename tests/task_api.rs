mod common;

use common::{recording, Counter, Journal};
use std::time::Duration;
use task_manager_core::{
    Error, OutcomeStatus, RequestFlags, RequestOptions, TaskConfig, TaskManager, TaskOptions,
    TaskRegistry,
};

fn adder(counter: &Counter) -> TaskConfig<(i64, i64), i64, String> {
    let counter = counter.clone();
    TaskConfig::new(move |(a, b): (i64, i64)| {
        let counter = counter.clone();
        async move {
            counter.bump();
            Ok(a + b)
        }
    })
}

#[tokio::test]
async fn conflicting_flags_fail_before_a_request_function_exists() {
    let counter = Counter::new();
    let manager = TaskManager::new(adder(&counter)).unwrap();

    let result = manager.config(RequestOptions::new().invalidate(true).pre_process(true));

    match result {
        Err(Error::Configuration { context, .. }) => {
            assert_eq!(context.field_path.as_deref(), Some("flags"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("conflicting flags were accepted"),
    }
    assert_eq!(counter.get(), 0);
}

#[tokio::test]
async fn per_call_hooks_fire_before_defaults() {
    let counter = Counter::new();
    let journal = Journal::new();
    let manager =
        TaskManager::new(adder(&counter).default_handlers(recording(&journal, "default"))).unwrap();

    let request = manager
        .config(RequestOptions::from(recording(&journal, "call")))
        .unwrap();
    let outcome = request.request((2, 3)).await.unwrap();

    assert_eq!(outcome.data, Some(5));
    assert_eq!(
        journal.entries(),
        vec![
            "call:request",
            "default:request",
            "call:success",
            "default:success",
            "call:finally",
            "default:finally"
        ]
    );

    // the bound request function is reusable
    request.request((4, 4)).await.unwrap();
    assert_eq!(journal.count("call:success"), 2);
    assert_eq!(counter.get(), 2);
}

#[tokio::test]
async fn pre_process_ignores_window_and_state() {
    let counter = Counter::new();
    let journal = Journal::new();
    let manager = TaskManager::new(
        adder(&counter)
            .prevent_new_request_duration(Duration::from_secs(10))
            .default_handlers(recording(&journal, "default")),
    )
    .unwrap();

    manager.request((1, 1)).await.unwrap();
    let before = manager.request_details();

    let warmed = manager.pre_process((1, 1)).await.unwrap();
    let other = manager.pre_process((9, 9)).await.unwrap();

    assert_eq!(warmed.status, OutcomeStatus::Succeeded);
    assert_eq!(other.data, Some(18));
    assert_eq!(counter.get(), 3);
    assert_eq!(manager.request_details(), before);
    assert_eq!(journal.count("default:finally"), 3);
}

#[tokio::test]
async fn configured_pre_process_behaves_like_pre_process() {
    let counter = Counter::new();
    let manager = TaskManager::new(adder(&counter)).unwrap();

    let outcome = manager
        .config(RequestOptions::new().with_flags(RequestFlags::pre_process()))
        .unwrap()
        .request((5, 5))
        .await
        .unwrap();

    assert_eq!(outcome.data, Some(10));
    assert!(manager.request_details().is_empty());
}

#[tokio::test]
async fn uids_are_generated_and_unique_per_registry() {
    let registry = TaskRegistry::in_memory();
    let counter = Counter::new();

    let anonymous = TaskManager::with_registry(adder(&counter), &registry).unwrap();
    assert!(anonymous.uid().starts_with("TM-"));

    let named = TaskManager::with_registry(adder(&counter).uid("sum"), &registry).unwrap();
    assert!(registry.contains("sum"));
    assert_eq!(registry.len(), 2);

    let clash = TaskManager::with_registry(adder(&counter).uid("sum"), &registry);
    assert!(clash.unwrap_err().is_configuration());

    drop(named);
    assert!(!registry.contains("sum"));
    assert!(TaskManager::with_registry(adder(&counter).uid("sum"), &registry).is_ok());
}

#[tokio::test]
async fn options_from_yaml_drive_behavior() {
    let options = TaskOptions::from_yaml_str(
        r#"
uid: flaky-sum
retry_on_error: 2
retry_on_error_delay_ms: 5
cache:
  enable_cache: true
  cache_id: sums
"#,
    )
    .unwrap();

    let counter = Counter::new();
    let c = counter.clone();
    let manager: TaskManager<(i64, i64), i64, String> = TaskManager::new(
        TaskConfig::new(move |_: (i64, i64)| {
            let c = c.clone();
            async move {
                c.bump();
                Err("unavailable".to_string())
            }
        })
        .with_options(&options),
    )
    .unwrap();

    let outcome = manager.request((1, 2)).await.unwrap();

    assert_eq!(manager.uid(), "flaky-sum");
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(counter.get(), 2);
}
