//! Command-metadata aggregation: grouping, ordering, clearing and failure
//! handling of the outward pushes.
//! Run with: cargo test --test metadata

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use plugbot::domain::entities::{BotCommand, CommandScope};
use plugbot::plugins::api::{command_fn, CommandSpec};

use common::{harness, wait_for, TestPlugin};

#[tokio::test]
async fn declarations_group_by_scope_and_locale_in_registry_order() {
    let h = harness();
    h.loader.register("alpha", || {
        Arc::new(TestPlugin::new().with_setup(|handle| {
            handle.declare_bot_command(CommandScope::Default, None, "a1", "alpha one");
        }))
    });
    h.loader.register("beta", || {
        Arc::new(TestPlugin::new().with_setup(|handle| {
            handle.declare_bot_command(CommandScope::Default, None, "b1", "beta one");
            handle.declare_bot_command(
                CommandScope::AllPrivateChats,
                Some("en"),
                "b2",
                "beta two",
            );
        }))
    });
    h.lifecycle
        .enable(&h.loader.location("alpha"))
        .await
        .expect("enable alpha");
    h.lifecycle
        .enable(&h.loader.location("beta"))
        .await
        .expect("enable beta");

    let default_push = h.platform.last_default_push().expect("default push");
    assert_eq!(
        default_push,
        vec![
            BotCommand::new("a1", "alpha one"),
            BotCommand::new("b1", "beta one"),
        ]
    );

    let scoped = h
        .platform
        .pushes()
        .into_iter()
        .rev()
        .find(|(scope, locale, _)| {
            *scope == CommandScope::AllPrivateChats && locale.as_deref() == Some("en")
        })
        .expect("scoped push");
    assert_eq!(scoped.2, vec![BotCommand::new("b2", "beta two")]);
}

#[tokio::test]
async fn disabling_plugins_shrinks_and_finally_clears_the_list() {
    let h = harness();
    h.loader.register("alpha", || {
        Arc::new(TestPlugin::new().with_setup(|handle| {
            handle.declare_bot_command(CommandScope::Default, None, "a1", "alpha one");
        }))
    });
    h.loader.register("beta", || {
        Arc::new(TestPlugin::new().with_setup(|handle| {
            handle.declare_bot_command(CommandScope::Default, None, "b1", "beta one");
        }))
    });
    h.lifecycle
        .enable(&h.loader.location("alpha"))
        .await
        .expect("enable alpha");
    h.lifecycle
        .enable(&h.loader.location("beta"))
        .await
        .expect("enable beta");

    h.lifecycle.disable("beta").await.expect("disable beta");
    assert_eq!(
        h.platform.last_default_push().expect("push after disable"),
        vec![BotCommand::new("a1", "alpha one")]
    );

    h.lifecycle.disable("alpha").await.expect("disable alpha");
    assert_eq!(
        h.platform.last_default_push().expect("final push"),
        Vec::<BotCommand>::new(),
        "disabling the last declaring plugin must clear the outward list"
    );
}

#[tokio::test]
async fn push_failure_is_logged_and_does_not_roll_back_the_enable() {
    let h = harness();
    h.platform.fail_set_commands.store(true, Ordering::SeqCst);
    h.loader.register("alpha", || {
        Arc::new(TestPlugin::new().with_setup(|handle| {
            handle.declare_bot_command(CommandScope::Default, None, "a1", "alpha one");
        }))
    });

    h.lifecycle
        .enable(&h.loader.location("alpha"))
        .await
        .expect("enable should succeed despite the failing push");
    assert!(h.registry.contains("alpha"));
    assert!(h.sink.count_containing("cannot push command metadata") >= 1);
}

#[tokio::test]
async fn plugins_can_request_a_refresh() {
    let h = harness();
    h.loader.register("fresh", || {
        Arc::new(TestPlugin::new().with_setup(|handle| {
            let refresher = handle.clone();
            handle.register_command(CommandSpec::new(
                "refresh",
                command_fn(move |_args| {
                    let refresher = refresher.clone();
                    async move {
                        refresher.declare_bot_command(
                            CommandScope::Default,
                            None,
                            "late",
                            "declared after init",
                        );
                        refresher.request_command_refresh();
                        Ok(())
                    }
                }),
            ));
        }))
    });
    h.lifecycle
        .enable(&h.loader.location("fresh"))
        .await
        .expect("enable");
    h.platform.clear_pushes();

    h.router.handle("refresh").await;
    let pushed = wait_for(|| {
        h.platform
            .last_default_push()
            .map(|commands| commands.contains(&BotCommand::new("late", "declared after init")))
            .unwrap_or(false)
    })
    .await;
    assert!(pushed, "refresh should push the late declaration");
}
