use super::run_test;
use hubrelay::db::{mutes, notifications_off, subscriptions, users};
use hubrelay::subscriptions::{Features, Subscription, SubscriptionFlags};

fn subscription(channel: &str, repository: &str, features: &str) -> Subscription {
    Subscription {
        channel_id: channel.to_string(),
        creator_id: "u1".to_string(),
        repository: repository.to_string(),
        features: Features::parse(features).unwrap(),
        flags: SubscriptionFlags::default(),
    }
}

#[test]
fn subscriptions_document() {
    run_test(|store| async move {
        let store = &*store;
        subscriptions::add(store, subscription("c1", "octo/hello", "pulls"))
            .await
            .unwrap();
        subscriptions::add(store, subscription("c2", "octo/hello", "issues"))
            .await
            .unwrap();
        subscriptions::add(store, subscription("c1", "octo/", "pushes"))
            .await
            .unwrap();
        // Same channel and key: replaced in place.
        subscriptions::add(store, subscription("c1", "octo/hello", "pulls,stars"))
            .await
            .unwrap();

        let doc = subscriptions::load(store).await.unwrap();
        let channels: Vec<_> = doc
            .for_key("octo/hello")
            .iter()
            .map(|sub| (sub.channel_id.as_str(), sub.features.to_string()))
            .collect();
        assert_eq!(
            channels,
            [
                ("c1", "pulls,stars".to_string()),
                ("c2", "issues".to_string())
            ]
        );

        let c1 = subscriptions::for_channel(store, "c1").await.unwrap();
        let keys: Vec<_> = c1.iter().map(|sub| sub.repository.as_str()).collect();
        assert_eq!(keys, ["octo/", "octo/hello"]);

        assert!(subscriptions::remove(store, "c1", "octo/hello").await.unwrap());
        assert!(!subscriptions::remove(store, "c1", "octo/hello").await.unwrap());
        let doc = subscriptions::load(store).await.unwrap();
        assert_eq!(doc.for_key("octo/hello").len(), 1);
    });
}

#[test]
fn user_directory() {
    run_test(|store| async move {
        let store = &*store;
        users::connect(
            store,
            &users::UserInfo {
                user_id: "u1".to_string(),
                github_login: "Alice".to_string(),
                token: "gho_1".to_string().into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            users::chat_user_id(store, "alice").await.unwrap().as_deref(),
            Some("u1")
        );

        // Reconnecting under another login forgets the previous one.
        users::connect(
            store,
            &users::UserInfo {
                user_id: "u1".to_string(),
                github_login: "alicia".to_string(),
                token: "gho_2".to_string().into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(users::chat_user_id(store, "alice").await.unwrap(), None);
        let info = users::user_info(store, "u1").await.unwrap().unwrap();
        assert_eq!(info.github_login, "alicia");

        assert!(users::disconnect(store, "u1").await.unwrap());
        assert!(!users::disconnect(store, "u1").await.unwrap());
        assert_eq!(users::chat_user_id(store, "alicia").await.unwrap(), None);
    });
}

#[test]
fn mute_lists() {
    run_test(|store| async move {
        let store = &*store;
        assert!(mutes::mute(store, "u1", "@bob").await.unwrap());
        assert!(mutes::mute(store, "u1", "carol").await.unwrap());
        assert!(!mutes::mute(store, "u1", "Bob").await.unwrap());
        assert!(mutes::mute(store, "u1", "").await.is_err());
        assert_eq!(mutes::muted_users(store, "u1").await.unwrap(), ["bob", "carol"]);
        assert!(mutes::is_muted(store, "u1", "BOB").await);
        assert!(!mutes::is_muted(store, "u2", "bob").await);

        assert!(mutes::unmute(store, "u1", "bob").await.unwrap());
        assert!(!mutes::unmute(store, "u1", "bob").await.unwrap());
        mutes::unmute_all(store, "u1").await.unwrap();
        assert!(mutes::muted_users(store, "u1").await.unwrap().is_empty());
    });
}

#[test]
fn notifications_kill_switch() {
    run_test(|store| async move {
        let store = &*store;
        assert!(!notifications_off::is_disabled(store, "octo/hello").await);
        assert!(notifications_off::disable(store, "Octo/Hello").await.unwrap());
        assert!(!notifications_off::disable(store, "octo/hello").await.unwrap());
        assert!(notifications_off::is_disabled(store, "octo/hello").await);
        assert!(notifications_off::enable(store, "octo/hello").await.unwrap());
        assert!(!notifications_off::is_disabled(store, "octo/hello").await);
        assert!(notifications_off::list(store).await.unwrap().is_empty());
    });
}
