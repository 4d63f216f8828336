use super::run_test;
use std::time::Duration;

#[test]
fn get_set_delete() {
    run_test(|store| async move {
        assert_eq!(store.get("greeting").await.unwrap(), None);

        store.set("greeting", b"hello", None).await.unwrap();
        assert_eq!(
            store.get("greeting").await.unwrap().as_deref(),
            Some(&b"hello"[..])
        );

        store.set("greeting", b"bonjour", None).await.unwrap();
        assert_eq!(
            store.get("greeting").await.unwrap().as_deref(),
            Some(&b"bonjour"[..])
        );

        store.delete("greeting").await.unwrap();
        assert_eq!(store.get("greeting").await.unwrap(), None);
        // Deleting twice is fine.
        store.delete("greeting").await.unwrap();
    });
}

#[test]
fn compare_and_set() {
    run_test(|store| async move {
        assert!(store.compare_and_set("counter", None, b"1").await.unwrap());
        // The key exists now, so claiming it again fails.
        assert!(!store.compare_and_set("counter", None, b"1").await.unwrap());
        assert!(
            !store
                .compare_and_set("counter", Some(&b"0"[..]), b"2")
                .await
                .unwrap()
        );
        assert!(
            store
                .compare_and_set("counter", Some(&b"1"[..]), b"2")
                .await
                .unwrap()
        );
        assert_eq!(
            store.get("counter").await.unwrap().as_deref(),
            Some(&b"2"[..])
        );
    });
}

#[test]
fn expiry() {
    run_test(|store| async move {
        store
            .set("short", b"lived", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        store
            .set("long", b"lived", Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(
            store.get("long").await.unwrap().as_deref(),
            Some(&b"lived"[..])
        );
        // An expired value can be claimed as if it were absent.
        assert!(store.compare_and_set("short", None, b"again").await.unwrap());
        assert_eq!(
            store.get("short").await.unwrap().as_deref(),
            Some(&b"again"[..])
        );
    });
}
