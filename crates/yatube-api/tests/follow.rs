mod common;

use axum::http::StatusCode;

use common::TestApp;

#[tokio::test]
async fn follow_adds_one_edge() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");

    let before = app.db().count_followers(anna.id).unwrap();
    app.get("/anna/follow/", Some(&leo)).await.assert_redirect("/anna/");
    assert_eq!(app.db().count_followers(anna.id).unwrap(), before + 1);

    // Following again changes nothing
    app.get("/anna/follow/", Some(&leo)).await.assert_redirect("/anna/");
    assert_eq!(app.db().count_followers(anna.id).unwrap(), before + 1);
}

#[tokio::test]
async fn unfollow_restores_edge_count() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");

    app.get("/anna/follow/", Some(&leo)).await;
    let before = app.db().count_followers(anna.id).unwrap();

    app.get("/anna/unfollow/", Some(&leo)).await.assert_redirect("/anna/");
    assert_eq!(app.db().count_followers(anna.id).unwrap() + 1, before);

    // Nothing left to remove
    let res = app.get("/anna/unfollow/", Some(&leo)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn self_follow_is_a_silent_redirect() {
    let app = TestApp::new().await;
    let leo = app.user("leo");

    app.get("/leo/follow/", Some(&leo)).await.assert_redirect("/leo/");
    assert_eq!(app.db().count_following(leo.id).unwrap(), 0);
}

#[tokio::test]
async fn follow_unknown_author_is_not_found() {
    let app = TestApp::new().await;
    let leo = app.user("leo");

    assert_eq!(app.get("/ghost/follow/", Some(&leo)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/ghost/unfollow/", Some(&leo)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_requires_login() {
    let app = TestApp::new().await;
    app.user("anna");

    app.get("/anna/follow/", None)
        .await
        .assert_redirect("/auth/login/?next=/anna/follow/");
    app.get("/follow/", None)
        .await
        .assert_redirect("/auth/login/?next=/follow/");
}

#[tokio::test]
async fn login_redirect_keeps_query_string() {
    let app = TestApp::new().await;

    app.get("/follow/?page=2", None)
        .await
        .assert_redirect("/auth/login/?next=/follow/%3Fpage%3D2");
}

#[tokio::test]
async fn new_post_not_in_feed_without_follow() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    app.db()
        .create_post(anna.id, "first text for followers", None, None)
        .unwrap();

    let res = app.get("/follow/", Some(&leo)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.contains("first text for followers"));
    assert_eq!(res.json()["page"]["count"], 0);
}

#[tokio::test]
async fn new_post_in_feed_after_follow() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let carol = app.user("carol");
    app.db()
        .create_post(anna.id, "second text for followers", None, None)
        .unwrap();
    app.db().create_post(carol.id, "not followed", None, None).unwrap();

    app.get("/anna/follow/", Some(&leo)).await;
    let res = app.get("/follow/", Some(&leo)).await;

    assert!(res.contains("second text for followers"));
    assert!(!res.contains("not followed"));
}

#[tokio::test]
async fn profile_reports_follow_state() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    app.user("anna");

    let before = app.get("/anna/", Some(&leo)).await.json();
    assert_eq!(before["following"], false);
    assert_eq!(before["follower_count"], 0);

    app.get("/anna/follow/", Some(&leo)).await;

    let after = app.get("/anna/", Some(&leo)).await.json();
    assert_eq!(after["following"], true);
    assert_eq!(after["follower_count"], 1);

    let anonymous = app.get("/anna/", None).await.json();
    assert_eq!(anonymous["following"], false);

    let own = app.get("/leo/", Some(&leo)).await.json();
    assert_eq!(own["following_count"], 1);
}
