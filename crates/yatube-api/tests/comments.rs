mod common;

use axum::http::StatusCode;

use common::TestApp;

#[tokio::test]
async fn logged_in_comment_shows_on_post() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let post_id = app.db().create_post(anna.id, "post for comments", None, None).unwrap();

    let res = app
        .post_form(
            &format!("/anna/{}/comment/", post_id),
            Some(&leo),
            &[("text", "just a comment")],
        )
        .await;
    res.assert_redirect(&format!("/anna/{}/", post_id));

    let page = app.get(&format!("/anna/{}/", post_id), Some(&leo)).await;
    assert!(page.contains("just a comment"));
    let body = page.json();
    assert_eq!(body["comments"][0]["author"]["username"], "leo");
    assert_eq!(body["post"]["comment_count"], 1);
}

#[tokio::test]
async fn anonymous_comment_redirects_to_login() {
    let app = TestApp::new().await;
    let anna = app.user("anna");
    let post_id = app.db().create_post(anna.id, "post for comments", None, None).unwrap();

    let res = app
        .post_form(
            &format!("/anna/{}/comment/", post_id),
            None,
            &[("text", "just a comment")],
        )
        .await;

    res.assert_redirect(&format!("/auth/login/?next=/anna/{}/comment/", post_id));
    assert!(app.db().list_comments(post_id).unwrap().is_empty());
}

#[tokio::test]
async fn blank_comment_is_rejected() {
    let app = TestApp::new().await;
    let anna = app.user("anna");
    let post_id = app.db().create_post(anna.id, "post", None, None).unwrap();

    let res = app
        .post_form(&format!("/anna/{}/comment/", post_id), Some(&anna), &[("text", " ")])
        .await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.db().list_comments(post_id).unwrap().is_empty());
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = TestApp::new().await;
    let anna = app.user("anna");

    let res = app
        .post_form("/anna/404/comment/", Some(&anna), &[("text", "hello?")])
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_url_get_goes_back_to_post() {
    let app = TestApp::new().await;
    let leo = app.user("leo");
    let anna = app.user("anna");
    let post_id = app.db().create_post(anna.id, "post", None, None).unwrap();
    let url = format!("/anna/{}/comment/", post_id);

    app.get(&url, Some(&leo))
        .await
        .assert_redirect(&format!("/anna/{}/", post_id));
    app.get(&url, None)
        .await
        .assert_redirect(&format!("/auth/login/?next=/anna/{}/comment/", post_id));
    assert_eq!(
        app.get("/leo/999/comment/", Some(&leo)).await.status,
        StatusCode::NOT_FOUND
    );
}
