//! Signup, login, logout and password reset over HTTP.

use bazaar_integration_tests::{PASSWORD, TestApp, location};
use reqwest::StatusCode;

/// The reset token from the last mail sent to `email`.
async fn reset_token(app: &TestApp, email: &str) -> String {
    let sent = app.mailer.sent().await;
    let mail = sent
        .iter()
        .rev()
        .find(|mail| mail.to.as_str() == email)
        .expect("no reset mail sent");
    let start = mail.html_body.find("/reset/").expect("no reset link") + "/reset/".len();
    mail.html_body[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect()
}

#[tokio::test]
async fn test_signup_then_login() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();

    let resp = app.signup(&client, "new@example.com").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/login?notice=signed-up"));

    let body = app
        .get(&client, "/login?notice=signed-up")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Your account was created."));

    let resp = app.login(&client, "new@example.com", PASSWORD).await;
    assert_eq!(location(&resp), Some("/"));

    let body = app.get(&client, "/").await.text().await.unwrap();
    assert!(body.contains("Logout"));
    assert!(body.contains("/admin/add-product"));
}

#[tokio::test]
async fn test_signup_rejects_mismatched_passwords() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();

    let resp = app
        .post_form(
            &client,
            "/signup",
            &[
                ("email", "new@example.com"),
                ("password", PASSWORD),
                ("confirm_password", "Other1234"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Passwords have to match!"));
    assert!(body.contains("new@example.com"));
}

#[tokio::test]
async fn test_signup_rejects_taken_email() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();

    app.signup(&client, "taken@example.com").await;
    let resp = app.signup(&client, "taken@example.com").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("E-Mail already exists"));
}

#[tokio::test]
async fn test_signup_rejects_weak_password() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();

    let resp = app
        .post_form(
            &client,
            "/signup",
            &[
                ("email", "new@example.com"),
                ("password", "short"),
                ("confirm_password", "short"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();
    app.signup(&client, "user@example.com").await;

    let resp = app.login(&client, "user@example.com", "Wrong1234").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("Invalid email or password."));

    let resp = app.login(&client, "nobody@example.com", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Still anonymous.
    let resp = app.get(&client, "/cart").await;
    assert_eq!(location(&resp), Some("/login"));
}

#[tokio::test]
async fn test_login_page_redirects_when_logged_in() {
    let app = TestApp::spawn().await;
    let client = app.logged_in_browser("user@example.com").await;

    for path in ["/login", "/signup"] {
        let resp = app.get(&client, path).await;
        assert_eq!(location(&resp), Some("/"), "{path}");
    }
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    let client = app.logged_in_browser("user@example.com").await;
    assert_eq!(app.get(&client, "/cart").await.status(), StatusCode::OK);

    let resp = app.post_form(&client, "/logout", &[]).await;
    assert_eq!(location(&resp), Some("/"));

    let resp = app.get(&client, "/cart").await;
    assert_eq!(location(&resp), Some("/login"));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();
    app.signup(&client, "forgetful@example.com").await;

    let resp = app
        .post_form(&client, "/reset", &[("email", "forgetful@example.com")])
        .await;
    assert_eq!(location(&resp), Some("/reset?notice=reset-sent"));

    let token = reset_token(&app, "forgetful@example.com").await;
    assert_eq!(token.len(), 64);

    let resp = app.get(&client, &format!("/reset/{token}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains(&token));

    let resp = app
        .post_form(
            &client,
            "/new-password",
            &[
                ("token", token.as_str()),
                ("password", "Fresh1234"),
                ("confirm_password", "Fresh1234"),
            ],
        )
        .await;
    assert_eq!(location(&resp), Some("/login?notice=password-reset"));

    let resp = app.login(&client, "forgetful@example.com", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app.login(&client, "forgetful@example.com", "Fresh1234").await;
    assert_eq!(location(&resp), Some("/"));

    // The token is single use.
    let resp = app.get(&client, &format!("/reset/{token}")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reset_for_unknown_email_looks_the_same() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();

    let resp = app
        .post_form(&client, "/reset", &[("email", "ghost@example.com")])
        .await;
    assert_eq!(location(&resp), Some("/reset?notice=reset-sent"));
    assert!(app.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_invalid_reset_token() {
    let app = TestApp::spawn().await;
    let client = TestApp::browser();

    let resp = app.get(&client, "/reset/deadbeef").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("invalid or has expired"));

    let resp = app
        .post_form(
            &client,
            "/new-password",
            &[
                ("token", "deadbeef"),
                ("password", "Fresh1234"),
                ("confirm_password", "Fresh1234"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
