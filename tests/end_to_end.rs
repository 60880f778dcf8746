mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;

use common::{
    client, location, session_cookie, web_state, ApiFixture, TestServer, ADMIN_EMAIL, ADMIN_PASSWORD, ALICE_EMAIL,
    USER_PASSWORD,
};
use snippets::web;
use snippets::web::render::escape;

/// A browser session against a web tier that talks to a live API.
struct Browser {
    web: TestServer,
    cookie: Option<String>,
}

impl Browser {
    async fn new(fixture: &ApiFixture) -> Result<Self> {
        let api = fixture.spawn().await?;
        let web = TestServer::spawn(web::router(web_state(&api.base_url)?)).await?;
        Ok(Self { web, cookie: None })
    }

    fn remember(&mut self, res: &reqwest::Response) {
        if let Some(cookie) = session_cookie(res) {
            self.cookie = Some(cookie);
        }
    }

    async fn get(&mut self, path: &str) -> Result<reqwest::Response> {
        let mut req = client()?.get(self.web.url(path));
        if let Some(cookie) = &self.cookie {
            req = req.header("cookie", cookie);
        }
        let res = req.send().await?;
        self.remember(&res);
        Ok(res)
    }

    async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut req = client()?.post(self.web.url(path)).form(form);
        if let Some(cookie) = &self.cookie {
            req = req.header("cookie", cookie);
        }
        let res = req.send().await?;
        self.remember(&res);
        Ok(res)
    }

    async fn page(&mut self, path: &str) -> Result<String> {
        let res = self.get(path).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "GET {} returned {}", path, res.status());
        Ok(res.text().await?)
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<reqwest::Response> {
        self.post("/user/login", &[("email", email), ("password", password)]).await
    }
}

#[tokio::test]
async fn login_returns_to_the_requested_page() -> Result<()> {
    let fixture = ApiFixture::new().await?;
    let mut browser = Browser::new(&fixture).await?;

    let res = browser.get("/snippet/create").await?;
    assert_eq!(res.status(), StatusCode::FOUND);
    let anonymous_cookie = browser.cookie.clone().context("session cookie before login")?;

    let res = browser.login(ALICE_EMAIL, USER_PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/snippet/create"));
    assert_ne!(browser.cookie.as_deref(), Some(anonymous_cookie.as_str()));

    // The id handed out before login no longer carries the session.
    let res = client()?
        .get(browser.web.url("/snippet/create"))
        .header("cookie", &anonymous_cookie)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FOUND);

    let page = browser.page("/snippet/create").await?;
    assert!(page.contains("Logged in as Alice Liddell"));
    assert!(page.contains(&escape("You've been logged in successfully!")));

    let res = browser
        .post(
            "/snippet/create",
            &[("title", "An old silent pond"), ("content", "A frog jumps in"), ("expires", "7")],
        )
        .await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let target = location(&res).context("redirect after create")?;
    assert!(target.starts_with("/snippet/"));

    let page = browser.page(&target).await?;
    assert!(page.contains("An old silent pond"));
    assert!(page.contains("Snippet successfully created!"));

    let page = browser.page("/snippets").await?;
    assert!(page.contains("An old silent pond"));
    Ok(())
}

#[tokio::test]
async fn failed_login_shows_a_generic_error() -> Result<()> {
    let fixture = ApiFixture::new().await?;
    let mut browser = Browser::new(&fixture).await?;

    let res = browser.login(ALICE_EMAIL, "not-the-password").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let page = res.text().await?;
    assert!(page.contains("Email or Password is incorrect"));
    assert!(page.contains(ALICE_EMAIL));
    Ok(())
}

#[tokio::test]
async fn login_without_a_remembered_path_lands_on_snippets() -> Result<()> {
    let fixture = ApiFixture::new().await?;
    let mut browser = Browser::new(&fixture).await?;

    let res = browser.login(ALICE_EMAIL, USER_PASSWORD).await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/snippets"));
    Ok(())
}

#[tokio::test]
async fn api_refusals_become_a_flash() -> Result<()> {
    let fixture = ApiFixture::new().await?;
    let mut browser = Browser::new(&fixture).await?;
    browser.login(ALICE_EMAIL, USER_PASSWORD).await?;

    let res = browser.get("/users").await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/"));

    let page = browser.page("/").await?;
    assert!(page.contains("Operation not allowed by this user"));

    let res = browser.get(&format!("/user/{}", fixture.bob_id)).await?;
    assert_eq!(location(&res).as_deref(), Some("/"));
    Ok(())
}

#[tokio::test]
async fn administrators_manage_users() -> Result<()> {
    let fixture = ApiFixture::new().await?;
    let mut browser = Browser::new(&fixture).await?;
    browser.login(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    let page = browser.page("/user/signup").await?;
    assert!(page.contains("(admin)"));
    assert!(page.contains(r#"value="2""#));

    let carol = [
        ("name", "Carol Danvers"),
        ("email", "carol@example.com"),
        ("password", "carol-password"),
        ("roles", "2"),
    ];
    let res = browser.post("/user/signup", &carol).await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/users"));

    let page = browser.page("/users").await?;
    assert!(page.contains("Your signup was successful."));
    assert!(page.contains("carol@example.com"));

    let res = browser.post("/user/signup", &carol).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await?.contains("Address is already in use"));

    let res = browser
        .post(
            &format!("/user/{}/reset-password", fixture.bob_id),
            &[("newPassword", "bob-reset-password"), ("newPasswordConfirmation", "bob-reset-password")],
        )
        .await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), Some(format!("/user/{}", fixture.bob_id)));

    let page = browser.page(&format!("/user/{}", fixture.bob_id)).await?;
    assert!(page.contains(&format!("Password of user #{} has been updated!", fixture.bob_id)));
    Ok(())
}

#[tokio::test]
async fn users_change_their_own_password() -> Result<()> {
    let fixture = ApiFixture::new().await?;
    let mut browser = Browser::new(&fixture).await?;
    browser.login(ALICE_EMAIL, USER_PASSWORD).await?;

    let res = browser
        .post(
            "/user/change-password",
            &[
                ("currentPassword", "not-my-password"),
                ("newPassword", "alice-new-password"),
                ("newPasswordConfirmation", "alice-new-password"),
            ],
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await?.contains("Current password is not valid"));

    let res = browser
        .post(
            "/user/change-password",
            &[
                ("currentPassword", USER_PASSWORD),
                ("newPassword", "alice-new-password"),
                ("newPasswordConfirmation", "something-else"),
            ],
        )
        .await?;
    assert!(res.text().await?.contains("Passwords do not match"));

    let res = browser
        .post(
            "/user/change-password",
            &[
                ("currentPassword", USER_PASSWORD),
                ("newPassword", "alice-new-password"),
                ("newPasswordConfirmation", "alice-new-password"),
            ],
        )
        .await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res).as_deref(), Some("/user/profile"));

    let page = browser.page("/user/profile").await?;
    assert!(page.contains("Your password has been updated!"));
    assert!(page.contains(ALICE_EMAIL));

    let res = browser.post("/user/logout", &[]).await?;
    assert_eq!(location(&res).as_deref(), Some("/"));
    let res = browser.login(ALICE_EMAIL, "alice-new-password").await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    Ok(())
}
