//! Page handlers. Data comes from the API; the caller's token is relayed on
//! every call that needs one.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;

use super::auth::{Authenticated, PageContext, SessionToken};
use super::client::ClientError;
use super::error::WebError;
use super::render;
use super::session::{Session, KEY_REDIRECT_PATH, KEY_TOKEN};
use super::WebState;
use crate::models::{ChangeUserPassword, CreateUser, SnippetCreate, Validate, Violations, PASSWORD_MIN};

pub const FLASH_NOT_ALLOWED: &str = "Operation not allowed by this user";

/// Old password sent with an administrator reset; the API ignores it but the
/// payload still has to pass validation.
const RESET_PLACEHOLDER_PASSWORD: &str = "0123498765";

type PageResult = Result<Response, WebError>;

fn see_other(path: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, path)]).into_response()
}

fn page(html: String) -> PageResult {
    Ok(Html(html).into_response())
}

/// Turns an API refusal into a flash and a trip home; other failures become
/// error pages.
async fn refused(session: &Session, err: ClientError) -> PageResult {
    if err.is_not_allowed() {
        tracing::info!("api refused relayed call: {}", err);
        session.flash(FLASH_NOT_ALLOWED).await?;
        return Ok(see_other("/"));
    }
    Err(err.into())
}

/// Route ids are positive integers; anything else is a missing page.
fn parse_id(raw: &str) -> Result<i64, WebError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| WebError::NotFound("Not Found".to_string()))
}

pub async fn ping() -> &'static str {
    "OK"
}

pub async fn home(session: Session, current: Option<Authenticated>) -> PageResult {
    let ctx = PageContext::load(&session, current.as_ref()).await?;
    page(render::home(&ctx))
}

pub async fn about(session: Session, current: Option<Authenticated>) -> PageResult {
    let ctx = PageContext::load(&session, current.as_ref()).await?;
    page(render::about(&ctx))
}

pub async fn list_snippets(
    State(state): State<WebState>,
    session: Session,
    current: Option<Authenticated>,
) -> PageResult {
    let snippets = state.api.latest_snippets().await?;
    let ctx = PageContext::load(&session, current.as_ref()).await?;
    page(render::snippets(&ctx, &snippets))
}

pub async fn show_snippet(
    State(state): State<WebState>,
    session: Session,
    current: Option<Authenticated>,
    Path(id): Path<String>,
) -> PageResult {
    let id = parse_id(&id)?;
    let snippet = state.api.snippet(id).await?;
    let ctx = PageContext::load(&session, current.as_ref()).await?;
    page(render::snippet(&ctx, &snippet))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SnippetForm {
    pub title: String,
    pub content: String,
    pub expires: String,
}

pub async fn create_snippet_form(session: Session, current: Authenticated) -> PageResult {
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::create_snippet(&ctx, "", "", "365", &Violations::new()))
}

pub async fn create_snippet(
    State(state): State<WebState>,
    session: Session,
    current: Authenticated,
    Form(form): Form<SnippetForm>,
) -> PageResult {
    let snippet = SnippetCreate {
        title: form.title,
        content: form.content,
        expires: form.expires,
    };

    let violations = snippet.validate();
    if !violations.is_empty() {
        let ctx = PageContext::load(&session, Some(&current)).await?;
        return page(render::create_snippet(
            &ctx,
            &snippet.title,
            &snippet.content,
            &snippet.expires,
            &violations,
        ));
    }

    let Authenticated(stored) = &current;
    match state.api.create_snippet(&stored.token, &snippet).await {
        Ok(created) => {
            session.flash("Snippet successfully created!").await?;
            Ok(see_other(&format!("/snippet/{}", created.id)))
        }
        Err(e) => refused(&session, e).await,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login_form(session: Session, current: Option<Authenticated>) -> PageResult {
    let ctx = PageContext::load(&session, current.as_ref()).await?;
    page(render::login(&ctx, "", &Violations::new()))
}

pub async fn login(
    State(state): State<WebState>,
    session: Session,
    current: Option<Authenticated>,
    Form(form): Form<LoginForm>,
) -> PageResult {
    let token = match state.api.login(&form.email, &form.password).await {
        Ok(token) => token,
        Err(ClientError::InvalidCredentials) => {
            let mut violations = Violations::new();
            violations.add("generic", "Email or Password is incorrect");
            let ctx = PageContext::load(&session, current.as_ref()).await?;
            return page(render::login(&ctx, &form.email, &violations));
        }
        Err(e) => return Err(e.into()),
    };

    let stored = SessionToken::from_token(token)
        .map_err(|e| WebError::internal(format!("api returned an unreadable token: {}", e)))?;
    tracing::info!("user {} logged in", stored.user.id);

    session.renew().await;
    session.put(KEY_TOKEN, &stored).await?;
    session.flash("You've been logged in successfully!").await?;

    let target = session
        .pop::<String>(KEY_REDIRECT_PATH)
        .await?
        .filter(|path| path.starts_with('/'))
        .unwrap_or_else(|| "/snippets".to_string());
    Ok(see_other(&target))
}

pub async fn logout(session: Session, Authenticated(stored): Authenticated) -> PageResult {
    session.remove(KEY_TOKEN).await;
    tracing::info!("user {} logged out", stored.user.id);
    session.flash("You've been logged out successfully!").await?;
    Ok(see_other("/"))
}

pub async fn list_users(State(state): State<WebState>, session: Session, current: Authenticated) -> PageResult {
    let users = match state.api.users(&current.0.token).await {
        Ok(users) => users,
        Err(e) => return refused(&session, e).await,
    };
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::users(&ctx, &users, current.0.user.id))
}

pub async fn show_user(
    State(state): State<WebState>,
    session: Session,
    current: Authenticated,
    Path(id): Path<String>,
) -> PageResult {
    let id = parse_id(&id)?;
    let user = match state.api.user(&current.0.token, id).await {
        Ok(user) => user,
        Err(e) => return refused(&session, e).await,
    };
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::user(&ctx, &user))
}

pub async fn profile(State(state): State<WebState>, session: Session, current: Authenticated) -> PageResult {
    let Authenticated(stored) = &current;
    let user = match state.api.user(&stored.token, stored.user.id).await {
        Ok(user) => user,
        Err(e) => return refused(&session, e).await,
    };
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::profile(&ctx, &user))
}

/// Signup fields arrive as url-encoded pairs because `roles` repeats once per
/// checked box.
#[derive(Debug, Default)]
struct SignupForm {
    name: String,
    email: String,
    password: String,
    roles: Vec<i64>,
}

impl SignupForm {
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, WebError> {
        let mut form = SignupForm::default();
        for (key, value) in pairs {
            match key.as_str() {
                "name" => form.name = value,
                "email" => form.email = value,
                "password" => form.password = value,
                "roles" => form.roles.push(
                    value
                        .parse()
                        .map_err(|_| WebError::BadRequest(format!("invalid role id {:?}", value)))?,
                ),
                _ => {}
            }
        }
        Ok(form)
    }
}

pub async fn signup_form(State(state): State<WebState>, session: Session, current: Authenticated) -> PageResult {
    let roles = match state.api.role_types(&current.0.token).await {
        Ok(roles) => roles,
        Err(e) => return refused(&session, e).await,
    };
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::signup(&ctx, "", "", &roles, &Violations::new()))
}

pub async fn signup(
    State(state): State<WebState>,
    session: Session,
    current: Authenticated,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let form = SignupForm::from_pairs(pairs)?;
    let user = CreateUser {
        name: form.name,
        email: form.email,
        password: form.password,
        roles: form.roles,
    };

    let mut violations = user.validate();
    if violations.is_empty() {
        match state.api.create_user(&current.0.token, &user).await {
            Ok(()) => {
                session.flash("Your signup was successful.").await?;
                return Ok(see_other("/users"));
            }
            Err(ClientError::DuplicateEmail) => violations.add("email", "Address is already in use"),
            Err(e) => return refused(&session, e).await,
        }
    }

    let roles = match state.api.role_types(&current.0.token).await {
        Ok(roles) => roles,
        Err(e) => return refused(&session, e).await,
    };
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::signup(&ctx, &user.name, &user.email, &roles, &violations))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

impl PasswordForm {
    fn validate(&self, needs_current: bool) -> Violations {
        let mut v = Violations::new();
        if needs_current {
            v.required("currentPassword", &self.current_password);
        }
        v.required("newPassword", &self.new_password)
            .min_len("newPassword", &self.new_password, PASSWORD_MIN);
        v.required("newPasswordConfirmation", &self.new_password_confirmation);
        if self.new_password != self.new_password_confirmation {
            v.add("newPasswordConfirmation", "Passwords do not match");
        }
        v
    }
}

pub async fn change_password_form(session: Session, current: Authenticated) -> PageResult {
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::change_password(&ctx, &Violations::new()))
}

pub async fn change_password(
    State(state): State<WebState>,
    session: Session,
    current: Authenticated,
    Form(form): Form<PasswordForm>,
) -> PageResult {
    let mut violations = form.validate(true);
    if violations.is_empty() {
        let change = ChangeUserPassword {
            old_password: form.current_password,
            new_password: form.new_password,
        };
        let Authenticated(stored) = &current;
        match state.api.change_password(&stored.token, stored.user.id, &change).await {
            Ok(()) => {
                session.flash("Your password has been updated!").await?;
                return Ok(see_other("/user/profile"));
            }
            Err(ClientError::InvalidCredentials) => violations.add("currentPassword", "Current password is not valid"),
            Err(ClientError::Validation(messages)) => {
                tracing::debug!("password change rejected: {:?}", messages);
                violations.add("generic", "bad request invalid data provided");
            }
            Err(e) => return refused(&session, e).await,
        }
    }

    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::change_password(&ctx, &violations))
}

pub async fn reset_password_form(session: Session, current: Authenticated, Path(id): Path<String>) -> PageResult {
    let id = parse_id(&id)?;
    let ctx = PageContext::load(&session, Some(&current)).await?;
    page(render::reset_password(&ctx, id, &Violations::new()))
}

pub async fn reset_password(
    State(state): State<WebState>,
    session: Session,
    current: Authenticated,
    Path(id): Path<String>,
    Form(form): Form<PasswordForm>,
) -> PageResult {
    let id = parse_id(&id)?;

    let violations = form.validate(false);
    if !violations.is_empty() {
        let ctx = PageContext::load(&session, Some(&current)).await?;
        return page(render::reset_password(&ctx, id, &violations));
    }

    let change = ChangeUserPassword {
        old_password: RESET_PLACEHOLDER_PASSWORD.to_string(),
        new_password: form.new_password,
    };
    match state.api.change_password(&current.0.token, id, &change).await {
        Ok(()) => {
            session
                .flash(&format!("Password of user #{} has been updated!", id))
                .await?;
            Ok(see_other(&format!("/user/{}", id)))
        }
        // Resetting one's own account goes through the old password check,
        // which the placeholder fails.
        Err(ClientError::InvalidCredentials) | Err(ClientError::Validation(_)) => {
            session.flash(FLASH_NOT_ALLOWED).await?;
            Ok(see_other("/"))
        }
        Err(e) => refused(&session, e).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("7").unwrap(), 7);
        assert!(matches!(parse_id("0"), Err(WebError::NotFound(_))));
        assert!(matches!(parse_id("-3"), Err(WebError::NotFound(_))));
        assert!(matches!(parse_id("abc"), Err(WebError::NotFound(_))));
    }

    #[test]
    fn signup_collects_repeated_roles() {
        let pairs = vec![
            ("name".to_string(), "Alice Liddell".to_string()),
            ("roles".to_string(), "1".to_string()),
            ("roles".to_string(), "2".to_string()),
        ];
        let form = SignupForm::from_pairs(pairs).unwrap();
        assert_eq!(form.name, "Alice Liddell");
        assert_eq!(form.roles, vec![1, 2]);

        let bad = vec![("roles".to_string(), "admin".to_string())];
        assert!(matches!(SignupForm::from_pairs(bad), Err(WebError::BadRequest(_))));
    }

    #[test]
    fn password_confirmation_must_match() {
        let form = PasswordForm {
            current_password: "old password".into(),
            new_password: "a new password".into(),
            new_password_confirmation: "another password".into(),
        };
        let v = form.validate(true);
        assert_eq!(v.get("newPasswordConfirmation"), Some("Passwords do not match"));
        assert!(v.get("currentPassword").is_none());

        let v = PasswordForm::default().validate(false);
        assert!(v.get("currentPassword").is_none());
        assert_eq!(v.get("newPassword"), Some("This field cannot be blank"));
    }
}
