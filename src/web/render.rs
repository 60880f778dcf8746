//! Minimal HTML pages for the web tier.

use std::fmt::Write as _;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use super::auth::PageContext;
use crate::models::{RoleType, Snippet, User, Violations, EXPIRY_OPTIONS};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn human_date(at: &DateTime<Utc>) -> String {
    at.format("%d %b %Y at %H:%M").to_string()
}

fn layout(ctx: &PageContext, title: &str, body: &str) -> String {
    let mut nav = String::from(r#"<a href="/">Home</a> <a href="/snippets">Snippets</a>"#);
    match &ctx.user {
        Some(user) => {
            nav.push_str(r#" <a href="/snippet/create">Create snippet</a> <a href="/user/profile">Profile</a>"#);
            if ctx.is_admin() {
                nav.push_str(r#" <a href="/users">Users</a> <a href="/user/signup">Signup user</a>"#);
            }
            let _ = write!(
                nav,
                r#" <span class="user">Logged in as {}{}</span> <form action="/user/logout" method="POST"><button>Logout</button></form>"#,
                escape(&user.name),
                if ctx.is_admin() { " (admin)" } else { "" }
            );
        }
        None => nav.push_str(r#" <a href="/user/login">Login</a>"#),
    }

    let flash = ctx
        .flash
        .as_deref()
        .map(|f| format!(r#"<div class="flash">{}</div>"#, escape(f)))
        .unwrap_or_default();

    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title} - Snippets</title></head>\
         <body><header><h1><a href=\"/\">Snippets</a></h1><nav>{nav}</nav></header>\
         <main>{flash}{body}</main></body></html>",
        title = escape(title),
        nav = nav,
        flash = flash,
        body = body
    )
}

fn field_error(violations: &Violations, field: &str) -> String {
    violations
        .get(field)
        .map(|e| format!(r#"<label class="error">{}</label>"#, escape(e)))
        .unwrap_or_default()
}

fn snippet_table(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return "<p>There's nothing to see here... yet!</p>".to_string();
    }
    let mut rows = String::new();
    for s in snippets {
        let _ = write!(
            rows,
            r#"<tr><td><a href="/snippet/{id}">{title}</a></td><td>{created}</td><td>#{id}</td></tr>"#,
            id = s.id,
            title = escape(&s.title),
            created = human_date(&s.created)
        );
    }
    format!("<table><tr><th>Title</th><th>Created</th><th>ID</th></tr>{}</table>", rows)
}

pub fn error_page(status: StatusCode, text: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{code}</title></head>\
         <body><h1>{code}</h1><p>{text}</p></body></html>",
        code = status.as_u16(),
        text = escape(text)
    )
}

pub fn home(ctx: &PageContext) -> String {
    let body = if ctx.is_authenticated() {
        r#"<h2>Welcome back</h2><p>Browse the <a href="/snippets">latest snippets</a> or <a href="/snippet/create">create one</a>.</p>"#
    } else {
        r#"<h2>Welcome</h2><p>Browse the <a href="/snippets">latest snippets</a> or <a href="/user/login">log in</a> to share your own.</p>"#
    };
    layout(ctx, "Home", body)
}

pub fn about(ctx: &PageContext) -> String {
    layout(
        ctx,
        "About",
        "<h2>About</h2><p>Share short-lived text snippets. Snippets expire after a day, a week or a year.</p>",
    )
}

pub fn snippets(ctx: &PageContext, snippets: &[Snippet]) -> String {
    layout(ctx, "Snippets", &format!("<h2>Snippets</h2>{}", snippet_table(snippets)))
}

pub fn snippet(ctx: &PageContext, snippet: &Snippet) -> String {
    let body = format!(
        r#"<div class="snippet"><div class="metadata"><strong>{title}</strong><span>#{id}</span></div><pre><code>{content}</code></pre><div class="metadata"><time>Created: {created}</time><time>Expires: {expires}</time></div></div>"#,
        title = escape(&snippet.title),
        id = snippet.id,
        content = escape(&snippet.content),
        created = human_date(&snippet.created),
        expires = human_date(&snippet.expires)
    );
    layout(ctx, &format!("Snippet #{}", snippet.id), &body)
}

pub fn create_snippet(ctx: &PageContext, title: &str, content: &str, expires: &str, violations: &Violations) -> String {
    let expires = if expires.is_empty() { "365" } else { expires };
    let mut options = String::new();
    for days in EXPIRY_OPTIONS {
        let label = match days {
            "365" => "One Year",
            "7" => "One Week",
            _ => "One Day",
        };
        let _ = write!(
            options,
            r#"<input type="radio" name="expires" value="{days}"{checked}> {label} "#,
            days = days,
            checked = if days == expires { " checked" } else { "" },
            label = label
        );
    }

    let body = format!(
        r#"<form action="/snippet/create" method="POST">
<div><label>Title:</label>{title_error}<input type="text" name="title" value="{title}"></div>
<div><label>Content:</label>{content_error}<textarea name="content">{content}</textarea></div>
<div><label>Delete in:</label>{expires_error}{options}</div>
<div><input type="submit" value="Publish snippet"></div>
</form>"#,
        title_error = field_error(violations, "title"),
        title = escape(title),
        content_error = field_error(violations, "content"),
        content = escape(content),
        expires_error = field_error(violations, "expires"),
        options = options
    );
    layout(ctx, "Create a New Snippet", &body)
}

pub fn login(ctx: &PageContext, email: &str, violations: &Violations) -> String {
    let generic = violations
        .get("generic")
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<form action="/user/login" method="POST" novalidate>{generic}
<div><label>Email:</label><input type="email" name="email" value="{email}"></div>
<div><label>Password:</label><input type="password" name="password"></div>
<div><input type="submit" value="Login"></div>
</form>"#,
        generic = generic,
        email = escape(email)
    );
    layout(ctx, "Login", &body)
}

pub fn signup(ctx: &PageContext, name: &str, email: &str, roles: &[RoleType], violations: &Violations) -> String {
    let mut role_inputs = String::new();
    for role in roles {
        let _ = write!(
            role_inputs,
            r#"<input type="checkbox" name="roles" value="{}"> {} "#,
            role.id,
            escape(&role.role)
        );
    }
    let body = format!(
        r#"<form action="/user/signup" method="POST" novalidate>
<div><label>Name:</label>{name_error}<input type="text" name="name" value="{name}"></div>
<div><label>Email:</label>{email_error}<input type="email" name="email" value="{email}"></div>
<div><label>Password:</label>{password_error}<input type="password" name="password"></div>
<div><label>Roles:</label>{roles}</div>
<div><input type="submit" value="Signup"></div>
</form>"#,
        name_error = field_error(violations, "name"),
        name = escape(name),
        email_error = field_error(violations, "email"),
        email = escape(email),
        password_error = field_error(violations, "password"),
        roles = role_inputs
    );
    layout(ctx, "Signup", &body)
}

pub fn users(ctx: &PageContext, users: &[User], current_id: i64) -> String {
    let mut rows = String::new();
    for u in users {
        let marker = if u.id == current_id { " (you)" } else { "" };
        let _ = write!(
            rows,
            r#"<tr><td><a href="/user/{id}">{name}</a>{marker}</td><td>{email}</td><td>{roles}</td><td>{active}</td><td>#{id}</td></tr>"#,
            id = u.id,
            name = escape(&u.name),
            marker = marker,
            email = escape(&u.email),
            roles = escape(&u.roles.join(", ")),
            active = if u.active { "yes" } else { "no" }
        );
    }
    let body = format!(
        "<h2>Users</h2><table><tr><th>Name</th><th>Email</th><th>Roles</th><th>Active</th><th>ID</th></tr>{}</table>",
        rows
    );
    layout(ctx, "Users", &body)
}

fn user_details(user: &User) -> String {
    format!(
        "<table><tr><th>Name</th><td>{name}</td></tr><tr><th>Email</th><td>{email}</td></tr>\
         <tr><th>Roles</th><td>{roles}</td></tr><tr><th>Joined</th><td>{joined}</td></tr></table>",
        name = escape(&user.name),
        email = escape(&user.email),
        roles = escape(&user.roles.join(", ")),
        joined = human_date(&user.created)
    )
}

pub fn user(ctx: &PageContext, user: &User) -> String {
    let mut body = format!("<h2>User #{}</h2>{}", user.id, user_details(user));
    if ctx.is_admin() {
        let _ = write!(body, r#"<p><a href="/user/{}/reset-password">Reset password</a></p>"#, user.id);
    }
    layout(ctx, &format!("User #{}", user.id), &body)
}

pub fn profile(ctx: &PageContext, user: &User) -> String {
    let body = format!(
        r#"<h2>Your Profile</h2>{}<p><a href="/user/change-password">Change password</a></p>"#,
        user_details(user)
    );
    layout(ctx, "Profile", &body)
}

pub fn change_password(ctx: &PageContext, violations: &Violations) -> String {
    let generic = violations
        .get("generic")
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h2>Change Password</h2><form action="/user/change-password" method="POST" novalidate>{generic}
<div><label>Current password:</label>{current}<input type="password" name="currentPassword"></div>
<div><label>New password:</label>{new}<input type="password" name="newPassword"></div>
<div><label>Confirm new password:</label>{confirm}<input type="password" name="newPasswordConfirmation"></div>
<div><input type="submit" value="Change password"></div>
</form>"#,
        generic = generic,
        current = field_error(violations, "currentPassword"),
        new = field_error(violations, "newPassword"),
        confirm = field_error(violations, "newPasswordConfirmation")
    );
    layout(ctx, "Change Password", &body)
}

pub fn reset_password(ctx: &PageContext, id: i64, violations: &Violations) -> String {
    let body = format!(
        r#"<h2>Reset Password of User #{id}</h2><form action="/user/{id}/reset-password" method="POST" novalidate>
<div><label>New password:</label>{new}<input type="password" name="newPassword"></div>
<div><label>Confirm new password:</label>{confirm}<input type="password" name="newPasswordConfirmation"></div>
<div><input type="submit" value="Reset password"></div>
</form>"#,
        id = id,
        new = field_error(violations, "newPassword"),
        confirm = field_error(violations, "newPasswordConfirmation")
    );
    layout(ctx, "Reset Password", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionUser;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"x" & 'y'</b>"#), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn layout_shows_flash_and_login_state() {
        let anonymous = PageContext {
            flash: Some("Hello <there>".into()),
            user: None,
        };
        let page = about(&anonymous);
        assert!(page.contains("Hello &lt;there&gt;"));
        assert!(page.contains(r#"href="/user/login""#));

        let admin = PageContext {
            flash: None,
            user: Some(SessionUser {
                id: 1,
                name: "Root".into(),
                roles: ["administrator".to_string()].into_iter().collect(),
            }),
        };
        let page = about(&admin);
        assert!(page.contains("Logged in as Root (admin)"));
        assert!(page.contains(r#"href="/users""#));
    }
}
