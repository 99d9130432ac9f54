//! HTML pages.
//!
//! Pages are plain strings; every value that came from a visitor goes through
//! [`escape_html`].

use axum::response::Html;

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn home(federated: bool) -> Html<String> {
    let mut body = String::from(
        "<h1>Secrets</h1>\n<p>Don't keep your secrets, share them anonymously!</p>\n\
         <a href=\"/register\">Register</a>\n<a href=\"/login\">Login</a>",
    );
    if federated {
        body.push_str("\n<a href=\"/auth/external\">Sign in with Google</a>");
    }
    layout("Secrets", &body)
}

fn credentials_form(action: &str, submit: &str) -> String {
    format!(
        "<form action=\"{action}\" method=\"POST\">\n\
         <label for=\"username\">Email</label>\n\
         <input type=\"text\" id=\"username\" name=\"username\" autocomplete=\"username\" required>\n\
         <label for=\"password\">Password</label>\n\
         <input type=\"password\" id=\"password\" name=\"password\" required>\n\
         <button type=\"submit\">{submit}</button>\n</form>"
    )
}

pub(crate) fn register(federated: bool) -> Html<String> {
    let mut body = format!(
        "<h1>Register</h1>\n{}",
        credentials_form("/register", "Register")
    );
    if federated {
        body.push_str("\n<a href=\"/auth/external\">Sign up with Google</a>");
    }
    layout("Register", &body)
}

/// Same banner for every login failure; the page never says which part was wrong.
pub(crate) fn login(failed: bool, federated: bool) -> Html<String> {
    let mut body = String::from("<h1>Login</h1>\n");
    if failed {
        body.push_str("<p role=\"alert\">Invalid username or password.</p>\n");
    }
    body.push_str(&credentials_form("/login", "Login"));
    if federated {
        body.push_str("\n<a href=\"/auth/external\">Sign in with Google</a>");
    }
    layout("Login", &body)
}

pub(crate) fn secrets<'a>(secrets: impl IntoIterator<Item = &'a str>) -> Html<String> {
    let mut body = String::from("<h1>You've discovered my secret!</h1>\n");
    for secret in secrets {
        body.push_str("<p class=\"secret-text\">");
        body.push_str(&escape_html(secret));
        body.push_str("</p>\n");
    }
    body.push_str("<a href=\"/logout\">Log out</a>\n<a href=\"/submit\">Submit a secret</a>");
    layout("Secrets", &body)
}

pub(crate) fn submit() -> Html<String> {
    layout(
        "Submit",
        "<h1>Secrets</h1>\n<p>Don't keep your secrets, share them anonymously!</p>\n\
         <form action=\"/submit\" method=\"POST\">\n\
         <input type=\"text\" name=\"secret\" placeholder=\"What's your secret?\" required>\n\
         <button type=\"submit\">Submit</button>\n</form>",
    )
}

pub(crate) fn error() -> Html<String> {
    layout(
        "Error",
        "<h1>Something went wrong</h1>\n<p>Please try again later.</p>\n<a href=\"/\">Home</a>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn secrets_page_escapes_each_entry() {
        let Html(page) = secrets(["<b>bold</b>", "fine"]);
        assert!(page.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(page.contains("<p class=\"secret-text\">fine</p>"));
        assert!(!page.contains("<b>bold</b>"));
    }

    #[test]
    fn login_banner_only_on_failure() {
        let Html(clean) = login(false, false);
        let Html(failed) = login(true, false);
        assert!(!clean.contains("role=\"alert\""));
        assert!(failed.contains("Invalid username or password."));
    }

    #[test]
    fn federated_link_depends_on_provider() {
        let Html(with) = home(true);
        let Html(without) = home(false);
        assert!(with.contains("/auth/external"));
        assert!(!without.contains("/auth/external"));
    }
}
