#![allow(clippy::needless_for_each)]

use super::handlers::{
    external::{__path_begin, __path_callback},
    health::{self, __path_health},
    local::{self, __path_login, __path_login_page, __path_register, __path_register_page},
    pages::__path_home,
    secrets::{self, __path_list, __path_submit, __path_submit_page},
    session::__path_logout,
};
use utoipa::{
    openapi::{Contact, InfoBuilder, License, OpenApiBuilder},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        home,
        register_page,
        register,
        login_page,
        login,
        list,
        submit_page,
        submit,
        logout,
        begin,
        callback,
        health
    ),
    components(schemas(
        health::Health,
        local::CredentialsForm,
        secrets::SecretForm
    )),
    tags(
        (name = "secrets", description = "Share one anonymous secret per account"),
        (name = "auth", description = "Registration, login and federated sign-in"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// `OpenAPI` document of the HTTP surface, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_openapi().info;
    doc
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => {
            let name = name.trim();
            let email = email.trim_end_matches('>').trim();
            (
                (!name.is_empty()).then_some(name),
                (!email.is_empty()).then_some(email),
            )
        }
        None => {
            let name = author.trim();
            ((!name.is_empty()).then_some(name), None)
        }
    }
}
