//! HTML pages: the landing view and the guarded profile view.
//!
//! Templates are compiled once at startup. Handlebars escapes every
//! interpolated value, so identity fields supplied by a provider are inert.

use axum::{extract::State, response::Html};
use handlebars::Handlebars;
use keygate_identity::Identity;
use serde_json::json;

use crate::auth::{AppState, OptionalIdentity, RequireIdentity};
use crate::error::{PageError, StartupError};

const LANDING: &str = "landing";
const PROFILE: &str = "profile";

/// Compiled page templates.
pub struct Pages {
    handlebars: Handlebars<'static>,
}

impl Pages {
    /// Compiles the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns `StartupError::Templates` if a template does not parse.
    pub fn new() -> Result<Self, StartupError> {
        let mut handlebars = Handlebars::new();

        for (name, source) in [
            (LANDING, include_str!("../templates/landing.hbs")),
            (PROFILE, include_str!("../templates/profile.hbs")),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| StartupError::Templates {
                    details: format!("{name}: {e}"),
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Renders the landing page.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if rendering fails.
    pub fn landing(
        &self,
        providers: &[&str],
        identity: Option<&Identity>,
    ) -> Result<String, PageError> {
        self.render(LANDING, &json!({ "providers": providers, "identity": identity }))
    }

    /// Renders the profile page for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `PageError` if rendering fails.
    pub fn profile(&self, identity: &Identity) -> Result<String, PageError> {
        self.render(PROFILE, identity)
    }

    fn render<T: serde::Serialize>(
        &self,
        page: &'static str,
        data: &T,
    ) -> Result<String, PageError> {
        self.handlebars.render(page, data).map_err(|e| PageError {
            page,
            details: e.to_string(),
        })
    }
}

/// `GET /`
pub async fn landing(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<Html<String>, PageError> {
    let providers = state.registry.names();
    state
        .pages
        .landing(&providers, identity.as_ref())
        .map(Html)
}

/// `GET /profile`
pub async fn profile(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Html<String>, PageError> {
    state.pages.profile(&identity).map(Html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new(
            "github".to_string(),
            "12345".to_string(),
            "gho_token".to_string(),
        )
        .with_email(Some("a@example.com".to_string()))
        .with_names(Some("Mona".to_string()), Some("Lisa".to_string()))
    }

    #[test]
    fn landing_links_every_provider() {
        let pages = Pages::new().expect("templates");
        let html = pages.landing(&["github", "oidc"], None).expect("render");

        assert!(html.contains(r#"href="/auth/github""#));
        assert!(html.contains(r#"href="/auth/oidc""#));
        assert!(!html.contains("/profile"));
    }

    #[test]
    fn landing_links_profile_when_signed_in() {
        let pages = Pages::new().expect("templates");
        let html = pages.landing(&["github"], Some(&identity())).expect("render");

        assert!(html.contains(r#"href="/profile""#));
        assert!(!html.contains(r#"href="/auth/github""#));
    }

    #[test]
    fn profile_shows_identity_fields() {
        let pages = Pages::new().expect("templates");
        let html = pages.profile(&identity()).expect("render");

        assert!(html.contains("UserID: 12345"));
        assert!(html.contains("Email: a@example.com"));
        assert!(html.contains("[Lisa, Mona]"));
        assert!(html.contains(r#"href="/logout/github""#));
    }

    #[test]
    fn profile_escapes_provider_supplied_values() {
        let pages = Pages::new().expect("templates");
        let identity = identity().with_description(Some("<script>alert(1)</script>".to_string()));

        let html = pages.profile(&identity).expect("render");

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
