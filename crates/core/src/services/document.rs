//! Confirmation document rendering.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use travel_cost_common::{AppResult, Locale, TextCatalog, TextKey};

use crate::services::person_directory::PersonInfo;

/// Resolved data of one person on a confirmation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPerson {
    pub ident: String,
    pub first_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

impl From<PersonInfo> for DocumentPerson {
    fn from(info: PersonInfo) -> Self {
        Self {
            ident: info.ident,
            first_name: info.first_name,
            birthdate: info.birthdate,
        }
    }
}

/// Everything needed to render the confirmation of an in-effect request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationDocument {
    pub request_id: i32,
    #[serde(skip)]
    pub locale: Locale,
    pub main_party: DocumentPerson,
    pub counterparty: DocumentPerson,
    pub children: Vec<DocumentPerson>,
}

/// Turns a confirmation document into bytes.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render the document.
    async fn render(&self, document: &ConfirmationDocument) -> AppResult<Vec<u8>>;
}

/// Renders a UTF-8 HTML page.
#[derive(Debug, Clone, Copy)]
pub struct HtmlDocumentRenderer {
    catalog: &'static TextCatalog,
}

impl Default for HtmlDocumentRenderer {
    fn default() -> Self {
        Self::new(TextCatalog::builtin())
    }
}

impl HtmlDocumentRenderer {
    /// Create a renderer reading labels from `catalog`.
    #[must_use]
    pub const fn new(catalog: &'static TextCatalog) -> Self {
        Self { catalog }
    }

    fn person_section(&self, heading: TextKey, person: &DocumentPerson, locale: Locale) -> String {
        format!(
            "<section><h2>{}</h2>{}</section>",
            html_escape(self.catalog.text(heading, locale)),
            self.person_fields(person, locale)
        )
    }

    fn person_fields(&self, person: &DocumentPerson, locale: Locale) -> String {
        format!(
            "<dl>{}<dt>{}</dt><dd>{}</dd></dl>",
            self.name_and_birthdate(person, locale),
            html_escape(self.catalog.text(TextKey::PersonalIdentifier, locale)),
            html_escape(&person.ident),
        )
    }

    /// Children are listed without their personal identifier.
    fn child_fields(&self, child: &DocumentPerson, locale: Locale) -> String {
        format!("<dl>{}</dl>", self.name_and_birthdate(child, locale))
    }

    fn name_and_birthdate(&self, person: &DocumentPerson, locale: Locale) -> String {
        let label = |key| html_escape(self.catalog.text(key, locale));
        format!(
            "<dt>{}</dt><dd>{}</dd><dt>{}</dt><dd>{}</dd>",
            label(TextKey::FirstName),
            html_escape(person.first_name.as_deref().unwrap_or("")),
            label(TextKey::Birthdate),
            person.birthdate.map(format_date).unwrap_or_default(),
        )
    }

    /// Build the HTML text.
    #[must_use]
    pub fn to_html(&self, document: &ConfirmationDocument) -> String {
        let locale = document.locale;
        let title = html_escape(self.catalog.text(TextKey::DocumentTitle, locale));

        let children: String = document
            .children
            .iter()
            .map(|c| format!("<li>{}</li>", self.child_fields(c, locale)))
            .collect();

        format!(
            "<!DOCTYPE html><html lang=\"{}\"><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><h1>{title}</h1>{}{}<section><h2>{}</h2><ul>{children}</ul></section></body></html>",
            locale.tag(),
            self.person_section(TextKey::MainParty, &document.main_party, locale),
            self.person_section(TextKey::Counterparty, &document.counterparty, locale),
            html_escape(self.catalog.text(TextKey::Children, locale)),
        )
    }
}

#[async_trait]
impl DocumentRenderer for HtmlDocumentRenderer {
    async fn render(&self, document: &ConfirmationDocument) -> AppResult<Vec<u8>> {
        Ok(self.to_html(document).into_bytes())
    }
}

/// Format a date as `dd.MM.yyyy`.
fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
