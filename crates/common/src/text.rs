//! Localized display text.
//!
//! All user facing strings are plain data: a table from `(TextKey, Locale)`
//! to a display string. The table is built once and never mutated. Nynorsk
//! entries that are missing fall back to Bokmål.

use crate::error::RejectionReason;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Written language of a document or message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum Locale {
    /// Norwegian Bokmål.
    #[default]
    #[serde(rename = "nb")]
    Bokmal,
    /// Norwegian Nynorsk.
    #[serde(rename = "nn")]
    Nynorsk,
    /// English.
    #[serde(rename = "en")]
    English,
}

impl Locale {
    /// Returns the BCP 47 language tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Bokmal => "nb",
            Self::Nynorsk => "nn",
            Self::English => "en",
        }
    }

    /// Parses a BCP 47 language tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "nb" | "no" => Some(Self::Bokmal),
            "nn" => Some(Self::Nynorsk),
            "en" => Some(Self::English),
            _ => None,
        }
    }
}

/// Logical piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKey {
    /// Document title.
    DocumentTitle,
    /// Heading above the main party's details.
    MainParty,
    /// Heading above the counterparty's details.
    Counterparty,
    /// Heading above the list of children.
    Children,
    /// Label for a first name.
    FirstName,
    /// Label for a birthdate.
    Birthdate,
    /// Label for a personal identifier.
    PersonalIdentifier,
    /// Human description of a rejection.
    Rejection(RejectionReason),
}

impl RejectionReason {
    /// Human description of the reason from the built-in catalog.
    #[must_use]
    pub fn describe(self, locale: Locale) -> &'static str {
        TextCatalog::builtin().text(TextKey::Rejection(self), locale)
    }
}

/// Lookup table for display text.
#[derive(Debug)]
pub struct TextCatalog {
    entries: HashMap<(TextKey, Locale), &'static str>,
}

static BUILTIN: LazyLock<TextCatalog> = LazyLock::new(TextCatalog::build);

impl TextCatalog {
    /// Returns the built-in catalog.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Looks up text, falling back from Nynorsk to Bokmål.
    ///
    /// Every key has a Bokmål and an English entry, so the fallback chain
    /// always ends in a string.
    #[must_use]
    pub fn text(&self, key: TextKey, locale: Locale) -> &'static str {
        self.entries
            .get(&(key, locale))
            .or_else(|| self.entries.get(&(key, Locale::Bokmal)))
            .copied()
            .unwrap_or("")
    }

    fn build() -> Self {
        use Locale::{Bokmal, English, Nynorsk};
        use RejectionReason as R;
        use TextKey as K;

        let rows: &[(TextKey, Locale, &'static str)] = &[
            (K::DocumentTitle, Bokmal, "Avtale om fordeling av reisekostnader"),
            (K::DocumentTitle, Nynorsk, "Avtale om fordeling av reisekostnader"),
            (K::DocumentTitle, English, "Agreement on sharing of travel costs"),
            (K::MainParty, Bokmal, "Hovedpart"),
            (K::MainParty, English, "Main party"),
            (K::Counterparty, Bokmal, "Motpart"),
            (K::Counterparty, English, "Counterparty"),
            (K::Children, Bokmal, "Opplysninger om barnet"),
            (K::Children, Nynorsk, "Opplysningar om barnet"),
            (K::Children, English, "Details of the child"),
            (K::FirstName, Bokmal, "Navn"),
            (K::FirstName, Nynorsk, "Namn"),
            (K::FirstName, English, "Name"),
            (K::Birthdate, Bokmal, "Fødselsdato"),
            (K::Birthdate, English, "Date of birth"),
            (K::PersonalIdentifier, Bokmal, "Fødselsnummer"),
            (K::PersonalIdentifier, English, "Social security number"),
            (
                K::Rejection(R::NoFamilyRelations),
                Bokmal,
                "Fant ingen familierelasjoner for person.",
            ),
            (
                K::Rejection(R::NoFamilyRelations),
                English,
                "No family relations found for person.",
            ),
            (
                K::Rejection(R::NoRelationToCounterparty),
                Bokmal,
                "Person mangler relasjon til oppgitt motpart.",
            ),
            (
                K::Rejection(R::NoRelationToCounterparty),
                English,
                "Person has no relation to the given counterparty.",
            ),
            (
                K::Rejection(R::NoRelationToChild),
                Bokmal,
                "Person mangler relasjon til ett eller flere av de oppgitte barna.",
            ),
            (
                K::Rejection(R::NoRelationToChild),
                English,
                "Person has no relation to one or more of the given children.",
            ),
            (
                K::Rejection(R::ChildAlreadyInActiveRequest),
                Bokmal,
                "Minst ett av de oppgitte barna er tilknyttet en aktiv forespørsel.",
            ),
            (
                K::Rejection(R::ChildAlreadyInActiveRequest),
                English,
                "At least one of the given children is part of an active request.",
            ),
            (
                K::Rejection(R::NoMatchingActiveRequest),
                Bokmal,
                "Fant ingen aktive forespørsler knyttet til oppgitt motpart.",
            ),
            (
                K::Rejection(R::NoMatchingActiveRequest),
                English,
                "No active request awaiting consent from the given counterparty.",
            ),
            (
                K::Rejection(R::NotAuthorizedOrAlreadyInactive),
                Bokmal,
                "Fant ingen aktive forespørsler knyttet til oppgitt hovedpart.",
            ),
            (
                K::Rejection(R::NotAuthorizedOrAlreadyInactive),
                English,
                "No active request owned by the given main party.",
            ),
            (
                K::Rejection(R::RequestNotInEffect),
                Bokmal,
                "Forespørselen er ikke gjeldende.",
            ),
            (
                K::Rejection(R::RequestNotInEffect),
                English,
                "The request is not in effect.",
            ),
        ];

        let entries = rows
            .iter()
            .map(|&(key, locale, text)| ((key, locale), text))
            .collect();

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("nn"), Some(Locale::Nynorsk));
        assert_eq!(Locale::from_tag("en"), Some(Locale::English));
        assert_eq!(Locale::from_tag("de"), None);
    }

    #[test]
    fn test_nynorsk_falls_back_to_bokmal() {
        let catalog = TextCatalog::builtin();
        assert_eq!(catalog.text(TextKey::FirstName, Locale::Nynorsk), "Namn");
        assert_eq!(catalog.text(TextKey::Birthdate, Locale::Nynorsk), "Fødselsdato");
    }

    #[test]
    fn test_describe_rejection() {
        assert_eq!(
            RejectionReason::RequestNotInEffect.describe(Locale::English),
            "The request is not in effect."
        );
        assert_eq!(
            RejectionReason::RequestNotInEffect.describe(Locale::Nynorsk),
            "Forespørselen er ikke gjeldende."
        );
    }

    #[test]
    fn test_every_rejection_has_text_in_each_locale() {
        let reasons = [
            RejectionReason::NoFamilyRelations,
            RejectionReason::NoRelationToCounterparty,
            RejectionReason::NoRelationToChild,
            RejectionReason::ChildAlreadyInActiveRequest,
            RejectionReason::NoMatchingActiveRequest,
            RejectionReason::NotAuthorizedOrAlreadyInactive,
            RejectionReason::RequestNotInEffect,
        ];

        for reason in reasons {
            for locale in [Locale::Bokmal, Locale::Nynorsk, Locale::English] {
                assert!(
                    !reason.describe(locale).is_empty(),
                    "missing text for {reason} in {}",
                    locale.tag()
                );
            }
        }
    }
}
