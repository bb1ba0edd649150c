//! Composite cache key layout.

use crate::domain::language::Language;

/// Builds `{prefix}{logical}_{language}` keys.
///
/// A [`Language`] never contains `_`, so the last `_` of a composite key
/// always separates the language and two (logical, language) pairs cannot
/// meet on one key.
///
/// The layout is fixed so entries written by one process can be found by
/// another sharing the same backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    prefix: String,
}

impl KeyScheme {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn composite(&self, logical: &str, language: &Language) -> String {
        format!("{}{}_{}", self.prefix, logical, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RecordKind;

    #[test]
    fn composite_key_layout() {
        let scheme = KeyScheme::new("qopt_");
        let en = Language::new("en").unwrap();
        let logical = RecordKind::Option.cache_key("site_title");

        assert_eq!(scheme.composite(&logical, &en), "qopt_qo_o_site_title_en");
    }

    #[test]
    fn languages_never_share_a_key() {
        let scheme = KeyScheme::new("qopt_");
        let en = Language::new("en").unwrap();
        let pt_br = Language::new("pt-BR").unwrap();

        assert_ne!(
            scheme.composite("qo_l_menu", &en),
            scheme.composite("qo_l_menu", &pt_br)
        );
        assert_eq!(scheme.composite("qo_l_menu", &pt_br), "qopt_qo_l_menu_pt-br");
    }

    #[test]
    fn underscore_in_language_cannot_shift_the_separator() {
        let scheme = KeyScheme::new("qopt_");
        let en = Language::new("en").unwrap();
        let title_en = Language::new("title_en").unwrap();

        let spoofed = scheme.composite("qo_o_site", &title_en);
        let genuine = scheme.composite("qo_o_site_title", &en);

        assert_ne!(spoofed, genuine);
        assert_eq!(genuine, "qopt_qo_o_site_title_en");
        assert_eq!(spoofed, "qopt_qo_o_site_title-en");
    }
}
