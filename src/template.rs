use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::CbioError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$(?:(?P<escaped>\$)|(?P<named>[_a-z][_a-z0-9]*)|\{(?P<braced>[_a-z][_a-z0-9]*)\}|(?P<invalid>))")
        .expect("valid placeholder regex")
});

/// Meta and case-list templates shipped with the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaTemplate {
    MetaStudy,
    MetaCnaSeg,
    MetaSamples,
    CasesAll,
}

impl MetaTemplate {
    pub const ALL: [MetaTemplate; 4] = [
        MetaTemplate::MetaStudy,
        MetaTemplate::MetaCnaSeg,
        MetaTemplate::MetaSamples,
        MetaTemplate::CasesAll,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            MetaTemplate::MetaStudy => "meta_study.txt",
            MetaTemplate::MetaCnaSeg => "meta_cna_seg.txt",
            MetaTemplate::MetaSamples => "meta_samples.txt",
            MetaTemplate::CasesAll => "cases_all.txt",
        }
    }

    pub fn template(&self) -> Template<'static> {
        Template::new(match self {
            MetaTemplate::MetaStudy => include_str!("../templates/meta_study.txt"),
            MetaTemplate::MetaCnaSeg => include_str!("../templates/meta_cna_seg.txt"),
            MetaTemplate::MetaSamples => include_str!("../templates/meta_samples.txt"),
            MetaTemplate::CasesAll => include_str!("../templates/cases_all.txt"),
        })
    }
}

/// `$name` / `${name}` substitution; `$$` is a literal dollar sign.
#[derive(Debug, Clone, Copy)]
pub struct Template<'a> {
    text: &'a str,
}

impl<'a> Template<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    pub fn substitute(&self, values: &BTreeMap<&str, String>) -> Result<String, CbioError> {
        let mut failure = None;
        let rendered = PLACEHOLDER.replace_all(self.text, |caps: &Captures<'_>| {
            if caps.name("escaped").is_some() {
                return "$".to_string();
            }
            let Some(name) = caps.name("named").or_else(|| caps.name("braced")) else {
                failure.get_or_insert(CbioError::InvalidPlaceholder(
                    caps.get(0).map(|m| m.start()).unwrap_or_default(),
                ));
                return String::new();
            };
            match values.get(name.as_str()) {
                Some(value) => value.clone(),
                None => {
                    failure.get_or_insert(CbioError::MissingPlaceholder(name.as_str().to_string()));
                    String::new()
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(rendered.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_both_placeholder_forms() {
        let out = Template::new("id: $id\nfile: ${name}.txt\n")
            .substitute(&values(&[("id", "brca"), ("name", "data")]))
            .unwrap();
        assert_eq!(out, "id: brca\nfile: data.txt\n");
    }

    #[test]
    fn escaped_dollar_is_literal() {
        let out = Template::new("cost: $$5")
            .substitute(&BTreeMap::new())
            .unwrap();
        assert_eq!(out, "cost: $5");
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = Template::new("a: $a\nb: $b\n")
            .substitute(&values(&[("a", "1")]))
            .unwrap_err();
        assert_matches!(err, CbioError::MissingPlaceholder(ref name) if name == "b");
    }

    #[test]
    fn lone_dollar_is_invalid() {
        let err = Template::new("price: $ 5")
            .substitute(&BTreeMap::new())
            .unwrap_err();
        assert_matches!(err, CbioError::InvalidPlaceholder(7));
    }

    #[test]
    fn shipped_templates_only_use_known_fields() {
        let study = MetaTemplate::MetaStudy.template().substitute(&values(&[
            ("type_of_cancer", "brca"),
            ("cancer_study_identifier", "brca_test"),
            ("name", "Test"),
            ("description", "d"),
            ("citation", ""),
            ("pmid", ""),
            ("groups", ""),
            ("short_name", ""),
            ("add_global_case_list", "true"),
        ]));
        assert!(study.is_ok());
    }
}
