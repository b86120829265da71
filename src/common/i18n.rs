// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

const DEFAULT_LANG: &str = "en";

// Catálogos embutidos no binário (locales/*.json)
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

#[derive(Clone, Debug)]
pub struct I18nStore {
    catalogs: Arc<HashMap<String, HashMap<String, String>>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Catálogo '{}' inválido: {}", lang, e))?;
            catalogs.insert(lang.to_string(), messages);
        }

        Ok(Self { catalogs: Arc::new(catalogs) })
    }

    /// Traduz `key` para `lang` (com fallback para inglês) e substitui `{detail}`.
    pub fn translate(&self, lang: &str, key: &str, detail: Option<&str>) -> String {
        let template = self
            .lookup(lang, key)
            .or_else(|| self.lookup(DEFAULT_LANG, key))
            .unwrap_or(key);

        template.replace("{detail}", detail.unwrap_or_default())
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.catalogs
            .get(lang)
            .and_then(|messages| messages.get(key))
            .map(String::as_str)
    }
}
