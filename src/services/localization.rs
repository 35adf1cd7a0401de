use fluent::{FluentArgs, FluentResource};
use fluent_bundle::bundle::FluentBundle;
use include_dir::{Dir, include_dir};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use unic_langid::LanguageIdentifier;

// We use the concurrent memoizer to ensure thread safety (Sync + Send)
type ConcurrentBundle = FluentBundle<FluentResource, intl_memoizer::concurrent::IntlLangMemoizer>;

// Embed the locales directory at compile time
static LOCALES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/locales");

const FALLBACK_LOCALE: &str = "en-US";

pub struct LocalizationManager {
    bundles: HashMap<LanguageIdentifier, ConcurrentBundle>,
}

impl LocalizationManager {
    pub fn new() -> Self {
        let mut bundles = HashMap::new();

        for entry in LOCALES_DIR.dirs() {
            let locale_name = entry.path().to_string_lossy();

            let Ok(lang_id) = locale_name.parse::<LanguageIdentifier>() else {
                continue;
            };

            let mut bundle = ConcurrentBundle::new_concurrent(vec![lang_id.clone()]);
            // Isolation marks would break `<@id>` mentions inside messages
            bundle.set_use_isolating(false);

            for file in entry.files() {
                if file.path().extension().and_then(|e| e.to_str()) != Some("ftl") {
                    continue;
                }
                let Some(content) = file.contents_utf8() else {
                    continue;
                };

                match FluentResource::try_new(content.to_string()) {
                    Ok(resource) => {
                        if let Err(errors) = bundle.add_resource(resource) {
                            for err in errors {
                                error!("Error adding resource for {}: {:?}", locale_name, err);
                            }
                        }
                    }
                    Err((_, errors)) => {
                        for err in errors {
                            error!("Error parsing resource for {}: {:?}", locale_name, err);
                        }
                    }
                }
            }

            info!("Loaded embedded locale: {}", locale_name);
            bundles.insert(lang_id, bundle);
        }

        Self { bundles }
    }

    pub fn get_proxy(self: &Arc<Self>, locale: &str) -> L10nProxy {
        L10nProxy {
            manager: self.clone(),
            locale: locale.to_string(),
        }
    }

    pub fn translate(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        let fallback: LanguageIdentifier = FALLBACK_LOCALE
            .parse()
            .unwrap_or_default();
        let lang_id = locale.parse::<LanguageIdentifier>().unwrap_or_else(|_| fallback.clone());

        // Requested locale first, then en-US, then the key itself
        [&lang_id, &fallback]
            .into_iter()
            .filter_map(|id| self.bundles.get(id))
            .find_map(|bundle| {
                let pattern = bundle.get_message(key)?.value()?;
                let mut errors = vec![];
                Some(bundle.format_pattern(pattern, args, &mut errors).into_owned())
            })
            .unwrap_or_else(|| key.to_string())
    }
}

/// A proxy for translation that holds a reference to the manager and a specific locale
#[derive(Clone)]
pub struct L10nProxy {
    pub manager: Arc<LocalizationManager>,
    pub locale: String,
}

impl L10nProxy {
    pub fn t(&self, key: &str, args: Option<&FluentArgs>) -> String {
        self.manager.translate(&self.locale, key, args)
    }
}

/// Helper trait to add localization to the Poise context
pub trait ContextL10nExt {
    fn l10n_user(&self) -> L10nProxy;
}

impl ContextL10nExt for crate::Context<'_> {
    fn l10n_user(&self) -> L10nProxy {
        let manager = self.data().l10n.clone();
        let locale = self.locale().unwrap_or(FALLBACK_LOCALE);
        manager.get_proxy(locale)
    }
}
