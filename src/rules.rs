//! Rule and template store.
//!
//! Each site family ships a rule file (`rules/{family}.yml`, host → [`Rule`])
//! and a Markdown template (`templates/{family}.md`). Families are loaded at
//! most once; their rules are unioned into one host map where the first
//! family to claim a host keeps it. Edited rule files take effect on the
//! next run.

use crate::error::{CollectorError, Result};
use crate::models::Rule;
use crate::parsers::Family;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

#[derive(Debug, Default)]
struct Loaded {
    rules: HashMap<String, (Family, Arc<Rule>)>,
    templates: HashMap<Family, Arc<str>>,
}

#[derive(Debug)]
pub struct RuleBook {
    root: PathBuf,
    loaded: RwLock<Loaded>,
}

impl RuleBook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: RwLock::new(Loaded::default()),
        }
    }

    pub fn counter_path(&self, family: Family) -> PathBuf {
        self.root.join("counters").join(family.counter_file())
    }

    /// Load a family's rules and template if that has not happened yet.
    #[instrument(level = "debug", skip(self))]
    pub fn ensure_loaded(&self, family: Family) -> Result<()> {
        if self.read().templates.contains_key(&family) {
            return Ok(());
        }

        let rules_path = self.root.join("rules").join(family.rules_file());
        let template_path = self.root.join("templates").join(family.template_file());
        let yaml = std::fs::read_to_string(&rules_path)?;
        let rules: HashMap<String, Rule> = if yaml.trim().is_empty() {
            HashMap::new()
        } else {
            serde_yaml::from_str(&yaml)?
        };
        let template = std::fs::read_to_string(&template_path)?;

        let mut loaded = self.write();
        // Another caller may have won the race while the files were read.
        if loaded.templates.contains_key(&family) {
            return Ok(());
        }
        let count = rules.len();
        for (host, rule) in rules {
            if let Some((owner, _)) = loaded.rules.get(&host) {
                warn!(%host, ?owner, ?family, "Host already has a rule; keeping the first one");
                continue;
            }
            loaded.rules.insert(host, (family, Arc::new(rule)));
        }
        loaded.templates.insert(family, Arc::from(template));
        info!(?family, hosts = count, path = %rules_path.display(), "Loaded rules");
        Ok(())
    }

    /// Load every known family.
    pub fn preload(&self) -> Result<()> {
        for family in Family::ALL {
            self.ensure_loaded(family)?;
        }
        Ok(())
    }

    pub fn rule(&self, host: &str) -> Result<Arc<Rule>> {
        self.read()
            .rules
            .get(host)
            .map(|(_, rule)| Arc::clone(rule))
            .ok_or_else(|| CollectorError::MissingRule(host.to_string()))
    }

    /// The family whose rule file lists `host`, if any.
    pub fn family_of(&self, host: &str) -> Option<Family> {
        self.read().rules.get(host).map(|(family, _)| *family)
    }

    pub fn template(&self, family: Family) -> Result<Arc<str>> {
        self.ensure_loaded(family)?;
        Ok(Arc::clone(&self.read().templates[&family]))
    }

    /// Absolute feed URLs of every loaded host that publishes one.
    pub fn feed_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .read()
            .rules
            .iter()
            .filter(|(_, (_, rule))| !rule.feed.is_empty())
            .map(|(host, (_, rule))| {
                format!("https://{}/{}", host, rule.feed.trim_start_matches('/'))
            })
            .collect();
        urls.sort();
        urls
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Loaded> {
        self.loaded.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Loaded> {
        self.loaded.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
