//! Path-keyed cache of prepared templates.
//!
//! Templates are loaded once by the driver thread and handed out as `Arc`s
//! so concurrent matches can borrow them read-only. Load failures are
//! reported once per attempt and are not cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use bozorth3::{Format, Template};

pub struct TemplateCache {
    templates: HashMap<PathBuf, Arc<Template>>,
    max_minutiae: u32,
    format: Format,
}

impl TemplateCache {
    pub fn new(max_minutiae: u32, format: Format) -> Self {
        TemplateCache {
            templates: HashMap::new(),
            max_minutiae,
            format,
        }
    }

    pub fn get_or_load(&mut self, path: &Path) -> Option<Arc<Template>> {
        if let Some(template) = self.templates.get(path) {
            return Some(template.clone());
        }

        match Template::load(path, self.max_minutiae, self.format) {
            Ok(template) => {
                let template = Arc::new(template);
                self.templates
                    .insert(path.to_owned(), template.clone());
                Some(template)
            }
            Err(error) => {
                warn!("cannot load {}: {}", path.display(), error);
                None
            }
        }
    }
}
