//! A prepared template: pruned minutiae plus their truncated edge list.
//! Templates are immutable once built and can be shared read-only between
//! any number of concurrent matches.

use std::path::Path;

use log::debug;

use crate::find_edges::{find_edges, limit_edges};
use crate::parsing::{load_minutiae, prune_minutiae, RawMinutia, TemplateError};
use crate::types::{Edge, Format, Minutia};

pub struct Template {
    minutiae: Box<[Minutia]>,
    edges: Box<[Edge]>,
}

impl Template {
    /// Loads a `.xyt` file (plus `.min` sidecar when present), prunes to
    /// `max_minutiae` and builds the truncated edge list.
    pub fn load(
        path: impl AsRef<Path>,
        max_minutiae: u32,
        format: Format,
    ) -> Result<Template, TemplateError> {
        let path = path.as_ref();
        let minutiae = load_minutiae(path, max_minutiae)?;
        let template = Template::from_minutiae(minutiae, format);
        debug!(
            "{}: {} minutiae, {} edges",
            path.display(),
            template.minutiae.len(),
            template.edges.len()
        );
        Ok(template)
    }

    /// Builds a template from raw minutiae, applying the same pruning as a
    /// file load.
    pub fn from_raw(minutiae: Vec<RawMinutia>, max_minutiae: u32, format: Format) -> Template {
        Template::from_minutiae(prune_minutiae(minutiae, max_minutiae), format)
    }

    fn from_minutiae(minutiae: Vec<Minutia>, format: Format) -> Template {
        let mut edges = Vec::new();
        if !minutiae.is_empty() {
            find_edges(&minutiae, &mut edges, format);
            edges.truncate(limit_edges(&edges));
        }
        Template {
            minutiae: minutiae.into_boxed_slice(),
            edges: edges.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn minutiae(&self) -> &[Minutia] {
        &self.minutiae
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}
