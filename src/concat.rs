//! Assembles nsd.conf from ordered fragments.
use tracing::debug;

/// A piece of a config file. Fragments sort by `order`; ties keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub order: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct FragmentSet {
    header: Option<String>,
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text placed before every fragment.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        order: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.fragments.push(Fragment {
            name: name.into(),
            order: order.into(),
            content: content.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn ordered(&self) -> Vec<&Fragment> {
        let mut ordered: Vec<&Fragment> = self.fragments.iter().collect();
        // sort_by is stable
        ordered.sort_by(|a, b| a.order.cmp(&b.order));
        ordered
    }

    /// Fragment names in the order `assemble` emits them, empty ones included.
    pub fn names(&self) -> Vec<&str> {
        self.ordered().into_iter().map(|f| f.name.as_str()).collect()
    }

    pub fn assemble(&self) -> String {
        let mut out = self.header.clone().unwrap_or_default();
        for fragment in self.ordered() {
            if fragment.content.is_empty() {
                debug!("skipping empty fragment {}", fragment.name);
                continue;
            }
            debug!("appending fragment {} (order {})", fragment.name, fragment.order);
            if !out.is_empty() && !out.ends_with("\n\n") {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(&fragment.content);
        }
        out
    }
}
