//! Cancer-type vocabulary used by the compatibility gate.
//!
//! Maps canonical cancer types to lowercase aliases (e.g., lung → nsclc)
//! and to related trial categories (e.g., kidney → genitourinary).
//! Matching is plain substring containment on lowercased text.

/// Lookup interface over a cancer-type vocabulary.
///
/// The gate only talks to this trait, so a richer ontology can replace the
/// built-in table without touching scoring logic.
pub trait CancerVocabulary {
    /// Canonical type for a free-text diagnosis, first match wins.
    fn classify(&self, diagnosis: &str) -> Option<&str>;

    /// Aliases of a canonical type.
    fn aliases(&self, cancer_type: &str) -> &[String];

    /// Related trial categories of a canonical type.
    fn related_terms(&self, cancer_type: &str) -> &[String];
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CancerTypeEntry {
    key: String,
    aliases: Vec<String>,
    related: Vec<String>,
}

/// Ordered alias table; classification walks entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancerTypeTable {
    entries: Vec<CancerTypeEntry>,
}

impl Default for CancerTypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CancerTypeTable {
    /// Create a table with the default oncology mappings.
    pub fn new() -> Self {
        let mut table = Self::empty();
        for (key, aliases) in DEFAULT_ALIASES {
            table.add_cancer_type(key, aliases);
        }
        for (key, related) in DEFAULT_RELATED {
            for term in *related {
                table.add_related_term(key, term);
            }
        }
        table
    }

    /// Create a table with no mappings.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a canonical type (appended after existing ones) or extend its aliases.
    pub fn add_cancer_type(&mut self, key: &str, aliases: &[&str]) {
        for alias in aliases {
            self.add_alias(key, alias);
        }
        self.entry_mut(key);
    }

    /// Add an alias to a canonical type, creating the type if needed.
    pub fn add_alias(&mut self, key: &str, alias: &str) {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() {
            return;
        }
        let entry = self.entry_mut(key);
        if !entry.aliases.contains(&alias) {
            entry.aliases.push(alias);
        }
    }

    /// Add a related trial category to a canonical type.
    pub fn add_related_term(&mut self, key: &str, term: &str) {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return;
        }
        let entry = self.entry_mut(key);
        if !entry.related.contains(&term) {
            entry.related.push(term);
        }
    }

    /// Canonical type keys in classification order.
    pub fn cancer_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &str) -> Option<&CancerTypeEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    fn entry_mut(&mut self, key: &str) -> &mut CancerTypeEntry {
        let key = key.trim().to_lowercase();
        let index = match self.entries.iter().position(|e| e.key == key) {
            Some(index) => index,
            None => {
                self.entries.push(CancerTypeEntry {
                    key,
                    aliases: Vec::new(),
                    related: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }
}

impl CancerVocabulary for CancerTypeTable {
    fn classify(&self, diagnosis: &str) -> Option<&str> {
        let text = diagnosis.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.aliases.iter().any(|alias| text.contains(alias.as_str())))
            .map(|e| e.key.as_str())
    }

    fn aliases(&self, cancer_type: &str) -> &[String] {
        self.entry(cancer_type)
            .map(|e| e.aliases.as_slice())
            .unwrap_or(&[])
    }

    fn related_terms(&self, cancer_type: &str) -> &[String] {
        self.entry(cancer_type)
            .map(|e| e.related.as_slice())
            .unwrap_or(&[])
    }
}

/// Default canonical types and aliases, in classification order.
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("breast", &["breast", "mammary"]),
    ("lung", &["lung", "pulmonary", "bronchial", "nsclc", "sclc"]),
    ("colon", &["colon", "colorectal", "rectal", "bowel"]),
    ("prostate", &["prostate"]),
    ("ovarian", &["ovarian", "ovary"]),
    ("pancreatic", &["pancreatic", "pancreas"]),
    ("kidney", &["kidney", "renal"]),
    ("liver", &["liver", "hepatic"]),
    ("stomach", &["stomach", "gastric"]),
    ("bladder", &["bladder"]),
    ("brain", &["brain", "glioma", "glioblastoma"]),
    ("lymphoma", &["lymphoma", "hodgkin", "non-hodgkin"]),
    // "all" is a plain substring too, so it also hits "small" and "overall"
    ("leukemia", &["leukemia", "aml", "all", "cml", "cll"]),
    ("melanoma", &["melanoma", "skin"]),
    ("sarcoma", &["sarcoma"]),
    ("thyroid", &["thyroid"]),
];

/// Broader trial categories that still cover a canonical type.
const DEFAULT_RELATED: &[(&str, &[&str])] = &[
    ("colon", &["colorectal"]),
    ("lung", &["thoracic"]),
    ("brain", &["central nervous system", "cns"]),
    ("kidney", &["genitourinary"]),
    ("prostate", &["genitourinary"]),
    ("bladder", &["genitourinary"]),
];
