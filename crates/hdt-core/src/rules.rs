//! Rule tables for classification, coloring and annotation hiding
//!
//! Built-in tables cover the anatomy asset the viewer ships with. A TOML file
//! can replace any section; sections it leaves out keep their defaults.
//!
//! ```toml
//! [[material]]
//! name = "Bone"
//! system = "skeletal"
//!
//! [[name_rule]]
//! system = "cardiovascular"
//! patterns = ["heart", "aorta"]
//!
//! [[palette]]
//! material = "Bone"
//! color = "#e3d9c6"
//!
//! [[palette]]
//! material = "Skin-1"
//! preserve = true
//!
//! [hidden]
//! exact = ["Labels"]
//! prefixes = ["Text"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::scene::Color;
use crate::systems::SystemKey;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rule tables: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse rule tables: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize rule tables: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid palette color {color:?} for material {material:?}")]
    InvalidColor { material: String, color: String },
}

/// Exact material name → system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRule {
    pub name: String,
    pub system: SystemKey,
}

/// Lower-case substrings that place a node name into a system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRule {
    pub system: SystemKey,
    pub patterns: Vec<String>,
}

impl NameRule {
    /// `name_lower` must already be lower-cased
    pub fn matches(&self, name_lower: &str) -> bool {
        contains_any(name_lower, &self.patterns)
    }
}

/// What the color pass does with a material listed in the palette
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tint {
    Color(Color),
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preserve: bool,
}

impl PaletteEntry {
    fn tint(&self) -> Result<Tint, RulesError> {
        if self.preserve {
            return Ok(Tint::Preserve);
        }
        let raw = self.color.as_deref().unwrap_or_default();
        Color::from_hex(raw)
            .map(Tint::Color)
            .ok_or_else(|| RulesError::InvalidColor {
                material: self.material.clone(),
                color: raw.to_string(),
            })
    }
}

/// Instructional/orientation nodes baked into the asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenRules {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl HiddenRules {
    pub fn matches(&self, name: &str) -> bool {
        self.exact.iter().any(|e| e == name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

impl Default for HiddenRules {
    fn default() -> Self {
        Self {
            exact: to_strings(HIDDEN_EXACT),
            prefixes: to_strings(HIDDEN_PREFIXES),
        }
    }
}

/// All tables the model-ready pipeline consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTables {
    #[serde(default = "default_material_rules")]
    pub material: Vec<MaterialRule>,
    #[serde(default = "default_name_rules")]
    pub name_rule: Vec<NameRule>,
    #[serde(default = "default_palette")]
    pub palette: Vec<PaletteEntry>,
    #[serde(default)]
    pub hidden: HiddenRules,
}

impl Default for RuleTables {
    fn default() -> Self {
        Self {
            material: default_material_rules(),
            name_rule: default_name_rules(),
            palette: default_palette(),
            hidden: HiddenRules::default(),
        }
    }
}

impl RuleTables {
    /// Load from a TOML string, validating palette colors
    pub fn from_toml(content: &str) -> Result<Self, RulesError> {
        let mut tables: RuleTables = toml::from_str(content)?;
        for rule in &mut tables.name_rule {
            for pattern in &mut rule.patterns {
                *pattern = pattern.to_lowercase();
            }
        }
        tables.palette()?;
        Ok(tables)
    }

    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), RulesError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Exact-match lookup; the first declaration of a name wins
    pub fn material_table(&self) -> HashMap<&str, SystemKey> {
        let mut table = HashMap::with_capacity(self.material.len());
        for rule in &self.material {
            table.entry(rule.name.as_str()).or_insert(rule.system);
        }
        table
    }

    /// Palette lookup; the first declaration of a material wins
    pub fn palette(&self) -> Result<HashMap<&str, Tint>, RulesError> {
        let mut palette = HashMap::with_capacity(self.palette.len());
        for entry in &self.palette {
            let tint = entry.tint()?;
            palette.entry(entry.material.as_str()).or_insert(tint);
        }
        Ok(palette)
    }
}

/// True when `haystack` contains any of `patterns`
pub fn contains_any<S: AsRef<str>>(haystack: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| haystack.contains(p.as_ref()))
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const MATERIAL_SYSTEMS: &[(&[&str], SystemKey)] = &[
    (
        &[
            "Bone", "Bone-1", "Bone-2", "Bone-3", "Bone-4", "Bone-5", "Bone-6", "Bone-7", "Bone-8",
            "Teeth", "Teeth-roots", "Dentine", "Suture", "Suture-1", "Suture-2", "Suture-3",
            "Suture-4", "Suture-5", "Suture-6", "Suture-7", "Suture-8",
        ],
        SystemKey::Skeletal,
    ),
    (
        &[
            "Abductor", "Adductor", "Biarticular", "Depressor", "Diaphragm", "Extension",
            "Extension hand/foot", "Extensor extremities", "External rotation", "Flexion",
            "Flexion fingers", "Flexion hand/foot", "Ingestion", "Internal rotator", "Levator",
            "Masticator", "Orbicularis/Constrictor", "Phonation", "Superficial", "Trapezius",
            "Muscular origin",
        ],
        SystemKey::Muscular,
    ),
    (ORIGIN_MATERIALS, SystemKey::Muscular),
    (END_MATERIALS, SystemKey::Muscular),
    (
        &["Artery", "Pulmonary artery", "Vein", "Pulmonary vein"],
        SystemKey::Cardiovascular,
    ),
    (
        &[
            "Nerve", "Nerve-1", "Nerve-2", "Nerve-3", "Nerve-4", "Nerve-5", "Nerve-6", "Nerve-8",
            "Brain", "Brain-Inner", "Cerebellum", "Frontal lobe", "Insula", "Interlobar sulci",
            "Limbic lobe", "Nucleus", "Nucleus (afferent fibers)", "Nucleus (efferent fibers)",
            "Occipital lobe", "Parietal lobe", "Temporal lobe", "White matter", "LCR",
        ],
        SystemKey::Nervous,
    ),
    (
        &[
            "Skin-1", "Skin-2", "Skin-3", "Skin-4", "Skin-5", "Skin-5'", "Skin-5''", "Skin-6",
            "Skin-7", "Skin-8", "Skin-in", "Nail", "Black",
        ],
        SystemKey::Integumentary,
    ),
    (
        &["Ligament", "Cartilage", "Tendon", "Articular capsule", "Fascia", "Bursa", "Fat"],
        SystemKey::Connective,
    ),
    (&["Eye", "Cornea", "Iris", "Gland", "Mucosa"], SystemKey::Organs),
];

const ORIGIN_MATERIALS: &[&str] = &[
    "Origin-Abduction", "Origin-Adduction", "Origin-Biarticular", "Origin-Depressor",
    "Origin-Diaphragm", "Origin-Extension", "Origin-Extension fingers",
    "Origin-Extension hand/foot", "Origin-External rotation", "Origin-Flexion",
    "Origin-Flexion fingers", "Origin-Flexion hand/foot", "Origin-Internal rotation",
    "Origin-Levator", "Origin-Ligament", "Origin-Orbicular/Constrictor", "Origin-Superficial",
    "Origin mastication",
];

const END_MATERIALS: &[&str] = &[
    "End-Abduction", "End-Adduction", "End-Biarticular", "End-Depressor", "End-Extension",
    "End-Extension fingers", "End-Extension hand-foot", "End-External rotation", "End-Flexion",
    "End-Flexion fingers", "End-Flexion hand/foot", "End-Internal rotation", "End-Levator",
    "End-Mastication",
];

// Order matters: the first system with a hit wins, so the more specific
// vocabularies come before broad ones ("eyebrow" must not land in organs).
const NAME_SYSTEMS: &[(SystemKey, &[&str])] = &[
    (
        SystemKey::Cardiovascular,
        &[
            "heart", "ventricle", "atrium", "aorta", "pulmonary trunk", "coronary", "cardiac",
            "artery", "arteria", "vein", "vena", "carotid", "jugular",
        ],
    ),
    (
        SystemKey::Respiratory,
        &["lung", "bronch", "trachea", "pleura", "larynx", "alveol"],
    ),
    (
        SystemKey::Digestive,
        &[
            "stomach", "liver", "intestin", "colon", "esophag", "pancrea", "gallbladder",
            "duoden", "jejun", "ileum", "cecum", "rectum", "appendix",
        ],
    ),
    (SystemKey::Lymphatic, &["lymph", "spleen", "thymus", "tonsil"]),
    (
        SystemKey::Nervous,
        &["brain", "nerve", "cerebr", "cerebell", "spinal cord", "gangli", "plexus", "medulla"],
    ),
    (
        SystemKey::Integumentary,
        &["skin", "nail", "hair", "eyebrow", "eyelash"],
    ),
    (
        SystemKey::Skeletal,
        &[
            "bone", "femur", "tibia", "fibula", "humerus", "radius", "ulna", "vertebra", "skull",
            "cranium", "rib", "sternum", "pelvis", "scapula", "clavicle", "patella", "sacrum",
            "mandible", "maxilla", "phalan", "carpal", "tarsal", "tooth", "teeth",
        ],
    ),
    (
        SystemKey::Connective,
        &["ligament", "tendon", "cartilage", "fascia", "bursa", "capsule", "meniscus", "aponeurosis"],
    ),
    (
        SystemKey::Muscular,
        &[
            "muscle", "muscul", "diaphragm", "gluteus", "deltoid", "pectoralis", "trapezius",
            "rectus", "oblique", "sartorius", "gastrocnemius", "soleus", "masseter",
            "orbicularis", "levator", "depressor", "flexor", "extensor", "abductor", "adductor",
            "intercostal", "ceps",
        ],
    ),
    (
        SystemKey::Organs,
        &["eye", "cornea", "iris", "retina", "kidney", "bladder", "gland", "thyroid"],
    ),
];

const PALETTE_GROUPS: &[(&[&str], Option<&str>)] = &[
    (
        &[
            "Bone", "Bone-1", "Bone-2", "Bone-3", "Bone-4", "Bone-5", "Bone-6", "Bone-7", "Bone-8",
            "Suture", "Suture-1", "Suture-2", "Suture-3", "Suture-4", "Suture-5", "Suture-6",
            "Suture-7", "Suture-8",
        ],
        Some("#e3d9c6"),
    ),
    (&["Teeth", "Teeth-roots", "Dentine"], Some("#f2eee0")),
    (
        &[
            "Abductor", "Adductor", "Biarticular", "Depressor", "Diaphragm", "Extension",
            "Extension hand/foot", "Extensor extremities", "External rotation", "Flexion",
            "Flexion fingers", "Flexion hand/foot", "Ingestion", "Internal rotator", "Levator",
            "Masticator", "Orbicularis/Constrictor", "Phonation", "Superficial", "Trapezius",
        ],
        Some("#b0403a"),
    ),
    (ORIGIN_MATERIALS, Some("#d8b49c")),
    (END_MATERIALS, Some("#d8b49c")),
    (&["Muscular origin"], Some("#d8b49c")),
    (&["Artery", "Pulmonary vein"], Some("#c62828")),
    (&["Vein", "Pulmonary artery"], Some("#2a4fa8")),
    (
        &["Nerve", "Nerve-1", "Nerve-2", "Nerve-3", "Nerve-4", "Nerve-5", "Nerve-6", "Nerve-8"],
        Some("#f2d14c"),
    ),
    (
        &[
            "Brain", "Brain-Inner", "Cerebellum", "Frontal lobe", "Insula", "Interlobar sulci",
            "Limbic lobe", "Occipital lobe", "Parietal lobe", "Temporal lobe",
        ],
        Some("#e6b3ad"),
    ),
    (
        &["Nucleus", "Nucleus (afferent fibers)", "Nucleus (efferent fibers)"],
        Some("#c98a84"),
    ),
    (&["White matter"], Some("#f0e6dc")),
    (&["LCR"], Some("#a8d8ea")),
    (
        &[
            "Skin-1", "Skin-2", "Skin-3", "Skin-4", "Skin-5", "Skin-5'", "Skin-5''", "Skin-6",
            "Skin-7", "Skin-8", "Skin-in", "Black", "Eye", "Cornea", "Iris",
        ],
        None,
    ),
    (&["Nail"], Some("#f0d0c8")),
    (&["Ligament", "Tendon", "Articular capsule"], Some("#e6dfc8")),
    (&["Cartilage"], Some("#b9d7e0")),
    (&["Fascia", "Bursa"], Some("#d9c7c0")),
    (&["Fat"], Some("#f2d16b")),
    (&["Gland"], Some("#d98cb3")),
    (&["Mucosa"], Some("#d46a7e")),
];

const HIDDEN_EXACT: &[&str] = &["Labels", "Text", "Arrows", "Guides", "Grid"];

const HIDDEN_PREFIXES: &[&str] = &[
    "Text_", "Label_", "Arrow_", "Orientation", "Compass", "Anterior view", "Posterior view",
    "Lateral view", "Scale bar", "Title",
];

fn default_material_rules() -> Vec<MaterialRule> {
    MATERIAL_SYSTEMS
        .iter()
        .flat_map(|(names, system)| {
            names.iter().map(move |name| MaterialRule {
                name: name.to_string(),
                system: *system,
            })
        })
        .collect()
}

fn default_name_rules() -> Vec<NameRule> {
    NAME_SYSTEMS
        .iter()
        .map(|(system, patterns)| NameRule {
            system: *system,
            patterns: to_strings(patterns),
        })
        .collect()
}

fn default_palette() -> Vec<PaletteEntry> {
    PALETTE_GROUPS
        .iter()
        .flat_map(|(names, color)| {
            names.iter().map(move |name| PaletteEntry {
                material: name.to_string(),
                color: color.map(str::to_string),
                preserve: color.is_none(),
            })
        })
        .collect()
}
