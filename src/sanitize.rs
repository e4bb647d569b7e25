use crate::compose::{DomTree, NodeId};

/// Color-function signatures the rasterization capability rejects. The set
/// is closed; anything else passes through untouched.
const UNSUPPORTED_SIGNATURES: [&str; 7] = [
    "lab(", "lch(", "oklab(", "oklch(", "okich", "color(", "hwb(",
];

/// Document-level custom variables inspected alongside element properties.
const THEME_VARS: [&str; 4] = [
    "--background",
    "--foreground",
    "--color-background",
    "--color-foreground",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Background,
    Foreground,
    Border,
}

impl Fallback {
    fn color(self) -> &'static str {
        match self {
            Fallback::Background => "#ffffff",
            Fallback::Foreground => "#000000",
            Fallback::Border => "#cccccc",
        }
    }
}

const FULL_PROPS: [(&str, Fallback); 10] = [
    ("background-color", Fallback::Background),
    ("color", Fallback::Foreground),
    ("border-color", Fallback::Border),
    ("border-left-color", Fallback::Border),
    ("border-right-color", Fallback::Border),
    ("border-top-color", Fallback::Border),
    ("border-bottom-color", Fallback::Border),
    ("outline-color", Fallback::Border),
    ("text-decoration-color", Fallback::Foreground),
    ("column-rule-color", Fallback::Border),
];

/// The secondary strategy scans only the major properties and skips the
/// theme variables.
const REDUCED_PROPS: [(&str, Fallback); 3] = [
    ("background-color", Fallback::Background),
    ("color", Fallback::Foreground),
    ("border-color", Fallback::Border),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySet {
    Full,
    Reduced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BackupTarget {
    Node(NodeId),
    Theme,
}

/// One recorded substitution: the property's original explicit value
/// (possibly empty, meaning unset) awaiting replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBackup {
    target: BackupTarget,
    property: String,
    value: String,
}

fn is_unsupported(value: &str, allow_var: bool) -> bool {
    if value.is_empty() {
        return false;
    }
    if allow_var && value.contains("var(") {
        return true;
    }
    UNSUPPORTED_SIGNATURES
        .iter()
        .any(|signature| value.contains(signature))
}

/// Walks every node of `tree` and force-sets rasterizer-safe colors over any
/// computed value carrying an unsupported color function, recording the
/// original explicit values in capture order. The returned backups are owned
/// by exactly one rasterization attempt and must be replayed through
/// [`restore`] before that attempt returns.
pub fn sanitize(tree: &mut DomTree, set: PropertySet) -> Vec<StyleBackup> {
    let mut backups = Vec::new();

    if set == PropertySet::Full {
        for var in THEME_VARS {
            let value = tree.theme_var(var);
            // Indirection cannot occur at the theme level; only concrete
            // function signatures are checked here.
            if is_unsupported(&value, false) {
                backups.push(StyleBackup {
                    target: BackupTarget::Theme,
                    property: var.to_string(),
                    value,
                });
                let safe = if var.contains("background") {
                    Fallback::Background
                } else {
                    Fallback::Foreground
                };
                tree.set_theme_var(var, safe.color());
            }
        }
    }

    let props: &[(&str, Fallback)] = match set {
        PropertySet::Full => &FULL_PROPS,
        PropertySet::Reduced => &REDUCED_PROPS,
    };

    let ids: Vec<NodeId> = tree.node_ids().collect();
    for id in ids {
        for (property, fallback) in props {
            let computed = tree.computed_style(id, property);
            if is_unsupported(&computed, true) {
                backups.push(StyleBackup {
                    target: BackupTarget::Node(id),
                    property: property.to_string(),
                    value: tree.explicit_style(id, property),
                });
                tree.set_style(id, property, fallback.color());
            }
        }
    }

    backups
}

/// Replays backups in capture order, writing the original explicit values
/// back (empty restores "unset"). Consumes the list so it can never be
/// replayed twice.
pub fn restore(tree: &mut DomTree, backups: Vec<StyleBackup>) {
    for backup in backups {
        match backup.target {
            BackupTarget::Node(id) => tree.set_style(id, &backup.property, &backup.value),
            BackupTarget::Theme => tree.set_theme_var(&backup.property, &backup.value),
        }
    }
}
