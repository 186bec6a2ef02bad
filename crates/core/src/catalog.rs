//! Built-in overlay category catalog.
//!
//! Categories are advisory labels for the asset library. Nothing in the
//! scene or placement model enforces them.

use serde::Serialize;

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Stable key stored on asset records.
    pub key: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Example prompts for this category.
    pub examples: &'static [&'static str],
}

/// Category selected when none is chosen.
pub const DEFAULT_CATEGORY: &str = "Wheels & Tires / Rims";

pub const CATEGORIES: &[Category] = &[
    Category {
        key: "Wheels & Tires / Rims",
        label: "Wheels & Tires · Rims",
        examples: &["5-spoke bronze 19\"", "mesh silver 20\"", "black multi-spoke 18\""],
    },
    Category {
        key: "Wheels & Tires / Tires",
        label: "Wheels & Tires · Tires",
        examples: &["low-profile performance", "chunky all-terrain"],
    },
    Category {
        key: "Body Kits / Bumpers",
        label: "Body Kits · Front/Rear Bumpers",
        examples: &["aggressive front lip", "OEM+ rear diffuser"],
    },
    Category {
        key: "Body Kits / Side Skirts",
        label: "Body Kits · Side Skirts",
        examples: &["subtle side skirts"],
    },
    Category {
        key: "Body Kits / Flares",
        label: "Body Kits · Widebody Flares",
        examples: &["bolt-on widebody flares"],
    },
    Category {
        key: "Aero / Splitters & Diffusers",
        label: "Aero · Splitters & Diffusers",
        examples: &["front splitter", "rear diffuser with fins"],
    },
    Category {
        key: "Aero / Spoilers & Wings",
        label: "Aero · Spoilers & Wings",
        examples: &["ducktail", "GT wing", "lip spoiler"],
    },
    Category {
        key: "Hoods & Roof / Hoods",
        label: "Hoods & Roof · Vented Hoods",
        examples: &["carbon vented hood"],
    },
    Category {
        key: "Hoods & Roof / Roof",
        label: "Hoods & Roof · Roof",
        examples: &["roof scoop", "gloss black roof wrap"],
    },
    Category {
        key: "Lighting / Headlights",
        label: "Lighting · Headlights",
        examples: &["LED with DRL", "halo rings", "tinted housings"],
    },
    Category {
        key: "Lighting / Tail lights",
        label: "Lighting · Tail Lights",
        examples: &["clear smoked tails", "sequential indicators"],
    },
    Category {
        key: "Lighting / Underglow",
        label: "Lighting · Underglow",
        examples: &["neon underglow blue"],
    },
    Category {
        key: "Grilles & Badging / Grilles",
        label: "Grilles & Badging · Grilles",
        examples: &["honeycomb mesh"],
    },
    Category {
        key: "Grilles & Badging / Emblems",
        label: "Grilles & Badging · Emblems",
        examples: &["debadged front", "custom emblem"],
    },
    Category {
        key: "Mirrors & Windows / Mirrors",
        label: "Mirrors & Windows · Mirrors",
        examples: &["F1-style mirrors"],
    },
    Category {
        key: "Mirrors & Windows / Tints",
        label: "Mirrors & Windows · Tints",
        examples: &["35% side tint", "limo rear"],
    },
    Category {
        key: "Exhausts",
        label: "Exhausts",
        examples: &["dual round tips", "quad square tips"],
    },
    Category {
        key: "Accessories / Decals & Wraps",
        label: "Accessories · Decals & Wraps",
        examples: &["stripe vinyl", "full camo wrap"],
    },
    Category {
        key: "Accessories / Racks",
        label: "Accessories · Roof/Bike Racks",
        examples: &["slim roof rack"],
    },
    Category {
        key: "Accessories / Misc",
        label: "Accessories · Misc",
        examples: &["red tow hook", "mud flaps"],
    },
];

/// Look up a category by key.
pub fn find_category(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.key == key)
}

/// Placeholder hint for the prompt box, e.g. `ducktail, GT wing, lip spoiler`.
pub fn example_hint(key: &str) -> Option<String> {
    find_category(key).map(|c| c.examples.join(", "))
}
