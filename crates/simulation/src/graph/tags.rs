//! Tag helpers shared by edges, ingestion and the flow model.

use super::Tag;

pub fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.key == key)
        .map(|tag| tag.value.as_str())
}

pub fn is_roundabout(tags: &[Tag]) -> bool {
    tags.iter()
        .any(|tag| tag.key == "junction" && (tag.value == "roundabout" || tag.value == "circular"))
}

/// Any `oneway` value other than `no` restricts travel to the edge
/// direction, and roundabouts are always one-way.
pub fn is_oneway(tags: &[Tag]) -> bool {
    tags.iter().any(|tag| tag.key == "oneway" && tag.value != "no") || is_roundabout(tags)
}

/// `oneway=-1`: traffic runs against the digitised direction of the way.
pub fn is_reversed_oneway(tags: &[Tag]) -> bool {
    tag_value(tags, "oneway") == Some("-1")
}

/// Add every tag from `incoming` that is not already present (by key and value).
pub fn merge_tags(existing: &mut Vec<Tag>, incoming: &[Tag]) {
    for tag in incoming {
        if !existing.contains(tag) {
            existing.push(tag.clone());
        }
    }
}

/// Total lane count from the `lanes` tag. Multi-valued tags use the first value.
pub fn lanes(tags: &[Tag]) -> Option<u32> {
    tag_value(tags, "lanes")?
        .split(';')
        .next()?
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&lanes| lanes > 0)
}

/// `maxspeed` in km/h. Accepts plain numbers (km/h) and `N mph`; symbolic
/// values such as `none` or `signals` yield `None`.
pub fn maxspeed_kmh(tags: &[Tag]) -> Option<f64> {
    let raw = tag_value(tags, "maxspeed")?.split(';').next()?.trim();
    let (number, mph) = match raw.strip_suffix("mph") {
        Some(rest) => (rest.trim(), true),
        None => (raw.trim_end_matches("km/h").trim(), false),
    };
    let speed = number.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)?;
    Some(if mph {
        speed * crate::config::MPH_TO_KMH
    } else {
        speed
    })
}
