/// Fallback capacity guess from a husbandry's file or type name, used only
/// when the record does not state its own capacity.
pub fn estimate_capacity(type_name: &str) -> u32 {
    let name = type_name.to_ascii_lowercase();
    let size = if name.contains("large") || name.contains("big") {
        Size::Large
    } else if name.contains("small") {
        Size::Small
    } else if name.contains("medium") {
        Size::Medium
    } else {
        Size::Unspecified
    };

    let [small, medium, large, unspecified] = if name.contains("chicken")
        || name.contains("coop")
        || name.contains("henhouse")
    {
        [200, 500, 1000, 300]
    } else if name.contains("cow") || name.contains("cattle") || name.contains("dairy") {
        [45, 100, 180, 80]
    } else if name.contains("pig") {
        [100, 200, 400, 150]
    } else if name.contains("sheep") || name.contains("goat") {
        [50, 100, 150, 100]
    } else if name.contains("horse") || name.contains("stable") {
        [4, 8, 16, 8]
    } else if name.contains("pasture") || name.contains("meadow") {
        [50, 100, 150, 100]
    } else {
        [25, 50, 100, 50]
    };

    match size {
        Size::Small => small,
        Size::Medium => medium,
        Size::Large => large,
        Size::Unspecified => unspecified,
    }
}

enum Size {
    Small,
    Medium,
    Large,
    Unspecified,
}
