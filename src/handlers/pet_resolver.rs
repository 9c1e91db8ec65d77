use crate::models::{Observation, PetKind, PetPrediction};
use crate::services::food_database::format_label;

const DOG_KEYWORDS: &[&str] = &[
    "dog", "puppy", "retriever", "bulldog", "poodle", "shepherd",
    "terrier", "spaniel", "hound", "setter", "pointer", "collie",
    "husky", "corgi", "beagle", "chihuahua", "dachshund", "pug",
    "rottweiler", "doberman", "boxer", "mastiff", "schnauzer",
];

const CAT_KEYWORDS: &[&str] = &[
    "cat", "kitten", "tabby", "persian", "siamese", "egyptian", "tiger_cat", "lynx",
];

/// Picks the best dog or cat breed label, falling back to the top label.
pub fn resolve_pet(observations: &[Observation]) -> Option<PetPrediction> {
    let top = observations.first()?;

    let best = observations
        .iter()
        .find_map(|o| pet_kind(&o.identifier).map(|kind| (o, kind)));

    let (observation, kind) = match best {
        Some(found) => found,
        None => {
            log::debug!("🐾 No breed label, using top result '{}'", top.identifier);
            (top, PetKind::Other)
        }
    };

    Some(PetPrediction {
        name: format_label(&observation.identifier),
        confidence: observation.confidence,
        kind,
    })
}

fn pet_kind(identifier: &str) -> Option<PetKind> {
    let id = identifier.to_lowercase();
    if DOG_KEYWORDS.iter().any(|k| id.contains(k)) {
        Some(PetKind::Dog)
    } else if CAT_KEYWORDS.iter().any(|k| id.contains(k)) {
        Some(PetKind::Cat)
    } else {
        None
    }
}
