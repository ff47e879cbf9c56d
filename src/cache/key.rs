//! Cache key derivation using BLAKE3

use crate::request::GenerationRequest;
use blake3::Hasher;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

const KEY_DOMAIN: &[u8] = b"recipe-request-v1";

/// Deterministic fingerprint of the cache-relevant fields of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Compute the key for a request
    ///
    /// Key = hash(domain || name || type || servings || target_price || ingredients || instructions)
    ///
    /// Text is NFC-normalized, lowercased, and whitespace-collapsed. The merged
    /// ingredient list is sorted and deduplicated, so submission order never
    /// changes the key. Dietary restrictions are not part of the key.
    pub fn for_request(request: &GenerationRequest) -> Self {
        let mut ingredients: Vec<String> = request
            .preferred_ingredients
            .iter()
            .chain(request.custom_ingredients.iter())
            .map(|name| normalize(name))
            .filter(|name| !name.is_empty())
            .collect();
        ingredients.sort();
        ingredients.dedup();

        let target_price = request
            .target_price
            .map(|price| format!("{:.2}", price))
            .unwrap_or_default();
        let instructions = request
            .special_instructions
            .as_deref()
            .map(normalize)
            .unwrap_or_default();

        let mut hasher = Hasher::new();
        hasher.update(KEY_DOMAIN);
        update_field(&mut hasher, normalize(&request.name).as_bytes());
        update_field(&mut hasher, normalize(&request.product_type).as_bytes());
        hasher.update(&request.servings.to_be_bytes());
        update_field(&mut hasher, target_price.as_bytes());

        // Ingredient count first so list boundaries stay unambiguous
        hasher.update(&(ingredients.len() as u64).to_be_bytes());
        for ingredient in &ingredients {
            update_field(&mut hasher, ingredient.as_bytes());
        }

        update_field(&mut hasher, instructions.as_bytes());

        CacheKey(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for CacheKey {
    fn from(bytes: [u8; 32]) -> Self {
        CacheKey(bytes)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Length-prefixed field (8 bytes, big-endian)
fn update_field(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn normalize(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
