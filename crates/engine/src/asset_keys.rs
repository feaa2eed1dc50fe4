use thiserror::Error;

const MAX_ASSET_KEY_LEN: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key is {len} bytes long, limit is {MAX_ASSET_KEY_LEN}")]
    TooLong { len: usize },
    #[error("asset key must not start or end with '/'")]
    EdgeSlash,
    #[error("asset key must not contain '..'")]
    ParentTraversal,
    #[error("asset key must not carry a file extension")]
    Extension,
    #[error("asset key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Asset keys name PNG files relative to the asset root, without the extension:
/// `sprites/her_smile` resolves to `<assets>/sprites/her_smile.png`.
pub fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.len() > MAX_ASSET_KEY_LEN {
        return Err(AssetKeyError::TooLong { len: key.len() });
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(AssetKeyError::EdgeSlash);
    }
    if key.contains("..") {
        return Err(AssetKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch == '.' {
            return Err(AssetKeyError::Extension);
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(AssetKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}
